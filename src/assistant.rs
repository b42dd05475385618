//! Question dispatch and the chat transcript.
//!
//! Each question is tried symbolically first; anything the analyzer does not
//! recognise falls back to subgraph retrieval. Failures become visible replies
//! so the conversation can always continue.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analyze::{analyze, Analysis};
use crate::completion::Completer;
use crate::config::Config;
use crate::db::Db;
use crate::error::Result;
use crate::prompt::{compose_prompt, symbolic_context};
use crate::retrieve::{retrieve, snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Append-only conversation log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            role,
            text: text.into(),
            at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in order, text verbatim.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| match e.role {
                Role::User => format!("You: {}", e.text),
                Role::Assistant => format!("FinBot: {}", e.text),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Where a question's context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    Symbolic,
    Subgraph,
}

#[derive(Debug, Clone, Copy)]
pub struct AssistantSettings {
    pub row_limit: usize,
    pub max_context_chars: usize,
}

impl From<&Config> for AssistantSettings {
    fn from(config: &Config) -> Self {
        Self {
            row_limit: config.retrieval.row_limit,
            max_context_chars: config.completion.max_context_chars,
        }
    }
}

pub struct Assistant<'a, C> {
    db: &'a Db,
    completer: C,
    settings: AssistantSettings,
    transcript: Transcript,
}

impl<'a, C: Completer> Assistant<'a, C> {
    pub fn new(db: &'a Db, completer: C, settings: AssistantSettings) -> Self {
        Self {
            db,
            completer,
            settings,
            transcript: Transcript::default(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn completer(&self) -> &C {
        &self.completer
    }

    /// Context for `question`: a symbolic answer if there is one, else the subgraph.
    pub async fn build_context(&self, question: &str) -> Result<(ContextSource, String)> {
        match analyze(self.db, question).await? {
            Analysis::Answer(answer) => Ok((ContextSource::Symbolic, symbolic_context(&answer))),
            Analysis::NoMatch => {
                let text = retrieve(self.db, question, self.settings.row_limit).await?;
                Ok((ContextSource::Subgraph, text))
            }
        }
    }

    /// Answer one question and record both sides in the transcript.
    pub async fn ask(&mut self, question: &str) -> String {
        self.transcript.push(Role::User, question);

        let reply = match self.build_context(question).await {
            Ok((source, context)) => {
                log::info!("Answering with {:?} context ({} chars)", source, context.len());
                let prompt = compose_prompt(&context, question, self.settings.max_context_chars);
                match self.completer.complete(&prompt).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        log::error!("Completion failed: {}", e);
                        format!("Error contacting completion backend: {}", e)
                    }
                }
            }
            Err(e) => {
                log::error!("Context lookup failed: {}", e);
                format!("Error querying knowledge graph: {}", e)
            }
        };

        self.transcript.push(Role::Assistant, reply.clone());
        reply
    }

    /// Unfiltered view of the graph, capped at the row limit.
    pub async fn snapshot(&self) -> Result<String> {
        snapshot(self.db, self.settings.row_limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FinbotError;
    use crate::graph::testutil::{migrated_db, seed};
    use crate::retrieve::NO_RELEVANT_DATA;
    use std::sync::Mutex;

    /// Records prompts and answers with a fixed reply, or fails when `reply` is None.
    struct FixedCompleter {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedCompleter {
        fn replying(reply: &str) -> Self {
            Self { reply: Some(reply.to_string()), prompts: Mutex::new(Vec::new()) }
        }

        fn failing() -> Self {
            Self { reply: None, prompts: Mutex::new(Vec::new()) }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    impl Completer for FixedCompleter {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| FinbotError::Completion("connection refused".to_string()))
        }
    }

    const SETTINGS: AssistantSettings = AssistantSettings { row_limit: 100, max_context_chars: 4000 };

    #[tokio::test]
    async fn test_symbolic_question_uses_computation() {
        let (db, _temp) = migrated_db().await;
        seed(&db, &[("2019", "Fuel Cost", 100.0), ("2020", "Fuel Cost", 150.0)]).await;
        let mut assistant = Assistant::new(&db, FixedCompleter::replying("Up 50%."), SETTINGS);

        let question = "percentage change in fuel cost from 2019 to 2020";
        let (source, _) = assistant.build_context(question).await.unwrap();
        assert_eq!(source, ContextSource::Symbolic);

        let reply = assistant.ask(question).await;
        assert_eq!(reply, "Up 50%.");
        let prompt = assistant.completer().last_prompt();
        assert!(prompt.contains("Percent Change = ((150 - 100) / 100) * 100 = 50.00%"));
        assert!(prompt.contains("### Graph Evidence:\n[2019] Metric | Fuel Cost → 100"));
    }

    #[tokio::test]
    async fn test_other_question_falls_back_to_subgraph() {
        let (db, _temp) = migrated_db().await;
        seed(&db, &[("2019", "Revenue", 10.0), ("2019", "Fuel Cost", 5.0)]).await;
        let mut assistant = Assistant::new(&db, FixedCompleter::replying("ok"), SETTINGS);

        let (source, context) = assistant.build_context("revenue in 2019?").await.unwrap();
        assert_eq!(source, ContextSource::Subgraph);
        assert!(context.contains("[2019] Metric | Revenue → 10"));

        assistant.ask("what about headcount?").await;
        // No terms detected: unfiltered graph goes into the prompt
        assert!(assistant.completer().last_prompt().contains("Fuel Cost → 5"));
    }

    #[tokio::test]
    async fn test_empty_graph_sends_sentinel() {
        let (db, _temp) = migrated_db().await;
        let mut assistant = Assistant::new(&db, FixedCompleter::replying("no idea"), SETTINGS);

        assistant.ask("revenue?").await;
        assert!(assistant.completer().last_prompt().contains(NO_RELEVANT_DATA));
    }

    #[tokio::test]
    async fn test_completion_failure_becomes_reply() {
        let (db, _temp) = migrated_db().await;
        let mut assistant = Assistant::new(&db, FixedCompleter::failing(), SETTINGS);

        let reply = assistant.ask("revenue?").await;
        assert!(reply.starts_with("Error contacting completion backend"));
        assert!(reply.contains("connection refused"));

        // Conversation continues
        let second = assistant.ask("fuel?").await;
        assert!(second.starts_with("Error contacting completion backend"));
        assert_eq!(assistant.transcript().len(), 4);
    }

    #[tokio::test]
    async fn test_store_failure_becomes_reply() {
        let temp = tempfile::TempDir::new().unwrap();
        // No migrations: every graph query fails
        let db = Db::open(temp.path().join("bare.db")).unwrap();
        let mut assistant = Assistant::new(&db, FixedCompleter::replying("unused"), SETTINGS);

        let reply = assistant.ask("revenue?").await;
        assert!(reply.starts_with("Error querying knowledge graph"));
        assert!(assistant.completer().prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transcript_order_and_render() {
        let (db, _temp) = migrated_db().await;
        let mut assistant = Assistant::new(&db, FixedCompleter::replying("Fine."), SETTINGS);

        assert!(assistant.transcript().is_empty());
        assistant.ask("How are we doing?").await;
        assert_eq!(assistant.transcript().len(), 2);
        assert_eq!(
            assistant.transcript().render(),
            "You: How are we doing?\n\nFinBot: Fine."
        );
    }

    #[tokio::test]
    async fn test_snapshot() {
        let (db, _temp) = migrated_db().await;
        seed(&db, &[("2019", "Revenue", 10.0)]).await;
        let assistant = Assistant::new(&db, FixedCompleter::replying(""), SETTINGS);
        assert_eq!(assistant.snapshot().await.unwrap(), "[2019] Metric | Revenue → 10");
    }
}
