//! Prompt assembly for the completion backend.

use crate::analyze::SymbolicAnswer;

/// Context for a symbolic answer: the computation, then the facts behind it.
pub fn symbolic_context(answer: &SymbolicAnswer) -> String {
    format!("{}\n\n### Graph Evidence:\n{}", answer.explanation, answer.evidence)
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub fn compose_prompt(context: &str, question: &str, max_context_chars: usize) -> String {
    format!(
        "You are an expert financial assistant. Use the following data from a financial knowledge graph to answer the user's question.\n\n\
         ### Financial Data:\n{}\n\n\
         ### Question:\n{}\n\n\
         ### Answer:\n",
        truncate_chars(context, max_context_chars),
        question
    )
}
