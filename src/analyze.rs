//! Symbolic analysis: answer "percentage change in <metric> from <year> to
//! <year>" questions from the graph without asking the language model.

use std::collections::BTreeSet;

use crate::db::Db;
use crate::error::Result;
use crate::extract::{extract_metrics, extract_years};
use crate::graph::{self, format_amount, Fact, FactFilter};

/// Upper bound on candidate facts fetched per target year.
const ANALYSIS_ROW_LIMIT: usize = 100;

/// Outcome of trying to answer a question symbolically.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    /// The question was recognised; the answer (or the reason it could not be
    /// computed) is ready to be used as context.
    Answer(SymbolicAnswer),
    /// Not a two-year metric question; fall back to subgraph retrieval.
    NoMatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolicAnswer {
    /// Human-readable computation trace or failure message.
    pub explanation: String,
    /// Rendered facts the explanation was derived from.
    pub evidence: String,
    /// `None` when the values were missing or the baseline was zero.
    pub percent_change: Option<f64>,
}

/// The two smallest years in the question, ascending.
///
/// The smaller year is always the baseline, whatever order or phrasing
/// ("from 2021 to 2019") the question used. Repeated years count twice, so
/// "2019 vs 2019" compares a year with itself.
pub fn target_years(question: &str) -> Option<(String, String)> {
    let mut years = extract_years(question);
    years.sort();
    let mut ascending = years.into_iter();
    Some((ascending.next()?, ascending.next()?))
}

/// First vocabulary keyword present in the question.
pub fn target_metric(question: &str) -> Option<&'static str> {
    extract_metrics(question).into_iter().next()
}

/// Metric names a keyword may be stored under.
pub fn metric_aliases(keyword: &str) -> Vec<String> {
    vec![
        keyword.to_string(),
        format!("{} cost", keyword),
        format!("{} expense", keyword),
        format!("average {}", keyword),
    ]
}

/// `(new - base) / base * 100`, or `None` for a zero baseline.
pub fn percent_change(base: f64, new: f64) -> Option<f64> {
    if base == 0.0 {
        None
    } else {
        Some((new - base) / base * 100.0)
    }
}

/// Prefer a metric named exactly like an alias, else the first in name order.
fn pick_fact<'a>(facts: &'a [Fact], aliases: &[String]) -> Option<&'a Fact> {
    let first = facts.first()?;
    Some(
        facts
            .iter()
            .find(|f| aliases.iter().any(|a| f.metric.eq_ignore_ascii_case(a)))
            .unwrap_or(first),
    )
}

/// Alias-matching facts for one year, so a crowded year can't crowd out the other.
async fn year_candidates(db: &Db, year: &str, aliases: &[String]) -> Result<Vec<Fact>> {
    let filter = FactFilter::All(vec![
        FactFilter::YearIs(year.to_string()),
        FactFilter::Any(aliases.iter().cloned().map(FactFilter::MetricContains).collect()),
    ]);
    graph::query_facts(db, &filter, ANALYSIS_ROW_LIMIT).await
}

pub async fn analyze(db: &Db, question: &str) -> Result<Analysis> {
    let Some((year1, year2)) = target_years(question) else {
        log::debug!("Symbolic analysis skipped: fewer than two years");
        return Ok(Analysis::NoMatch);
    };
    let Some(keyword) = target_metric(question) else {
        log::debug!("Symbolic analysis skipped: no metric keyword");
        return Ok(Analysis::NoMatch);
    };

    let aliases = metric_aliases(keyword);
    let base_facts = year_candidates(db, &year1, &aliases).await?;
    let new_facts = if year2 == year1 {
        base_facts.clone()
    } else {
        year_candidates(db, &year2, &aliases).await?
    };

    log::info!(
        "Symbolic analysis: metric={} years={}..{} ({} + {} candidate facts)",
        keyword,
        year1,
        year2,
        base_facts.len(),
        new_facts.len()
    );

    let (base, new) = match (pick_fact(&base_facts, &aliases), pick_fact(&new_facts, &aliases)) {
        (Some(base), Some(new)) => (base, new),
        _ => {
            let mut facts = base_facts.clone();
            if year2 != year1 {
                facts.extend(new_facts.iter().cloned());
            }
            let found: BTreeSet<&str> = facts.iter().map(|f| f.year.as_str()).collect();
            let found = if found.is_empty() {
                "none".to_string()
            } else {
                found.into_iter().collect::<Vec<_>>().join(", ")
            };
            return Ok(Analysis::Answer(SymbolicAnswer {
                explanation: format!(
                    "Could not find {} data for both {} and {}. Years found: {}.",
                    keyword, year1, year2, found
                ),
                evidence: graph::render_facts(&facts),
                percent_change: None,
            }));
        }
    };

    let evidence = graph::render_facts(&[base.clone(), new.clone()]);
    let v1 = format_amount(base.value);
    let v2 = format_amount(new.value);
    let header = format!(
        "{} in {}: {}\n{} in {}: {}",
        base.metric, year1, v1, new.metric, year2, v2
    );

    let answer = match percent_change(base.value, new.value) {
        Some(change) => SymbolicAnswer {
            explanation: format!(
                "{}\nPercent Change = (({} - {}) / {}) * 100 = {:.2}%",
                header, v2, v1, v1, change
            ),
            evidence,
            percent_change: Some(change),
        },
        None => SymbolicAnswer {
            explanation: format!(
                "{}\nCannot compute the percent change: the {} value is 0 (division by zero).",
                header, year1
            ),
            evidence,
            percent_change: None,
        },
    };

    Ok(Analysis::Answer(answer))
}
