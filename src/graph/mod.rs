//! Financial knowledge graph: Year -[HAS_METRIC]-> Metric -[HAS_VALUE]-> Value.
//!
//! The graph lives in SQLite as node tables plus join tables. Reads go through
//! [`FactFilter`], which compiles to bound parameters rather than query text.

mod filter;
mod store;

pub use filter::FactFilter;
pub(crate) use store::merge_fact;
pub use store::{count_facts, query_facts, upsert_fact, year_values};
#[cfg(test)]
pub(crate) use store::testutil;

use serde::{Deserialize, Serialize};

/// Label of the node that carries a metric name.
pub const METRIC_LABEL: &str = "Metric";

/// One (year, metric, value) path read back from the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub year: String,
    pub node_type: String,
    pub metric: String,
    pub value: f64,
}

impl Fact {
    /// `[<year>] <type> | <metric> → <value>`
    pub fn render(&self) -> String {
        format!(
            "[{}] {} | {} → {}",
            self.year,
            self.node_type,
            self.metric,
            format_amount(self.value)
        )
    }
}

/// A triple to be merged into the graph by the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct FactRecord {
    pub year: String,
    pub metric: String,
    pub value: f64,
}

/// Render an amount the way it was most likely written: `150`, not `150.0`.
pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Render facts one per line.
pub fn render_facts(facts: &[Fact]) -> String {
    facts.iter().map(Fact::render).collect::<Vec<_>>().join("\n")
}
