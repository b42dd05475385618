//! Tabular loader: year rows × metric columns into the graph.
//!
//! Input is a JSON array of objects, each mapping a table name to a row matrix
//! whose first row is the header. Re-running a load converges to the same graph.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use crate::db::Db;
use crate::error::{FinbotError, Result};
use crate::graph::{merge_fact, FactRecord};
use crate::normalize::normalize;

/// One JSON object from the input: table name → rows (header first).
pub type TableSet = BTreeMap<String, Vec<Vec<Value>>>;

/// Counters for a finished load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub tables: usize,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub facts_upserted: usize,
    pub cells_dropped: usize,
}

fn year_prefix_regex() -> &'static Regex {
    static YEAR_PREFIX: OnceLock<Regex> = OnceLock::new();
    YEAR_PREFIX.get_or_init(|| Regex::new(r"^\s*(\d{4})").expect("year prefix regex"))
}

pub fn parse_tables(json: &str) -> Result<Vec<TableSet>> {
    Ok(serde_json::from_str(json)?)
}

pub fn read_tables(path: &Path) -> Result<Vec<TableSet>> {
    let content = std::fs::read_to_string(path)?;
    parse_tables(&content)
        .map_err(|e| FinbotError::Parse(format!("{}: {}", path.display(), e)))
}

/// Year key of a row's first cell, if it starts with four digits.
pub fn year_key(cell: &Value) -> Option<String> {
    let text = match cell {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    year_prefix_regex()
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn header_name(cell: &Value) -> Option<String> {
    match cell {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric cells of one data row as records; the second value counts dropped cells.
pub fn row_records(year: &str, header: &[Value], row: &[Value]) -> (Vec<FactRecord>, usize) {
    let mut records = Vec::new();
    let mut dropped = 0;

    for (idx, cell) in row.iter().enumerate().skip(1) {
        let name = header.get(idx).and_then(header_name);
        match (name, normalize(cell).as_number()) {
            (Some(metric), Some(value)) => records.push(FactRecord {
                year: year.to_string(),
                metric,
                value,
            }),
            _ => dropped += 1,
        }
    }

    (records, dropped)
}

/// Load every table, one transaction per row.
pub async fn load_tables(db: &Db, tables: &[TableSet]) -> Result<LoadReport> {
    let mut report = LoadReport::default();

    for set in tables {
        for (name, rows) in set {
            report.tables += 1;
            let Some((header, data)) = rows.split_first() else {
                log::warn!("Table {} is empty, skipping", name);
                continue;
            };
            log::info!("Loading table {} ({} data rows)", name, data.len());

            for row in data {
                let Some(year) = row.first().and_then(year_key) else {
                    log::debug!("Table {}: skipping non-year row {:?}", name, row.first());
                    report.rows_skipped += 1;
                    continue;
                };

                let (records, dropped) = row_records(&year, header, row);
                report.cells_dropped += dropped;
                report.facts_upserted += records.len();
                report.rows_loaded += 1;

                db.with_connection(move |conn| {
                    let tx = conn.transaction()?;
                    for record in &records {
                        merge_fact(&tx, record)?;
                    }
                    tx.commit()?;
                    Ok(())
                })
                .await?;
            }
        }
    }

    log::info!(
        "Load finished: {} tables, {} rows loaded, {} skipped, {} facts, {} cells dropped",
        report.tables,
        report.rows_loaded,
        report.rows_skipped,
        report.facts_upserted,
        report.cells_dropped
    );
    Ok(report)
}
