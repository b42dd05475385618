//! Boolean filters over (year, metric name), compiled to parameterized SQL.

use rusqlite::types::Value as SqlValue;

/// Predicate tree over a fact's year and metric name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactFilter {
    /// Matches every fact.
    True,
    /// Year equals the given value.
    YearIs(String),
    /// Metric name contains the needle, case-insensitively.
    MetricContains(String),
    /// At least one child matches. Empty never matches.
    Any(Vec<FactFilter>),
    /// Every child matches. Empty always matches.
    All(Vec<FactFilter>),
}

impl FactFilter {
    /// SQL boolean expression over aliases `y` (years) and `m` (metrics),
    /// with one `?` placeholder per entry in the returned parameter list.
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut params = Vec::new();
        let clause = self.write_sql(&mut params);
        (clause, params)
    }

    fn write_sql(&self, params: &mut Vec<SqlValue>) -> String {
        match self {
            FactFilter::True => "1".to_string(),
            FactFilter::YearIs(year) => {
                params.push(SqlValue::Text(year.clone()));
                "y.value = ?".to_string()
            }
            FactFilter::MetricContains(needle) => {
                // instr() instead of LIKE so '%' and '_' in the needle are literal
                params.push(SqlValue::Text(needle.to_lowercase()));
                "instr(lower(m.name), ?) > 0".to_string()
            }
            FactFilter::Any(children) => join(children, " OR ", "0", params),
            FactFilter::All(children) => join(children, " AND ", "1", params),
        }
    }
}

fn join(children: &[FactFilter], op: &str, empty: &str, params: &mut Vec<SqlValue>) -> String {
    if children.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = children.iter().map(|c| c.write_sql(params)).collect();
    format!("({})", parts.join(op))
}
