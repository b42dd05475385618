//! Subgraph retrieval: turn a question's years and keywords into a fact filter
//! and render the matching facts as context lines.

use crate::db::Db;
use crate::error::Result;
use crate::extract::{extract, Extraction};
use crate::graph::{self, FactFilter};

/// Returned instead of an empty string when nothing matched.
pub const NO_RELEVANT_DATA: &str = "No relevant data found in the financial knowledge graph.";

/// Filter for the detected terms. Years not present in the graph are ignored;
/// with nothing left to filter on, every fact matches.
pub fn build_filter(extraction: &Extraction, known_years: &[String]) -> FactFilter {
    let mut years: Vec<&String> = Vec::new();
    for year in &extraction.years {
        if known_years.contains(year) && !years.contains(&year) {
            years.push(year);
        }
    }

    if years.is_empty() && extraction.metrics.is_empty() {
        return FactFilter::True;
    }

    let mut predicates: Vec<FactFilter> = years
        .into_iter()
        .map(|y| FactFilter::YearIs(y.clone()))
        .collect();
    predicates.extend(
        extraction
            .metrics
            .iter()
            .map(|m| FactFilter::MetricContains(m.to_string())),
    );
    FactFilter::Any(predicates)
}

/// Facts relevant to `question`, one rendered line each, or [`NO_RELEVANT_DATA`].
pub async fn retrieve(db: &Db, question: &str, row_limit: usize) -> Result<String> {
    let extraction = extract(question);
    let known_years = graph::year_values(db).await?;
    let filter = build_filter(&extraction, &known_years);

    log::debug!(
        "Retrieving subgraph: years={:?} metrics={:?} filter={:?}",
        extraction.years,
        extraction.metrics,
        filter
    );

    let facts = graph::query_facts(db, &filter, row_limit).await?;
    log::info!("Retrieved {} fact(s) for question", facts.len());

    if facts.is_empty() {
        return Ok(NO_RELEVANT_DATA.to_string());
    }
    Ok(graph::render_facts(&facts))
}

/// The whole graph (up to `row_limit` facts), for a full refresh of the context.
pub async fn snapshot(db: &Db, row_limit: usize) -> Result<String> {
    let facts = graph::query_facts(db, &FactFilter::True, row_limit).await?;
    if facts.is_empty() {
        return Ok(NO_RELEVANT_DATA.to_string());
    }
    Ok(graph::render_facts(&facts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testutil::{migrated_db, seed};

    fn years(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_unfiltered_when_nothing_detected() {
        let filter = build_filter(&extract("how are we doing?"), &years(&["2019"]));
        assert_eq!(filter, FactFilter::True);
    }

    #[test]
    fn test_filter_drops_unknown_years() {
        let filter = build_filter(&extract("numbers for 2030"), &years(&["2019", "2020"]));
        assert_eq!(filter, FactFilter::True);
    }

    #[test]
    fn test_filter_years_and_metrics() {
        let filter = build_filter(
            &extract("revenue in 2020 and 2020 and 2031"),
            &years(&["2019", "2020"]),
        );
        assert_eq!(
            filter,
            FactFilter::Any(vec![
                FactFilter::YearIs("2020".into()),
                FactFilter::MetricContains("revenue".into()),
            ])
        );
    }

    #[tokio::test]
    async fn test_retrieve_matches_year_or_metric() {
        let (db, _temp) = migrated_db().await;
        seed(&db, &[
            ("2019", "Fuel Cost", 100.0),
            ("2020", "Fuel Cost", 150.0),
            ("2020", "Revenue", 900.0),
            ("2021", "Revenue", 950.0),
        ]).await;

        let text = retrieve(&db, "fuel in 2021", 100).await.unwrap();
        assert_eq!(
            text,
            "[2019] Metric | Fuel Cost → 100\n\
             [2020] Metric | Fuel Cost → 150\n\
             [2021] Metric | Revenue → 950"
        );
    }

    #[tokio::test]
    async fn test_retrieve_no_match_returns_sentinel() {
        let (db, _temp) = migrated_db().await;
        seed(&db, &[("2019", "Fuel Cost", 100.0)]).await;

        let text = retrieve(&db, "what was revenue?", 100).await.unwrap();
        assert_eq!(text, NO_RELEVANT_DATA);
    }

    #[tokio::test]
    async fn test_retrieve_empty_graph_returns_sentinel() {
        let (db, _temp) = migrated_db().await;
        let text = retrieve(&db, "anything at all", 100).await.unwrap();
        assert_eq!(text, NO_RELEVANT_DATA);
        assert!(!text.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_respects_row_limit() {
        let (db, _temp) = migrated_db().await;
        seed(&db, &[
            ("2019", "Revenue", 1.0),
            ("2020", "Revenue", 2.0),
            ("2021", "Revenue", 3.0),
        ]).await;

        let text = retrieve(&db, "revenue", 2).await.unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("[2019]"));
    }

    #[tokio::test]
    async fn test_snapshot_lists_everything() {
        let (db, _temp) = migrated_db().await;
        seed(&db, &[("2019", "Revenue", 1.0), ("2020", "Fuel Cost", 2.0)]).await;

        let text = snapshot(&db, 100).await.unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
