//! Year and metric keyword detection in free text.
//!
//! Deliberately coarse: years are `20xx` tokens, metrics are plain substring
//! hits against a fixed vocabulary.

use regex::Regex;
use std::sync::OnceLock;

/// Financial metric keywords, in match priority order.
pub const METRIC_KEYWORDS: &[&str] = &[
    "fuel",
    "expense",
    "revenue",
    "utilization",
    "cost",
    "income",
    "price",
    "load",
    "gallons",
];

/// Years and metric keywords found in a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Year tokens in the order they appear, duplicates kept.
    pub years: Vec<String>,
    /// Matched keywords in vocabulary order.
    pub metrics: Vec<&'static str>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.years.is_empty() && self.metrics.is_empty()
    }
}

fn year_regex() -> &'static Regex {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    YEAR.get_or_init(|| Regex::new(r"\b20\d{2}\b").expect("year regex"))
}

/// Every `20xx` token in `text`, in order of appearance.
pub fn extract_years(text: &str) -> Vec<String> {
    year_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Every vocabulary keyword occurring anywhere in `text`, case-insensitively.
pub fn extract_metrics(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    METRIC_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| lowered.contains(keyword))
        .collect()
}

pub fn extract(text: &str) -> Extraction {
    Extraction {
        years: extract_years(text),
        metrics: extract_metrics(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_years_and_metrics() {
        let found = extract("fuel cost in 2019 vs 2021");
        assert_eq!(found.years, vec!["2019", "2021"]);
        assert_eq!(found.metrics, vec!["fuel", "cost"]);
    }

    #[test]
    fn test_years_keep_order_and_duplicates() {
        assert_eq!(extract_years("2021, then 2019, then 2021 again"), vec!["2021", "2019", "2021"]);
    }

    #[test]
    fn test_year_word_boundaries() {
        // 1999 and 12020 are not 20xx tokens; 2020s suffix breaks the boundary
        assert!(extract_years("1999 and 12020 and 2020s").is_empty());
        assert_eq!(extract_years("(2018)"), vec!["2018"]);
    }

    #[test]
    fn test_metrics_in_vocabulary_order() {
        // Text order is price then revenue, vocabulary order wins
        assert_eq!(extract_metrics("Price and REVENUE"), vec!["revenue", "price"]);
    }

    #[test]
    fn test_keyword_substring_false_positive() {
        // "download" contains "load": accepted coarse behaviour
        assert_eq!(extract_metrics("how do I download the report"), vec!["load"]);
        // "costs" still matches "cost"
        assert_eq!(extract_metrics("operating costs"), vec!["cost"]);
    }

    #[test]
    fn test_synonym_false_negative() {
        // "sales" and "earnings" are not in the vocabulary
        let found = extract("sales and earnings last year");
        assert!(found.is_empty());
    }
}
