use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const NUMBER: &str = r"[-+]?\$?\s?(?:\d{1,3}(?:[, ]\d{3})+|\d+)(?:\.\d+)?(?:\s*(?:million|billion|bn|m|k)\b)?";

static PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("revenue", r"revenue[:\s\-]+"),
        ("net_income", r"net\s+income[:\s\-]+"),
        ("profit", r"(?:gross|operating|net)?\s*profit[:\s\-]+"),
        ("operating_expenses", r"operating\s+expenses[:\s\-]+"),
        ("cogs", r"(?:cost\s+of\s+goods\s+sold|cogs)[:\s\-]+"),
    ]
    .into_iter()
    .map(|(name, label)| {
        let pattern = format!("(?i){label}(?P<value>{NUMBER})");
        (name, Regex::new(&pattern).expect("metric regex"))
    })
    .collect()
});

static SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<number>.*?)\s*(?P<suffix>billion|million|bn|m|k)$").expect("suffix regex"));

/// Metric names recognised by [`extract_metrics`], in reporting order.
pub const METRIC_NAMES: [&str; 5] = [
    "revenue",
    "net_income",
    "profit",
    "operating_expenses",
    "cogs",
];

/// Named financial figures found in a document set.
///
/// A missing key means the figure was not found, not that it is zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinancialMetrics {
    values: IndexMap<String, String>,
}

impl FinancialMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.values).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Scans the joined texts for each known metric and keeps the first match
/// in document order. Later occurrences, including ones from other
/// documents, are ignored.
pub fn extract_metrics<S: AsRef<str>>(texts: &[S]) -> FinancialMetrics {
    let joined = texts
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join("\n\n");
    let mut metrics = FinancialMetrics::new();
    for (name, pattern) in PATTERNS.iter() {
        if let Some(value) = pattern
            .captures(&joined)
            .and_then(|caps| caps.name("value"))
        {
            metrics.insert(*name, normalize_number(value.as_str()));
        }
    }
    metrics
}

/// Converts a matched figure such as `$1,234.5 million` into an absolute
/// integer string. Returns the input unchanged when it cannot be parsed.
pub fn normalize_number(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let (number, multiplier) = match SUFFIX.captures(&lowered) {
        Some(caps) => {
            let multiplier = match &caps["suffix"] {
                "k" => 1e3,
                "m" | "million" => 1e6,
                _ => 1e9,
            };
            (caps["number"].to_string(), multiplier)
        }
        None => (lowered.clone(), 1.0),
    };
    let cleaned: String = number
        .chars()
        .filter(|c| !matches!(c, ',' | '$') && !c.is_whitespace())
        .collect();
    match cleaned.parse::<f64>() {
        Ok(value) => {
            let scaled = (value * multiplier).trunc();
            if scaled.is_finite() {
                // `+ 0.0` folds -0 into 0
                format!("{:.0}", scaled + 0.0)
            } else {
                raw.to_string()
            }
        }
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_suffixes_and_separators() {
        assert_eq!(normalize_number("$1,234.5 million"), "1234500000");
        assert_eq!(normalize_number("45k"), "45000");
        assert_eq!(normalize_number("2.5 bn"), "2500000000");
        assert_eq!(normalize_number("3 Billion"), "3000000000");
        assert_eq!(normalize_number("1 234 567"), "1234567");
        assert_eq!(normalize_number("-$12.9"), "-12");
        assert_eq!(normalize_number("7m"), "7000000");
    }

    #[test]
    fn figures_beyond_i64_keep_their_magnitude() {
        assert_eq!(
            normalize_number("12,000,000,000 billion"),
            "12000000000000000000"
        );
        let metrics = extract_metrics(&["Revenue: 12,000,000,000,000,000,000"]);
        assert_eq!(metrics.get("revenue"), Some("12000000000000000000"));
        assert_eq!(normalize_number("-0.4"), "0");
    }

    #[test]
    fn adjacent_tab_separated_cells_stay_apart() {
        let metrics = extract_metrics(&["Metric\tFY2024\tFY2023\nRevenue\t100\t200\n"]);
        assert_eq!(metrics.get("revenue"), Some("100"));
        let metrics = extract_metrics(&["Revenue\t5000000\nCOGS\t120"]);
        assert_eq!(metrics.get("revenue"), Some("5000000"));
    }

    #[test]
    fn unparsable_values_are_returned_unchanged() {
        assert_eq!(normalize_number("n/a"), "n/a");
        assert_eq!(normalize_number("1.2.3 m"), "1.2.3 m");
    }

    #[test]
    fn extracts_known_metrics() {
        let texts = [
            "Revenue: $1,234.5 million for the year.",
            "Net income - 200k\nGross profit: 350,000\nOperating expenses: 1.1 bn\nCOGS 42",
        ];
        let metrics = extract_metrics(&texts);
        assert_eq!(metrics.get("revenue"), Some("1234500000"));
        assert_eq!(metrics.get("net_income"), Some("200000"));
        assert_eq!(metrics.get("profit"), Some("350000"));
        assert_eq!(metrics.get("operating_expenses"), Some("1100000000"));
        assert_eq!(metrics.get("cogs"), Some("42"));
    }

    #[test]
    fn first_match_wins_across_documents() {
        let metrics = extract_metrics(&["Revenue: 100", "Revenue: 999"]);
        assert_eq!(metrics.get("revenue"), Some("100"));
    }

    #[test]
    fn missing_metrics_are_absent() {
        let metrics = extract_metrics(&["Nothing financial in here."]);
        assert!(metrics.is_empty());
        assert_eq!(metrics.get("revenue"), None);
    }

    #[test]
    fn ungrouped_spreadsheet_numbers_are_read_whole() {
        let metrics = extract_metrics(&["Sheet: P&L\nMetric\tValue\nRevenue\t5000000\n"]);
        assert_eq!(metrics.get("revenue"), Some("5000000"));
    }

    #[test]
    fn suffix_requires_word_boundary() {
        let metrics = extract_metrics(&["Revenue 500 more than expected"]);
        assert_eq!(metrics.get("revenue"), Some("500"));
    }

    #[test]
    fn extraction_is_idempotent() {
        let texts = ["Revenue: 10m", "COGS: 4m"];
        assert_eq!(extract_metrics(&texts), extract_metrics(&texts));
    }

    #[test]
    fn pretty_json_keeps_vocabulary_order() {
        let metrics = extract_metrics(&["COGS: 4\nRevenue: 10"]);
        let json = metrics.to_pretty_json();
        assert!(json.find("revenue").unwrap() < json.find("cogs").unwrap());
        assert!(json.contains("\"revenue\": \"10\""));
    }
}
