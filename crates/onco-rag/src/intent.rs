//! Keyword-based query intent classification.
//!
//! Diagnostic-style queries (imaging findings, biomarkers, report questions)
//! take the retrieval path; everything else goes to the agent team. A
//! first-match-wins existence check, no scoring.

use onco_core::IntentClassifier;
use regex::RegexSet;

/// Patterns marking a query as diagnostic. Matched case-insensitively,
/// anywhere in the query.
const DIAGNOSTIC_PATTERNS: &[&str] = &[
    r"malignant vs benign",
    r"mimicker",
    r"imaging features",
    r"biomarker ratio",
    r"risk weightage",
    r"granuloma",
    r"nodule",
    r"tuberculosis",
    r"sarcoidosis",
    r"report",
    r"test",
    r"results",
    r"explain",
];

pub struct KeywordClassifier {
    patterns: RegexSet,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        let patterns = RegexSet::new(
            DIAGNOSTIC_PATTERNS
                .iter()
                .map(|p| format!("(?i){p}")),
        )
        .expect("diagnostic patterns are valid regexes");
        Self { patterns }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier for KeywordClassifier {
    fn is_diagnostic(&self, query: &str) -> bool {
        self.patterns.is_match(query)
    }
}
