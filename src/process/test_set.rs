use serde::Deserialize;

use crate::process::utils::sanitize_token;

/// Substituted when no test identifier could be derived.
pub const UNKNOWN_TEST: &str = "unknown_test";

/// Built-in `(pattern, token)` table. Order is precedence: the first pattern
/// contained in the text wins, so e.g. `hep a igm` shadows `hep a igg` for
/// text that mentions both.
pub const DEFAULT_TEST_SETS: &[(&str, &str)] = &[
    ("hep a igm", "hep_a_igm"),
    ("hepatitis a igm", "hep_a_igm"),
    ("hep a igg", "hep_a_igg"),
    ("hepatitis a igg", "hep_a_igg"),
    ("hiv viral load", "hiv_vl"),
    ("hiv vl", "hiv_vl"),
    ("hiv pcr", "hiv_pcr"),
    ("cmv igm", "cmv_igm"),
    ("cmv igg", "cmv_igg"),
    ("rubella igm", "rubella_igm"),
    ("rubella igg", "rubella_igg"),
    ("hep b pcr", "hep_b_pcr"),
    ("hep b igg", "hep_b_igg"),
    ("hep c pcr", "hep_c_pcr"),
    ("hep c viral load", "hep_c_vl"),
    ("hbsag", "hbsag"),
    ("ebv igg", "ebv_igg"),
    ("ebv igm", "ebv_igm"),
    ("hsv igm", "hsv_igm"),
    ("hsv igg", "hsv_igg"),
];

/// Cell text containing any of these is treated as the test description.
pub const DEFAULT_TEST_MARKERS: &[&str] = &["igm", "igg", "pcr", "viral load", "antibody"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestSetRule {
    pub pattern: String,
    pub token: String,
}

impl TestSetRule {
    pub fn new(pattern: &str, token: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            token: token.to_string(),
        }
    }
}

pub fn default_rules() -> Vec<TestSetRule> {
    DEFAULT_TEST_SETS
        .iter()
        .map(|(pattern, token)| TestSetRule::new(pattern, token))
        .collect()
}

pub fn default_markers() -> Vec<String> {
    DEFAULT_TEST_MARKERS.iter().map(|m| m.to_string()).collect()
}

/// Maps free-form test names to canonical, filesystem-safe tokens.
#[derive(Debug, Clone)]
pub struct TestSetNormalizer {
    rules: Vec<TestSetRule>,
    markers: Vec<String>,
}

impl TestSetNormalizer {
    /// Patterns and markers are lowercased here so matching is
    /// case-insensitive regardless of how the table was written.
    pub fn new(rules: Vec<TestSetRule>, markers: Vec<String>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| TestSetRule {
                pattern: r.pattern.to_lowercase(),
                token: r.token,
            })
            .collect();
        let markers = markers.into_iter().map(|m| m.to_lowercase()).collect();
        Self { rules, markers }
    }

    pub fn has_marker(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.markers.iter().any(|m| lowered.contains(m.as_str()))
    }

    pub fn normalize(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|r| lowered.contains(r.pattern.as_str()))
            .map(|r| r.token.clone())
            .or_else(|| sanitize_token(&lowered))
            .unwrap_or_else(|| UNKNOWN_TEST.to_string())
    }
}

impl Default for TestSetNormalizer {
    fn default() -> Self {
        Self::new(default_rules(), default_markers())
    }
}
