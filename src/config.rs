//! Renamer configuration.
//!
//! Every field has a built-in default, so an empty YAML document (or no file
//! at all) yields the standard behaviour. Lists replace their defaults
//! wholesale rather than merging, which keeps the precedence of the test-set
//! table exactly as written.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::process::{
    date_parser::{DEFAULT_DATE_FORMATS, DEFAULT_STRICT_DATE_FORMATS},
    extract::StrategyKind,
    test_set::{default_markers, default_rules, TestSetRule},
};

#[derive(Debug, Clone, Deserialize)]
pub struct RenamerConfig {
    /// Mode used when a caller does not pick one per upload.
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Ordered `(pattern, token)` lookup; first match wins.
    #[serde(default = "default_rules")]
    pub test_sets: Vec<TestSetRule>,
    #[serde(default = "default_markers")]
    pub test_markers: Vec<String>,
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
    /// Formats tried by the fixed-offset mode before it gives up.
    #[serde(default = "default_strict_date_formats")]
    pub strict_date_formats: Vec<String>,
}

fn default_date_formats() -> Vec<String> {
    DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect()
}

fn default_strict_date_formats() -> Vec<String> {
    DEFAULT_STRICT_DATE_FORMATS.iter().map(|f| f.to_string()).collect()
}

impl Default for RenamerConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            test_sets: default_rules(),
            test_markers: default_markers(),
            date_formats: default_date_formats(),
            strict_date_formats: default_strict_date_formats(),
        }
    }
}

impl RenamerConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("invalid renamer config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config `{}`", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in `{}`", path.display()))
    }

    /// `load(path)` if a path was given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
