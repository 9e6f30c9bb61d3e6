use once_cell::sync::Lazy;
use regex::Regex;

use crate::process::raw_table::Cell;

static NON_TOKEN_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("token regex must compile"));

/// 1) Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Field values a dataframe reader treats as "no value".
const NA_TOKENS: &[&str] = &["", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "#N/A", "None"];

/// 2) Classify a decoded CSV field the way a dataframe reader would:
/// blank or NA-like → missing, float-parsable → numeric, anything else → text.
pub fn infer_cell(raw: &str) -> Cell {
    let cleaned = raw.trim();
    if NA_TOKENS.contains(&cleaned) {
        Cell::Missing
    } else if cleaned.parse::<f64>().is_ok() {
        Cell::Numeric(raw.to_string())
    } else {
        Cell::Text(raw.to_string())
    }
}

/// Reduce lowercase text to `[a-z0-9_]`, collapsing separator runs and
/// trimming them from both ends. Returns `None` when nothing survives.
pub fn sanitize_token(lowered: &str) -> Option<String> {
    let replaced = NON_TOKEN_CHARS.replace_all(lowered, "_");
    let token = replaced.trim_matches('_');
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Keep only the part after the last `|`, for cells shaped like `label|value`.
pub fn strip_label_prefix(raw: &str) -> &str {
    match raw.rsplit_once('|') {
        Some((_, value)) => value,
        None => raw,
    }
}
