//! Field extraction strategies.
//!
//! Both strategies pull the same three fields out of the leading rows of an
//! upload but disagree on what to do when something is missing:
//!
//! - [`ScanStrategy`] searches label/marker windows and degrades to
//!   placeholder tokens.
//! - [`FixedOffsetStrategy`] reads hard-coded cell positions and fails.

use std::{fmt, str::FromStr};

use serde::Deserialize;
use tracing::debug;

use crate::errors::{RenameError, RenameResult, UnparsedDate};
use crate::process::{
    date_parser::{DateNormalizer, DEFAULT_STRICT_DATE_FORMATS},
    naming,
    raw_table::RawTable,
    test_set::{TestSetNormalizer, UNKNOWN_TEST},
    utils::{clean_str, strip_label_prefix},
};

pub const UNKNOWN_START: &str = "unknown_start";
pub const UNKNOWN_END: &str = "unknown_end";

const DATE_FROM_LABEL: &str = "date from";
const DATE_TO_LABEL: &str = "date to";

/// Date labels are searched in the first 5 rows x 10 columns.
const LABEL_ROWS: usize = 5;
const LABEL_COLS: usize = 10;
/// Test markers are searched in the first 10 rows x 5 columns.
const MARKER_ROWS: usize = 10;
const MARKER_COLS: usize = 5;

const SCAN_ROW_LIMIT: usize = 15;
const FIXED_ROW_LIMIT: usize = 10;
const FIXED_TEST_CODE_ROW: usize = 9;

/// The three raw values a strategy pulls out of the table. Any of them may
/// be absent.
///
/// For the scanning strategy a date of `Some("")` means the label was found
/// but the cell next to it was empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub test_label: Option<String>,
    pub date_from_raw: Option<String>,
    pub date_to_raw: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Scan,
    #[serde(alias = "fixed", alias = "fixed-offset")]
    FixedOffset,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Scan => write!(f, "scan"),
            StrategyKind::FixedOffset => write!(f, "fixed"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(StrategyKind::Scan),
            "fixed" | "fixed-offset" | "fixed_offset" => Ok(StrategyKind::FixedOffset),
            other => Err(format!(
                "unknown strategy `{other}` (expected `scan` or `fixed`)"
            )),
        }
    }
}

/// One way of turning the leading rows of an upload into a file name.
pub trait ExtractionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// How many leading rows the loader needs to materialize.
    fn row_limit(&self) -> usize;

    fn extract_fields(&self, table: &RawTable) -> RenameResult<ExtractedFields>;

    /// Build the download name from extracted fields. `upload_name` is the
    /// client-supplied file name, if any.
    fn file_name(
        &self,
        fields: &ExtractedFields,
        upload_name: Option<&str>,
    ) -> RenameResult<String>;

    /// Bytes to hand back for download, given the loaded prefix `table` and
    /// the raw `upload`.
    fn content(&self, table: &RawTable, upload: &[u8]) -> RenameResult<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct ScanStrategy {
    tests: TestSetNormalizer,
    dates: DateNormalizer,
}

impl ScanStrategy {
    pub fn new(tests: TestSetNormalizer, dates: DateNormalizer) -> Self {
        Self { tests, dates }
    }

    fn find_dates(&self, table: &RawTable) -> (Option<String>, Option<String>) {
        let width = table.width();
        let mut from = None;
        let mut to = None;

        for row in 0..table.len().min(LABEL_ROWS) {
            for col in 0..width.min(LABEL_COLS) {
                let Some(label) = table.get(row, col).as_text() else {
                    continue;
                };
                let label = label.to_lowercase();
                // A later label overrides an earlier one, including with
                // "nothing" when it sits in the last column.
                let neighbour = || {
                    (col + 1 < width)
                        .then(|| table.get(row, col + 1).as_str().unwrap_or("").to_string())
                };
                if label.contains(DATE_FROM_LABEL) {
                    from = neighbour();
                }
                if label.contains(DATE_TO_LABEL) {
                    to = neighbour();
                }
            }
        }
        (from, to)
    }

    fn find_test_label(&self, table: &RawTable) -> Option<String> {
        let width = table.width();
        (0..table.len().min(MARKER_ROWS))
            .flat_map(|row| (0..width.min(MARKER_COLS)).map(move |col| (row, col)))
            .filter_map(|(row, col)| table.get(row, col).as_str())
            .find(|text| self.tests.has_marker(text))
            .map(str::to_string)
    }
}

impl Default for ScanStrategy {
    fn default() -> Self {
        Self::new(TestSetNormalizer::default(), DateNormalizer::default())
    }
}

impl ExtractionStrategy for ScanStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Scan
    }

    fn row_limit(&self) -> usize {
        SCAN_ROW_LIMIT
    }

    fn extract_fields(&self, table: &RawTable) -> RenameResult<ExtractedFields> {
        let (date_from_raw, date_to_raw) = self.find_dates(table);
        let fields = ExtractedFields {
            test_label: self.find_test_label(table),
            date_from_raw,
            date_to_raw,
        };
        debug!(?fields, "scanned fields");
        Ok(fields)
    }

    fn file_name(
        &self,
        fields: &ExtractedFields,
        _upload_name: Option<&str>,
    ) -> RenameResult<String> {
        let test = fields
            .test_label
            .as_deref()
            .map(|label| self.tests.normalize(label))
            .unwrap_or_else(|| UNKNOWN_TEST.to_string());
        let from = fields
            .date_from_raw
            .as_deref()
            .map(|raw| self.dates.normalize(raw))
            .unwrap_or_else(|| UNKNOWN_START.to_string());
        let to = fields
            .date_to_raw
            .as_deref()
            .map(|raw| self.dates.normalize(raw))
            .unwrap_or_else(|| UNKNOWN_END.to_string());
        Ok(naming::scan_file_name(&test, &from, &to))
    }

    /// The loaded prefix written back out as plain CSV. Rows past the
    /// row limit are never read.
    fn content(&self, table: &RawTable, _upload: &[u8]) -> RenameResult<Vec<u8>> {
        table.to_csv_bytes()
    }
}

/// Reads column 0 of rows 0, 1 and 9. The dates may carry a `label|` prefix.
/// The test code is used as is: only surrounding whitespace and one pair of
/// outer quotes are removed, and no lookup table is applied.
#[derive(Debug, Clone)]
pub struct FixedOffsetStrategy {
    dates: DateNormalizer,
}

impl FixedOffsetStrategy {
    pub fn new(dates: DateNormalizer) -> Self {
        Self { dates }
    }

    fn required_cell(table: &RawTable, row: usize, field: &'static str) -> RenameResult<String> {
        table
            .get(row, 0)
            .as_str()
            .map(clean_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RenameError::MissingField {
                field,
                detail: format!("row {} column 1 is empty", row + 1),
            })
    }
}

impl Default for FixedOffsetStrategy {
    fn default() -> Self {
        Self::new(DateNormalizer::new(DEFAULT_STRICT_DATE_FORMATS.iter().copied()))
    }
}

impl ExtractionStrategy for FixedOffsetStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FixedOffset
    }

    fn row_limit(&self) -> usize {
        FIXED_ROW_LIMIT
    }

    fn extract_fields(&self, table: &RawTable) -> RenameResult<ExtractedFields> {
        if table.len() < FIXED_ROW_LIMIT {
            return Err(RenameError::MissingField {
                field: "test_code",
                detail: format!(
                    "expected at least {FIXED_ROW_LIMIT} rows, found {}",
                    table.len()
                ),
            });
        }
        let date_from = Self::required_cell(table, 0, "date_from")?;
        let date_to = Self::required_cell(table, 1, "date_to")?;
        let test_code = Self::required_cell(table, FIXED_TEST_CODE_ROW, "test_code")?;

        let fields = ExtractedFields {
            test_label: Some(test_code),
            date_from_raw: Some(strip_label_prefix(&date_from).trim().to_string()),
            date_to_raw: Some(strip_label_prefix(&date_to).trim().to_string()),
        };
        debug!(?fields, "fixed-offset fields");
        Ok(fields)
    }

    fn file_name(
        &self,
        fields: &ExtractedFields,
        upload_name: Option<&str>,
    ) -> RenameResult<String> {
        let missing = |field: &'static str| RenameError::MissingField {
            field,
            detail: "not extracted".to_string(),
        };
        let code = fields.test_label.as_deref().ok_or_else(|| missing("test_code"))?;
        let from_raw = fields.date_from_raw.as_deref().ok_or_else(|| missing("date_from"))?;
        let to_raw = fields.date_to_raw.as_deref().ok_or_else(|| missing("date_to"))?;

        let from = self.dates.normalize_strict(from_raw);
        let to = self.dates.normalize_strict(to_raw);

        match (from, to) {
            (Some(from), Some(to)) => Ok(naming::fixed_file_name(
                code,
                &from,
                &to,
                &naming::original_extension(upload_name),
            )),
            (from, to) => {
                let mut values = Vec::new();
                if from.is_none() {
                    values.push(UnparsedDate {
                        field: "date_from",
                        raw: from_raw.to_string(),
                    });
                }
                if to.is_none() {
                    values.push(UnparsedDate {
                        field: "date_to",
                        raw: to_raw.to_string(),
                    });
                }
                Err(RenameError::DateParse {
                    values,
                    formats: self.dates.formats().join(", "),
                })
            }
        }
    }

    /// The upload, byte for byte.
    fn content(&self, _table: &RawTable, upload: &[u8]) -> RenameResult<Vec<u8>> {
        Ok(upload.to_vec())
    }
}
