use thiserror::Error;

/// Errors surfaced while turning an upload into a renamed file.
///
/// The scanning strategy never produces `MissingField` or `DateParse`; it
/// substitutes placeholders instead. Only `Load` is fatal for both modes.
#[derive(Error, Debug)]
pub enum RenameError {
    #[error("could not read upload as CSV: {0}")]
    Load(String),

    #[error("missing {field}: {detail}")]
    MissingField { field: &'static str, detail: String },

    #[error("no known date format ({formats}) matches {}", describe_dates(.values))]
    DateParse {
        values: Vec<UnparsedDate>,
        formats: String,
    },
}

/// A raw date cell that failed every configured format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparsedDate {
    pub field: &'static str,
    pub raw: String,
}

fn describe_dates(values: &[UnparsedDate]) -> String {
    values
        .iter()
        .map(|v| format!("{} {:?}", v.field, v.raw))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<csv::Error> for RenameError {
    fn from(err: csv::Error) -> Self {
        RenameError::Load(err.to_string())
    }
}

impl From<std::io::Error> for RenameError {
    fn from(err: std::io::Error) -> Self {
        RenameError::Load(err.to_string())
    }
}

/// Alias for fallible operations in this crate
pub type RenameResult<T> = Result<T, RenameError>;
