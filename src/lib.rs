//! Renames lab-export CSV uploads from their content.
//!
//! A test identifier and a date range are pulled from the first rows of the
//! sheet, normalized, and assembled into a deterministic file name:
//!
//! ```text
//! load_table -> ExtractionStrategy::extract_fields -> DateNormalizer / TestSetNormalizer -> naming
//! ```
//!
//! Two strategies are available, see [`process::extract`].

pub mod config;
pub mod errors;
pub mod process;

pub use config::RenamerConfig;
pub use errors::{RenameError, RenameResult};
pub use process::{
    extract::{ExtractedFields, ExtractionStrategy, StrategyKind},
    RenamedFile, Renamer, Upload,
};
