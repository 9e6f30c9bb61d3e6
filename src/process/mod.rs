// src/process/mod.rs
use csv::ReaderBuilder;
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::{debug, info, instrument};

pub mod date_parser;
pub mod extract;
pub mod naming;
pub mod raw_table;
pub mod test_set;
pub mod utils;

use crate::config::RenamerConfig;
use crate::errors::{RenameError, RenameResult};
use date_parser::DateNormalizer;
use extract::{ExtractionStrategy, FixedOffsetStrategy, ScanStrategy, StrategyKind};
use raw_table::RawTable;
use test_set::TestSetNormalizer;

/// A single uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied name, used for the fixed-offset extension.
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: Option<String>, bytes: Vec<u8>) -> Self {
        Self { file_name, bytes }
    }
}

/// What goes back to the client on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Read up to `limit` rows (all rows if `None`) from the start of `reader`.
///
/// - Rewinds first, so a partly consumed stream is read from the top.
/// - No header row; rows may have differing field counts; blank lines are skipped.
/// - Invalid UTF-8 becomes U+FFFD rather than failing the read.
pub fn load_table<R: Read + Seek>(reader: &mut R, limit: Option<usize>) -> RenameResult<RawTable> {
    reader.seek(SeekFrom::Start(0))?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (idx, result) in rdr.byte_records().enumerate() {
        if limit.is_some_and(|n| rows.len() >= n) {
            break;
        }
        let record = result.map_err(|e| RenameError::Load(format!("record {idx}: {e}")))?;
        let row: Vec<_> = record
            .iter()
            .map(|field| utils::infer_cell(&String::from_utf8_lossy(field)))
            .collect();
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(RenameError::Load("no rows to parse".to_string()));
    }
    Ok(RawTable::new(rows))
}

/// Renames uploads with one of two extraction strategies, both built once
/// from the injected configuration.
pub struct Renamer {
    default_kind: StrategyKind,
    scan: ScanStrategy,
    fixed: FixedOffsetStrategy,
}

impl Renamer {
    pub fn new(config: &RenamerConfig) -> Self {
        let tests = TestSetNormalizer::new(config.test_sets.clone(), config.test_markers.clone());
        Self {
            default_kind: config.strategy,
            scan: ScanStrategy::new(tests, DateNormalizer::new(config.date_formats.clone())),
            fixed: FixedOffsetStrategy::new(DateNormalizer::new(
                config.strict_date_formats.clone(),
            )),
        }
    }

    pub fn default_kind(&self) -> StrategyKind {
        self.default_kind
    }

    pub fn strategy(&self, kind: StrategyKind) -> &dyn ExtractionStrategy {
        match kind {
            StrategyKind::Scan => &self.scan,
            StrategyKind::FixedOffset => &self.fixed,
        }
    }

    pub fn rename(&self, upload: &Upload) -> RenameResult<RenamedFile> {
        self.rename_with(upload, self.default_kind)
    }

    /// Load → extract → name → content. Nothing is returned on a fatal path.
    #[instrument(level = "info", skip(self, upload), fields(upload = ?upload.file_name, bytes = upload.bytes.len()))]
    pub fn rename_with(&self, upload: &Upload, kind: StrategyKind) -> RenameResult<RenamedFile> {
        let strategy = self.strategy(kind);

        let mut cursor = Cursor::new(upload.bytes.as_slice());
        let table = load_table(&mut cursor, Some(strategy.row_limit()))?;
        debug!(rows = table.len(), width = table.width(), "loaded prefix");

        let fields = strategy.extract_fields(&table)?;
        let file_name = strategy.file_name(&fields, upload.file_name.as_deref())?;
        let content = strategy.content(&table, &upload.bytes)?;

        info!(strategy = %strategy.kind(), file_name = %file_name, "renamed upload");
        Ok(RenamedFile { file_name, content })
    }
}

impl Default for Renamer {
    fn default() -> Self {
        Self::new(&RenamerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::raw_table::Cell;
    use crate::process::test_set::TestSetRule;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,csv_renamer::process=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    const LAB_EXPORT: &str = "Laboratory Export,,,
Date From,05/01/2023,Date To,2023-01-31
Test,HIV Viral Load,,
,,,

Sample,Result,Units,Flag
S1,1200,copies/mL,H
S2,<20,copies/mL,
";

    fn fixed_export(rows: usize) -> String {
        let mut out = String::from("Date From|05/01/2023\nDate To|31/01/2023\n");
        for i in 2..rows {
            if i == 9 {
                out.push_str("HBV-DNA\n");
            } else {
                out.push_str(&format!("line {i},x\n"));
            }
        }
        out
    }

    #[test]
    fn load_table_respects_limit_and_rewinds() {
        let mut cursor = Cursor::new(LAB_EXPORT.as_bytes());
        cursor.set_position(20);
        let table = load_table(&mut cursor, Some(3)).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0, 0), &Cell::Text("Laboratory Export".into()));
        assert_eq!(table.get(1, 1), &Cell::Text("05/01/2023".into()));
    }

    #[test]
    fn load_table_handles_ragged_rows() {
        let mut cursor = Cursor::new("a\nb,c,d\n\ne,f\n".as_bytes());
        let table = load_table(&mut cursor, None).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.width(), 3);
        assert_eq!(table.get(0, 2), &Cell::Missing);
        assert_eq!(table.get(2, 1), &Cell::Text("f".into()));
    }

    #[test]
    fn load_table_replaces_invalid_utf8() {
        let bytes = b"Date From,05/01/2023\nHep A Ig\xffM,x\n".to_vec();
        let table = load_table(&mut Cursor::new(bytes), None).unwrap();
        let cell = table.get(1, 0).as_str().unwrap();
        assert!(cell.contains('\u{FFFD}'), "{cell:?}");
    }

    #[test]
    fn load_table_rejects_empty_input() {
        let err = load_table(&mut Cursor::new(Vec::<u8>::new()), None).unwrap_err();
        assert!(matches!(err, RenameError::Load(_)));
    }

    #[test]
    fn scan_pipeline_end_to_end() {
        init_test_logging();
        let upload = Upload::new(Some("export.csv".into()), LAB_EXPORT.as_bytes().to_vec());
        let renamed = Renamer::default().rename(&upload).unwrap();
        assert_eq!(
            renamed.file_name,
            "hiv_vl_Date_From|05JAN2023_Date_To|31JAN2023.csv"
        );
        let body = String::from_utf8(renamed.content).unwrap();
        assert!(body.starts_with("Laboratory Export,,,\nDate From,05/01/2023,Date To,2023-01-31\n"));
        assert!(body.ends_with("S2,<20,copies/mL,\n"), "{body}");
        // blank line dropped, the all-empty row kept
        assert_eq!(body.lines().count(), 7);
        assert!(body.contains("\n,,,\nSample,"), "{body}");
    }

    #[test]
    fn scan_pipeline_returns_only_loaded_prefix() {
        let mut text = String::from("Date From,05/01/2023\n");
        for i in 0..40 {
            text.push_str(&format!("{i},v{i}\n"));
        }
        let upload = Upload::new(None, text.into_bytes());
        let renamed = Renamer::default()
            .rename_with(&upload, StrategyKind::Scan)
            .unwrap();
        let body = String::from_utf8(renamed.content).unwrap();
        assert_eq!(body.lines().count(), 15);
        assert!(body.ends_with("13,v13\n"), "{body}");
        assert_eq!(
            renamed.file_name,
            "unknown_test_Date_From|05JAN2023_Date_To|unknown_end.csv"
        );
    }

    #[test]
    fn fixed_pipeline_keeps_original_bytes_and_extension() {
        init_test_logging();
        let text = fixed_export(12);
        let upload = Upload::new(Some("data.CSV".into()), text.clone().into_bytes());
        let renamed = Renamer::default()
            .rename_with(&upload, StrategyKind::FixedOffset)
            .unwrap();
        assert_eq!(renamed.file_name, "HBV-DNA_05JAN2023_31JAN2023.CSV");
        assert_eq!(renamed.content, text.into_bytes());
    }

    #[test]
    fn fixed_pipeline_short_file_is_fatal() {
        let upload = Upload::new(Some("data.csv".into()), fixed_export(9).into_bytes());
        let err = Renamer::default()
            .rename_with(&upload, StrategyKind::FixedOffset)
            .unwrap_err();
        assert!(matches!(err, RenameError::MissingField { .. }), "{err:?}");
    }

    #[test]
    fn configured_default_strategy_is_used() {
        let config = RenamerConfig {
            strategy: StrategyKind::FixedOffset,
            ..RenamerConfig::default()
        };
        let renamer = Renamer::new(&config);
        assert_eq!(renamer.default_kind(), StrategyKind::FixedOffset);
        assert_eq!(
            renamer.strategy(StrategyKind::Scan).kind(),
            StrategyKind::Scan
        );
        let upload = Upload::new(Some("r.csv".into()), fixed_export(10).into_bytes());
        assert_eq!(
            renamer.rename(&upload).unwrap().file_name,
            "HBV-DNA_05JAN2023_31JAN2023.csv"
        );
    }

    #[test]
    fn configured_lookup_table_is_used() {
        let config = RenamerConfig {
            test_sets: vec![TestSetRule::new("hiv viral", "hiv_load")],
            ..RenamerConfig::default()
        };
        let upload = Upload::new(None, LAB_EXPORT.as_bytes().to_vec());
        let renamed = Renamer::new(&config).rename(&upload).unwrap();
        assert!(renamed.file_name.starts_with("hiv_load_Date_From|"), "{}", renamed.file_name);
    }
}
