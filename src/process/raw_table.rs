use crate::errors::{RenameError, RenameResult};

/// One decoded CSV field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// Empty field, or a position past the end of a short row.
    Missing,
    Text(String),
    /// A field that parses as a number; the original text is kept verbatim.
    Numeric(String),
}

static MISSING: Cell = Cell::Missing;

impl Cell {
    /// Text content, for label matching. Numeric cells never carry labels.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Content of any non-missing cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) | Cell::Numeric(s) => Some(s),
            Cell::Missing => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct RawTable {
    /// Rows in file order, with no header row split off.
    /// Rows may be ragged; use [`RawTable::get`] to index safely.
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column count of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at `(row, col)`; anything out of range is [`Cell::Missing`].
    pub fn get(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&MISSING)
    }

    /// Write the table back out as comma-delimited UTF-8, every row padded
    /// to [`RawTable::width`] and terminated by `\n`.
    pub fn to_csv_bytes(&self) -> RenameResult<Vec<u8>> {
        let width = self.width();
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        for row in &self.rows {
            let record: Vec<&str> = (0..width)
                .map(|col| row.get(col).and_then(Cell::as_str).unwrap_or(""))
                .collect();
            wtr.write_record(&record)?;
        }

        wtr.into_inner()
            .map_err(|e| RenameError::from(e.into_error()))
    }
}
