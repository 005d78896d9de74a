use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading or writing the tabular dataset. Input
/// errors are fatal to a run; they are never degraded.
#[derive(Debug, Error)]
pub enum TableError {
    /// The input file does not exist.
    #[error("input file {path} not found")]
    Missing {
        /// Path that was attempted.
        path: PathBuf,
    },
    /// The required name column is absent from the header row.
    #[error("column '{0}' not found in header")]
    MissingColumn(String),
    /// The output location refused the write.
    #[error("permission denied writing {path}; is the file open or write-protected?")]
    PermissionDenied {
        /// Path that was attempted.
        path: PathBuf,
    },
    /// Malformed CSV content or any other I/O failure from the reader.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// Raw I/O failure outside the CSV layer.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The source dataset: a header row, an optional units row, and data rows.
///
/// The units row is the first row under the header; it describes measurement
/// units rather than a food item and is excluded from name extraction but
/// carried through to the output.
#[derive(Debug, Clone)]
pub struct FoodTable {
    headers: csv::StringRecord,
    units: Option<csv::StringRecord>,
    rows: Vec<csv::StringRecord>,
    name_index: usize,
}

impl FoodTable {
    /// Loads a CSV file, locating the scientific-name column by a
    /// case- and surrounding-whitespace-insensitive header comparison.
    pub fn load(path: impl AsRef<Path>, name_column: &str) -> Result<Self, TableError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TableError::Missing {
                path: path.to_path_buf(),
            });
        }
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = reader.headers()?.clone();
        let wanted = name_column.trim();
        let name_index = headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TableError::MissingColumn(name_column.to_string()))?;
        let mut units = None;
        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            if idx == 0 {
                units = Some(record);
            } else {
                rows.push(record);
            }
        }
        debug!(rows = rows.len(), name_index, "loaded dataset");
        Ok(Self {
            headers,
            units,
            rows,
            name_index,
        })
    }

    /// Distinct non-empty scientific names, in first-appearance order.
    /// Cells that are empty or the literal "nan" are excluded; their rows
    /// remain in the table.
    #[must_use]
    pub fn distinct_names(&self) -> Vec<String> {
        let mut names: IndexSet<String> = IndexSet::new();
        for row in &self.rows {
            if let Some(name) = self.name_of(row) {
                names.insert(name.to_string());
            }
        }
        names.into_iter().collect()
    }

    /// The name cell of a row, if it holds a usable name.
    #[must_use]
    pub fn name_of<'a>(&self, row: &'a csv::StringRecord) -> Option<&'a str> {
        let cell = row.get(self.name_index)?.trim();
        if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
            return None;
        }
        Some(cell)
    }

    /// Header row.
    #[must_use]
    pub const fn headers(&self) -> &csv::StringRecord {
        &self.headers
    }

    /// The skipped units row, when the file had one.
    #[must_use]
    pub const fn units(&self) -> Option<&csv::StringRecord> {
        self.units.as_ref()
    }

    /// Data rows, in file order.
    #[must_use]
    pub fn rows(&self) -> &[csv::StringRecord] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
