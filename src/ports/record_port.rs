//! Delimited-record codec port.

use crate::domain::error::FolioError;
use std::path::Path;

/// Line-by-line persistence codec for the semicolon-delimited artifact
/// files (operations, fee rules, registry, default selection).
pub trait RecordPort {
    /// Read all rows of a file as raw string fields. A missing file reads
    /// as an empty set of rows.
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, FolioError>;

    /// Write rows, replacing the file.
    fn write_rows(&self, path: &Path, rows: &[Vec<String>]) -> Result<(), FolioError>;
}
