//! Semicolon-delimited file codec.
//!
//! The legacy artifact files are headerless, `;`-separated, with a varying
//! field count per row (operations carry an optional VAT field, registry
//! rows an optional currency and VAT).

use crate::domain::error::FolioError;
use crate::ports::record_port::RecordPort;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Default)]
pub struct DelimitedFileAdapter;

impl DelimitedFileAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl RecordPort for DelimitedFileAdapter {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, FolioError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            // Missing artifact reads as empty.
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| FolioError::Codec {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;
            let row: Vec<String> = record.iter().map(str::to_string).collect();
            if row.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            rows.push(row);
        }
        Ok(rows)
    }

    fn write_rows(&self, path: &Path, rows: &[Vec<String>]) -> Result<(), FolioError> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_writer(Vec::new());

        for row in rows {
            wtr.write_record(row).map_err(|e| FolioError::Codec {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        let bytes = wtr.into_inner().map_err(|e| FolioError::Codec {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        fs::write(path, bytes)?;
        Ok(())
    }
}
