use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a report run.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to open workbook '{path}': {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("workbook '{0}' contains no sheets")]
    NoSheets(PathBuf),
    #[error("failed to read sheet of '{path}': {reason}")]
    Sheet { path: PathBuf, reason: String },
    #[error("row {row}: missing or invalid {column}")]
    MissingField { row: usize, column: &'static str },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to write spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}
