mod normalizer;
mod parser;

use std::io::Read;
use std::path::Path;

pub use parser::{SkippedRow, Table, TableRow};

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Spreadsheet(String),
    UnsupportedFileType(String),
    MissingColumns {
        table: &'static str,
        columns: Vec<String>,
    },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read input file: {}", err),
            ImportError::Csv(err) => write!(f, "invalid CSV data: {}", err),
            ImportError::Spreadsheet(err) => write!(f, "invalid spreadsheet data: {}", err),
            ImportError::UnsupportedFileType(ext) => write!(
                f,
                "unsupported file type '{}': expected .csv, .xlsx or .xls",
                ext
            ),
            ImportError::MissingColumns { table, columns } => write!(
                f,
                "{} is missing required columns: {}",
                table,
                columns.join(", ")
            ),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::Spreadsheet(_)
            | ImportError::UnsupportedFileType(_)
            | ImportError::MissingColumns { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads a CSV or Excel file, choosing the parser by extension.
pub fn read_path<P: AsRef<Path>>(path: P) -> Result<Table, ImportError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "csv" | "txt" => {
            let file = std::fs::File::open(path)?;
            parser::parse_csv(file)
        }
        "xlsx" | "xlsm" | "xls" => {
            if !path.exists() {
                return Err(ImportError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                )));
            }
            parser::parse_workbook(path)
        }
        other => Err(ImportError::UnsupportedFileType(other.to_string())),
    }
}

pub fn read_csv<R: Read>(reader: R) -> Result<Table, ImportError> {
    parser::parse_csv(reader)
}
