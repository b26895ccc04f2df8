//! Renderers that turn an assembled [`Declaration`] into submission files.

mod delimited;
mod markup;
mod print;
mod spreadsheet;

pub use delimited::DelimitedEncoder;
pub use markup::MarkupEncoder;
pub use print::PrintFormEncoder;
pub use spreadsheet::{SpreadsheetEncoder, ITEM_HEADERS, SHEET_NAMES};

use crate::workflows::declaration::Declaration;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write delimited records: {0}")]
    Delimited(#[from] csv::Error),
    #[error("failed to render markup: {0}")]
    Markup(String),
    #[error("failed to render spreadsheet: {0}")]
    Spreadsheet(String),
    #[error("{0} output is not available in this build")]
    Unavailable(&'static str),
    #[error("unknown output format '{0}'")]
    UnknownFormat(String),
}

/// Output files a declaration can be rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputFormat {
    #[serde(rename = "xml")]
    Markup,
    #[serde(rename = "txt")]
    Delimited,
    #[serde(rename = "xlsx")]
    Spreadsheet,
    #[serde(rename = "html")]
    PrintForm,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Markup,
        OutputFormat::Delimited,
        OutputFormat::Spreadsheet,
        OutputFormat::PrintForm,
    ];

    pub const fn extension(self) -> &'static str {
        match self {
            OutputFormat::Markup => "xml",
            OutputFormat::Delimited => "txt",
            OutputFormat::Spreadsheet => "xlsx",
            OutputFormat::PrintForm => "html",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            OutputFormat::Markup => "XML",
            OutputFormat::Delimited => "pipe-delimited text",
            OutputFormat::Spreadsheet => "Excel workbook",
            OutputFormat::PrintForm => "print form",
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Markup => "application/xml",
            OutputFormat::Delimited => "text/plain; charset=utf-8",
            OutputFormat::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            OutputFormat::PrintForm => "text/html; charset=utf-8",
        }
    }

    /// Whether the rendered bytes are UTF-8 text.
    pub const fn is_text(self) -> bool {
        !matches!(self, OutputFormat::Spreadsheet)
    }

    pub fn file_name(self, registration_number: &str) -> String {
        format!("declaration_{}.{}", registration_number, self.extension())
    }

    pub fn encoder(self) -> Box<dyn FormatEncoder> {
        match self {
            OutputFormat::Markup => Box::new(MarkupEncoder),
            OutputFormat::Delimited => Box::new(DelimitedEncoder),
            OutputFormat::Spreadsheet => Box::new(SpreadsheetEncoder),
            OutputFormat::PrintForm => Box::new(PrintFormEncoder),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(OutputFormat::Markup),
            "txt" | "text" => Ok(OutputFormat::Delimited),
            "xlsx" | "excel" => Ok(OutputFormat::Spreadsheet),
            "html" | "print" | "pdf" => Ok(OutputFormat::PrintForm),
            other => Err(FormatError::UnknownFormat(other.to_string())),
        }
    }
}

/// Writes one representation of a declaration into a sink.
pub trait FormatEncoder {
    fn format(&self) -> OutputFormat;

    fn encode(&self, declaration: &Declaration, sink: &mut dyn Write) -> Result<(), FormatError>;

    fn encode_to_vec(&self, declaration: &Declaration) -> Result<Vec<u8>, FormatError> {
        let mut buffer = Vec::new();
        self.encode(declaration, &mut buffer)?;
        Ok(buffer)
    }
}

/// Renders `declaration` as `format` into memory.
pub fn render(format: OutputFormat, declaration: &Declaration) -> Result<Vec<u8>, FormatError> {
    format.encoder().encode_to_vec(declaration)
}

/// Decimal text for weights, quantities and values: integral values keep one
/// fractional digit (`1.0`), everything else uses the shortest exact form.
pub(crate) fn decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

pub(crate) fn day_month_year(date: chrono::NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_keeps_one_fraction_digit_for_whole_numbers() {
        assert_eq!(decimal(1.0), "1.0");
        assert_eq!(decimal(25.0), "25.0");
        assert_eq!(decimal(0.15), "0.15");
        assert_eq!(decimal(0.6000000000000001), "0.6000000000000001");
    }

    #[test]
    fn formats_parse_from_extensions_and_aliases() {
        for format in OutputFormat::ALL {
            assert_eq!(format.extension().parse::<OutputFormat>().ok(), Some(format));
        }
        assert_eq!("Excel".parse::<OutputFormat>().ok(), Some(OutputFormat::Spreadsheet));
        assert!(matches!(
            "docx".parse::<OutputFormat>(),
            Err(FormatError::UnknownFormat(value)) if value == "docx"
        ));
    }

    #[test]
    fn file_names_use_registration_number() {
        assert_eq!(
            OutputFormat::Delimited.file_name("A202510011200"),
            "declaration_A202510011200.txt"
        );
        assert_eq!(OutputFormat::Markup.encoder().format(), OutputFormat::Markup);
    }
}
