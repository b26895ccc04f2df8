use super::normalizer::{clean_cell, normalize_header};
use super::ImportError;
use calamine::{open_workbook_auto, Reader};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// One data row, keyed by normalized header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// 1-based position in the source, counting the header row.
    pub row_number: usize,
    cells: HashMap<String, String>,
}

impl TableRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            cells: HashMap::new(),
        }
    }

    pub fn with_cell(mut self, column: &str, value: &str) -> Self {
        self.cells
            .insert(normalize_header(column), clean_cell(value));
        self
    }

    /// Non-blank cell value for `column`, matched case-insensitively.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(&normalize_header(column))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn is_blank(&self) -> bool {
        self.cells.values().all(|value| value.is_empty())
    }
}

/// A source record that could not be read at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub row_number: usize,
    pub reason: String,
}

/// A header row plus data rows read from CSV or a spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<TableRow>,
    skipped: Vec<SkippedRow>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<TableRow>) -> Self {
        Self {
            headers,
            rows,
            skipped: Vec::new(),
        }
    }

    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<TableRow> {
        self.rows
    }

    pub fn has_column(&self, column: &str) -> bool {
        let wanted = normalize_header(column);
        self.headers
            .iter()
            .any(|header| normalize_header(header) == wanted)
    }

    /// First header whose normalized form satisfies `predicate`.
    pub fn find_header<F>(&self, predicate: F) -> Option<&str>
    where
        F: Fn(&str) -> bool,
    {
        self.headers
            .iter()
            .find(|header| predicate(&normalize_header(header)))
            .map(String::as_str)
    }

    /// Names from `required` that are absent from the header row.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|column| !self.has_column(column))
            .map(|column| column.to_string())
            .collect()
    }

    fn push_row(&mut self, row: TableRow) {
        if !row.is_blank() {
            self.rows.push(row);
        }
    }
}

/// Reads CSV leniently: cells that are not valid UTF-8 are decoded lossily
/// and records the reader cannot split are skipped with a warning.
pub(crate) fn parse_csv<R: Read>(reader: R) -> Result<Table, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .byte_headers()?
        .iter()
        .map(|cell| clean_cell(&String::from_utf8_lossy(cell)))
        .collect();
    let mut table = Table::new(headers.clone(), Vec::new());

    for (index, record) in csv_reader.byte_records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                let row_number = err
                    .position()
                    .map_or(index + 2, |position| position.line() as usize);
                warn!(row = row_number, error = %err, "unreadable csv record skipped");
                table.skipped.push(SkippedRow {
                    row_number,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let row_number = record
            .position()
            .map_or(index + 2, |position| position.line() as usize);
        let mut row = TableRow::new(row_number);
        for (header, value) in headers.iter().zip(record.iter()) {
            row = row.with_cell(header, &String::from_utf8_lossy(value));
        }
        table.push_row(row);
    }

    Ok(table)
}

pub(crate) fn parse_workbook(path: &Path) -> Result<Table, ImportError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| ImportError::Spreadsheet(err.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::Spreadsheet("workbook has no worksheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| ImportError::Spreadsheet(err.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| clean_cell(&cell.to_string()))
            .collect(),
        None => return Ok(Table::default()),
    };

    let header_row = range.start().map_or(1, |(row, _)| row as usize + 1);
    let mut table = Table::new(headers.clone(), Vec::new());
    for (index, data_row) in rows.enumerate() {
        let mut row = TableRow::new(header_row + index + 1);
        for (header, cell) in headers.iter().zip(data_row.iter()) {
            row = row.with_cell(header, &cell.to_string());
        }
        table.push_row(row);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_csv_keys_cells_by_normalized_header() {
        let table = parse_csv(Cursor::new(
            "\u{feff}ITEM SOLD ,DF US$,number\n Straw Hat ,25.00,1\n,,\nShell Ring,12,2\n",
        ))
        .expect("csv parses");

        assert_eq!(table.headers()[0], "ITEM SOLD");
        assert_eq!(table.rows().len(), 2, "blank row skipped");
        let first = &table.rows()[0];
        assert_eq!(first.row_number, 2);
        assert_eq!(first.get("item sold"), Some("Straw Hat"));
        assert_eq!(first.get("DF US$"), Some("25.00"));
        assert_eq!(table.rows()[1].row_number, 4);
    }

    #[test]
    fn short_records_leave_missing_cells_absent() {
        let table = parse_csv(Cursor::new("A,B,C\n1,2\n")).expect("flexible csv parses");
        let row = &table.rows()[0];
        assert_eq!(row.get("B"), Some("2"));
        assert_eq!(row.get("C"), None);
    }

    #[test]
    fn missing_columns_reports_absent_headers() {
        let table = parse_csv(Cursor::new("Description,HS Code\n")).expect("csv parses");
        assert_eq!(
            table.missing_columns(&["HS Code", "Origin", "description"]),
            vec!["Origin".to_string()]
        );
        assert_eq!(
            table.find_header(|header| header.contains("code")),
            Some("HS Code")
        );
    }

    #[test]
    fn invalid_utf8_cells_do_not_abort_the_import() {
        let bytes: &[u8] = b"ITEM SOLD,DF US$\nSTRAW HAT,10\nCAF\xC9 MUG,5\nBEACH TOWEL,20\n";
        let table = parse_csv(bytes).expect("csv parses");

        assert_eq!(table.rows().len(), 3);
        assert_eq!(table.rows()[0].get("ITEM SOLD"), Some("STRAW HAT"));
        assert_eq!(table.rows()[1].get("ITEM SOLD"), Some("CAF\u{fffd} MUG"));
        assert_eq!(table.rows()[2].get("DF US$"), Some("20"));
        assert!(table.skipped().is_empty());
    }

    #[test]
    fn row_numbers_follow_source_lines_across_quoted_newlines() {
        let table = parse_csv(Cursor::new(
            "Description,Value\n\"STRAW HAT\nLARGE\",10\nBEACH TOWEL,20\n",
        ))
        .expect("csv parses");

        assert_eq!(table.rows()[0].row_number, 2);
        assert_eq!(table.rows()[0].get("description"), Some("STRAW HAT\nLARGE"));
        assert_eq!(table.rows()[1].row_number, 4);
    }
}
