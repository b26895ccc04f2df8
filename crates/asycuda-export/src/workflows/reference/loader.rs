use super::{CodeDetail, ReferenceDataStore};
use crate::workflows::tabular::{self, ImportError, Table, TableRow};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

const CODE_COLUMN: &str = "HS Code";
const DESCRIPTION_COLUMN: &str = "Description";
const ORIGIN_COLUMN: &str = "Origin";
const OFFICE_COLUMN: &str = "Office";
const PRODUCT_COLUMN: &str = "Product";
const SERIAL_COLUMN: &str = "C Nbr";
const LINE_COLUMN: &str = "Line";
const YEAR_COLUMN: &str = "Year";

/// Layout detected in a loaded reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceFormat {
    /// Prior-declaration export with code, description, origin and document columns.
    Declaration,
    /// Any table with recognisable code and description columns.
    Generic,
}

impl ReferenceDataStore {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ImportError> {
        let table = tabular::read_path(path)?;
        Self::from_table(&table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ImportError> {
        let table = tabular::read_csv(reader)?;
        Self::from_table(&table)
    }

    pub fn from_table(table: &Table) -> Result<Self, ImportError> {
        let store = if table
            .missing_columns(&[CODE_COLUMN, DESCRIPTION_COLUMN, ORIGIN_COLUMN])
            .is_empty()
        {
            load_declaration_format(table)
        } else {
            load_generic_format(table)?
        };

        info!(
            descriptions = store.len(),
            products = store.products.len(),
            references = store.description_references.len(),
            "reference data loaded"
        );
        Ok(store)
    }

    /// Writes one declaration-layout row per known description.
    ///
    /// The output loads back into an equivalent store. Descriptions whose
    /// code detail belongs to another description are written with code and
    /// description only. Returns the number of rows written.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<usize, ImportError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(EXPORT_COLUMNS)?;

        let bare = CodeDetail::default();
        let mut written = 0;
        for (description, code) in self.descriptions() {
            let detail = self
                .detail(code)
                .filter(|detail| detail.description == description)
                .unwrap_or(&bare);
            writer.write_record([
                code,
                description,
                detail.origin.as_deref().unwrap_or_default(),
                detail.office.as_deref().unwrap_or_default(),
                detail.product_code.as_deref().unwrap_or_default(),
                detail.serial.as_deref().unwrap_or_default(),
                detail.line.as_deref().unwrap_or_default(),
                detail.year.as_deref().unwrap_or_default(),
            ])?;
            written += 1;
        }
        writer.flush()?;

        info!(rows = written, "reference data exported");
        Ok(written)
    }

    pub fn export_path<P: AsRef<Path>>(&self, path: P) -> Result<usize, ImportError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }
}

const EXPORT_COLUMNS: [&str; 8] = [
    CODE_COLUMN,
    DESCRIPTION_COLUMN,
    ORIGIN_COLUMN,
    OFFICE_COLUMN,
    PRODUCT_COLUMN,
    SERIAL_COLUMN,
    LINE_COLUMN,
    YEAR_COLUMN,
];

fn load_declaration_format(table: &Table) -> ReferenceDataStore {
    let mut store = ReferenceDataStore {
        format: Some(ReferenceFormat::Declaration),
        ..ReferenceDataStore::default()
    };

    for row in table.rows() {
        let (Some(description), Some(code)) = (
            row.get(DESCRIPTION_COLUMN),
            row.get(CODE_COLUMN).map(normalize_code),
        ) else {
            debug!(row = row.row_number, "reference row skipped: missing description or code");
            continue;
        };
        if code.is_empty() {
            continue;
        }

        let description = super::description_key(description);
        let product_code = text(row, PRODUCT_COLUMN);
        let detail = CodeDetail {
            code: code.clone(),
            description: description.clone(),
            origin: text(row, ORIGIN_COLUMN).map(|origin| origin.to_ascii_uppercase()),
            office: text(row, OFFICE_COLUMN).map(|office| office.to_ascii_uppercase()),
            product_code: product_code.clone(),
            serial: text(row, SERIAL_COLUMN),
            line: text(row, LINE_COLUMN),
            year: text(row, YEAR_COLUMN),
        };

        store.insert_description(&description, &code);
        if let Some(product_code) = product_code.as_deref() {
            store.insert_product(product_code, &code);
        }
        if let Some(reference) = detail.document_reference() {
            store.insert_document_reference(
                product_code.as_deref(),
                Some(&description),
                &reference,
            );
        }
        store.insert_detail(detail);
    }

    store
}

fn load_generic_format(table: &Table) -> Result<ReferenceDataStore, ImportError> {
    let code_column = table.find_header(|header| header.contains("hs") || header.contains("code"));
    let description_column =
        table.find_header(|header| header.contains("desc") || header.contains("product"));

    let (Some(code_column), Some(description_column)) = (code_column, description_column) else {
        let mut columns = Vec::new();
        if code_column.is_none() {
            columns.push(CODE_COLUMN.to_string());
        }
        if description_column.is_none() {
            columns.push(DESCRIPTION_COLUMN.to_string());
        }
        return Err(ImportError::MissingColumns {
            table: "reference table",
            columns,
        });
    };

    let mut store = ReferenceDataStore {
        format: Some(ReferenceFormat::Generic),
        ..ReferenceDataStore::default()
    };
    for row in table.rows() {
        let (Some(description), Some(code)) = (
            row.get(description_column),
            row.get(code_column).map(normalize_code),
        ) else {
            continue;
        };
        if code.is_empty() {
            continue;
        }
        let description = super::description_key(description);
        store.insert_description(&description, &code);
        store.insert_detail(CodeDetail {
            code,
            description,
            ..CodeDetail::default()
        });
    }

    Ok(store)
}

/// Canonical classification code: digits only, spreadsheet float suffix
/// dropped, and a padding `000000` tail removed from over-long codes.
pub fn normalize_code(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() > 10 {
        if let Some(stripped) = digits.strip_suffix("000000") {
            return stripped.to_string();
        }
    }
    digits
}

fn text(row: &TableRow, column: &str) -> Option<String> {
    row.get(column).map(|value| {
        value
            .strip_suffix(".0")
            .unwrap_or(value)
            .trim()
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const REFERENCE_CSV: &str = "HS Code,Description,Origin,Office,Product,C Nbr,Line,Year\n\
65040000000000,Ladies Straw Hat,CN,LCCAP,HAT-001,4521,3,2024\n\
62053000.0,Linen Shirt,IN,LCVGC,SHIRT-9,881,,2024.0\n\
,Missing Code,US,LCCAP,,,,\n\
71179000,Shell Necklace,,,,,,\n";

    #[test]
    fn declaration_format_builds_all_lookups() {
        let store =
            ReferenceDataStore::from_reader(Cursor::new(REFERENCE_CSV)).expect("reference loads");

        assert_eq!(store.format(), Some(ReferenceFormat::Declaration));
        assert_eq!(store.len(), 3);
        assert_eq!(store.code_for_description("ladies straw hat"), Some("65040000"));
        assert_eq!(store.code_for_product("hat-001"), Some("65040000"));

        let detail = store.detail("62053000").expect("shirt detail");
        assert_eq!(detail.origin.as_deref(), Some("IN"));
        assert_eq!(detail.year.as_deref(), Some("2024"));
        assert!(store.detail("71179000").expect("necklace").origin.is_none());

        assert_eq!(
            store.product_references().get("HAT-001").map(String::as_str),
            Some("LCCAP 2024 C 4521 art. 3")
        );
        assert_eq!(
            store.description_references()[1],
            ("LINEN SHIRT".to_string(), "LCVGC 2024 C 881".to_string())
        );
    }

    #[test]
    fn generic_format_detects_columns() {
        let csv = "Product Description,Tariff Code\nBeach Towel,63026000\n";
        let store = ReferenceDataStore::from_reader(Cursor::new(csv)).expect("generic loads");

        assert_eq!(store.format(), Some(ReferenceFormat::Generic));
        assert_eq!(store.code_for_description("BEACH TOWEL"), Some("63026000"));
    }

    #[test]
    fn unrecognised_layout_is_an_input_error() {
        let error = ReferenceDataStore::from_reader(Cursor::new("Name,Price\nHat,3\n"))
            .expect_err("no usable columns");
        match error {
            ImportError::MissingColumns { columns, .. } => {
                assert_eq!(columns, vec!["HS Code".to_string(), "Description".to_string()]);
            }
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn exported_reference_loads_back_unchanged() {
        let store =
            ReferenceDataStore::from_reader(Cursor::new(REFERENCE_CSV)).expect("reference loads");
        let mut exported = Vec::new();
        assert_eq!(store.write_csv(&mut exported).expect("export writes"), 3);

        let text = String::from_utf8(exported.clone()).expect("utf-8 csv");
        assert_eq!(
            text.lines().next(),
            Some("HS Code,Description,Origin,Office,Product,C Nbr,Line,Year")
        );
        assert_eq!(
            text.lines().nth(2),
            Some("62053000,LINEN SHIRT,IN,LCVGC,SHIRT-9,881,,2024")
        );

        let reloaded =
            ReferenceDataStore::from_reader(Cursor::new(exported)).expect("export reloads");
        assert_eq!(reloaded.format(), Some(ReferenceFormat::Declaration));
        assert_eq!(
            reloaded.descriptions().collect::<Vec<_>>(),
            store.descriptions().collect::<Vec<_>>()
        );
        for code in ["65040000", "62053000", "71179000"] {
            assert_eq!(reloaded.detail(code), store.detail(code), "detail for {code}");
        }
        assert_eq!(reloaded.code_for_product("SHIRT-9"), Some("62053000"));
        assert_eq!(reloaded.product_references(), store.product_references());
        assert_eq!(reloaded.description_references(), store.description_references());
    }

    #[test]
    fn generic_tables_export_codes_and_descriptions() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("reference.csv");
        let store = ReferenceDataStore::from_reader(Cursor::new(
            "Product Description,Tariff Code\nBeach Towel,63026000\n",
        ))
        .expect("generic loads");

        assert_eq!(store.export_path(&path).expect("export writes"), 1);
        let reloaded = ReferenceDataStore::from_path(&path).expect("export reloads");
        assert_eq!(reloaded.code_for_description("BEACH TOWEL"), Some("63026000"));
        assert!(reloaded.detail("63026000").is_some_and(|detail| detail.origin.is_none()));
    }

    #[test]
    fn normalize_code_strips_padding_and_float_suffix() {
        assert_eq!(normalize_code("65040000000000"), "65040000");
        assert_eq!(normalize_code("62053000.0"), "62053000");
        assert_eq!(normalize_code("6204.49.00"), "62044900");
        assert_eq!(normalize_code("71179000"), "71179000");
    }
}
