use crate::workflows::tabular::{self, ImportError, Table, TableRow};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Header names for the sales columns the resolver reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesColumns {
    pub description: String,
    pub value: String,
    pub quantity: String,
    pub product_code: String,
}

impl Default for SalesColumns {
    fn default() -> Self {
        Self {
            description: "ITEM SOLD".to_string(),
            value: "DF US$".to_string(),
            quantity: "number".to_string(),
            product_code: "BAR CODE".to_string(),
        }
    }
}

/// A sales line as read; numeric cells stay raw until resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRow {
    pub row_number: usize,
    pub description: Option<String>,
    pub value: Option<String>,
    pub quantity: Option<String>,
    pub product_code: Option<String>,
}

impl SalesRow {
    pub fn new(row_number: usize, description: &str, value: &str) -> Self {
        Self {
            row_number,
            description: Some(description.to_string()),
            value: Some(value.to_string()),
            quantity: None,
            product_code: None,
        }
    }

    pub fn with_quantity(mut self, quantity: &str) -> Self {
        self.quantity = Some(quantity.to_string());
        self
    }

    pub fn with_product_code(mut self, product_code: &str) -> Self {
        self.product_code = Some(product_code.to_string());
        self
    }

    fn from_row(row: &TableRow, columns: &SalesColumns) -> Self {
        let cell = |column: &str| row.get(column).map(str::to_string);
        Self {
            row_number: row.row_number,
            description: cell(&columns.description),
            value: cell(&columns.value),
            quantity: cell(&columns.quantity),
            product_code: cell(&columns.product_code),
        }
    }
}

pub struct SalesImporter;

impl SalesImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        columns: &SalesColumns,
    ) -> Result<Vec<SalesRow>, ImportError> {
        let table = tabular::read_path(path)?;
        Self::from_table(&table, columns)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        columns: &SalesColumns,
    ) -> Result<Vec<SalesRow>, ImportError> {
        let table = tabular::read_csv(reader)?;
        Self::from_table(&table, columns)
    }

    /// Quantity and product-code columns are optional; description and value are not.
    pub fn from_table(table: &Table, columns: &SalesColumns) -> Result<Vec<SalesRow>, ImportError> {
        let missing =
            table.missing_columns(&[columns.description.as_str(), columns.value.as_str()]);
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns {
                table: "sales data",
                columns: missing,
            });
        }

        let rows: Vec<SalesRow> = table
            .rows()
            .iter()
            .map(|row| SalesRow::from_row(row, columns))
            .collect();
        info!(
            rows = rows.len(),
            unreadable = table.skipped().len(),
            "sales data imported"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn rows_keep_raw_cells_and_source_positions() {
        let csv = "\u{feff}ITEM SOLD ,DF US$,number,BAR CODE\n\
LADIES STRAW HAT,$25.00,1,HAT-001\n\
,,,\n\
SHELL NECKLACE,\"1,200.50\",,\n";
        let rows = SalesImporter::from_reader(Cursor::new(csv), &SalesColumns::default())
            .expect("sales import");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].description.as_deref(), Some("LADIES STRAW HAT"));
        assert_eq!(rows[0].value.as_deref(), Some("$25.00"));
        assert_eq!(rows[0].product_code.as_deref(), Some("HAT-001"));
        assert_eq!(rows[1].row_number, 4);
        assert_eq!(rows[1].value.as_deref(), Some("1,200.50"));
        assert!(rows[1].quantity.is_none());
    }

    #[test]
    fn custom_column_names_are_honoured() {
        let columns = SalesColumns {
            description: "Product".to_string(),
            value: "Price".to_string(),
            quantity: "Qty".to_string(),
            product_code: "SKU".to_string(),
        };
        let csv = "product,price,qty\nTOTE BAG,40,2\n";
        let rows = SalesImporter::from_reader(Cursor::new(csv), &columns).expect("sales import");
        assert_eq!(rows[0].quantity.as_deref(), Some("2"));
        assert!(rows[0].product_code.is_none());
    }

    #[test]
    fn missing_required_columns_are_reported() {
        let error = SalesImporter::from_reader(
            Cursor::new("ITEM SOLD,number\nHAT,1\n"),
            &SalesColumns::default(),
        )
        .expect_err("value column missing");
        match error {
            ImportError::MissingColumns { table, columns } => {
                assert_eq!(table, "sales data");
                assert_eq!(columns, vec!["DF US$".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
