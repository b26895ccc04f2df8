use super::{FormatEncoder, FormatError, OutputFormat};
use crate::workflows::declaration::Declaration;
use std::io::Write;

pub const SHEET_NAMES: [&str; 3] = ["Declaration", "Items", "Summary"];

pub const ITEM_HEADERS: [&str; 13] = [
    "Item #",
    "HS Code",
    "Description",
    "Origin",
    "Gross Weight",
    "Net Weight",
    "Unit",
    "Quantity",
    "Value",
    "Package Type",
    "Packages",
    "Marks",
    "Previous Doc",
];

/// Review workbook with Declaration, Items and Summary sheets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetEncoder;

impl FormatEncoder for SpreadsheetEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Spreadsheet
    }

    #[cfg(feature = "xlsx")]
    fn encode(&self, declaration: &Declaration, sink: &mut dyn Write) -> Result<(), FormatError> {
        let buffer = workbook::build(declaration)
            .map_err(|err| FormatError::Spreadsheet(err.to_string()))?;
        sink.write_all(&buffer)?;
        Ok(())
    }

    #[cfg(not(feature = "xlsx"))]
    fn encode(&self, _declaration: &Declaration, _sink: &mut dyn Write) -> Result<(), FormatError> {
        Err(FormatError::Unavailable("spreadsheet"))
    }
}

/// Label/value rows of the Declaration sheet; empty labels are spacer rows.
fn declaration_rows(declaration: &Declaration) -> Vec<(&'static str, String)> {
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();
    vec![
        ("Registration Number", declaration.registration_number.clone()),
        ("Declaration Type", declaration.declaration_type.code().to_string()),
        ("Customs Office", declaration.customs_office.clone()),
        ("Date", super::day_month_year(declaration.issue_date)),
        ("", String::new()),
        ("Exporter ID", declaration.exporter.id.clone()),
        ("Exporter Name", declaration.exporter.name.clone()),
        ("Exporter Address", declaration.exporter.address_line1.clone()),
        ("Exporter City", declaration.exporter.city.clone()),
        ("Exporter Country", declaration.exporter.country.clone()),
        ("", String::new()),
        ("Declarant ID", declaration.declarant.id.clone()),
        ("Declarant Name", declaration.declarant.name.clone()),
        ("", String::new()),
        ("General Procedure Code", declaration.general_procedure_code.clone()),
        ("Extended Procedure Code", declaration.extended_procedure_code.clone()),
        ("Country of Destination", declaration.destination_country.clone()),
        ("Mode of Transport", declaration.transport_mode.clone()),
        ("Office of Entry/Exit", declaration.entry_exit_office.clone()),
        ("Currency Code", declaration.currency_code.clone()),
        ("Exchange Rate", super::decimal(declaration.exchange_rate)),
        ("Total Packages", declaration.total_packages().to_string()),
        ("Commercial Reference", declaration.commercial_reference.clone()),
        ("Valuation Method", optional(&declaration.valuation_method)),
        ("Delivery Terms", optional(&declaration.delivery_terms)),
        ("Warehouse Identification", optional(&declaration.warehouse_identification)),
    ]
}

fn summary_rows(declaration: &Declaration) -> Vec<(&'static str, String)> {
    let totals = declaration.totals();
    vec![
        ("Total Items", totals.total_items.to_string()),
        ("Total Packages", totals.total_packages.to_string()),
        ("Total Gross Weight", format!("{:.2} kg", totals.total_gross_weight)),
        ("Total Net Weight", format!("{:.2} kg", totals.total_net_weight)),
        (
            "Total Value",
            format!("{:.2} {}", totals.total_value, declaration.currency_code),
        ),
    ]
}

#[cfg(feature = "xlsx")]
mod workbook {
    use super::{declaration_rows, summary_rows, ITEM_HEADERS, SHEET_NAMES};
    use crate::workflows::declaration::Declaration;
    use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};

    pub(super) fn build(declaration: &Declaration) -> Result<Vec<u8>, XlsxError> {
        let title = Format::new().set_bold().set_font_size(14);
        let bold = Format::new().set_bold();
        let header = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0xDDDDDD));

        let mut workbook = Workbook::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAMES[0])?;
        sheet.merge_range(0, 0, 0, 3, "ASYCUDA Export Declaration", &title)?;
        for (offset, (label, value)) in declaration_rows(declaration).into_iter().enumerate() {
            let row = offset as u32 + 2;
            if !label.is_empty() {
                sheet.write_string_with_format(row, 0, label, &bold)?;
            }
            if !value.is_empty() {
                sheet.write_string(row, 1, value)?;
            }
        }
        sheet.autofit();

        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAMES[1])?;
        if !declaration.items().is_empty() {
            sheet.merge_range(0, 0, 0, 5, "Declaration Items", &title)?;
            for (col, label) in ITEM_HEADERS.iter().enumerate() {
                sheet.write_string_with_format(2, col as u16, *label, &header)?;
            }
            for (offset, item) in declaration.items().iter().enumerate() {
                let row = offset as u32 + 3;
                sheet.write_number(row, 0, item.item_number)?;
                sheet.write_string(row, 1, &item.hs_code)?;
                sheet.write_string(row, 2, &item.description)?;
                sheet.write_string(row, 3, &item.origin_country)?;
                sheet.write_number(row, 4, item.gross_weight)?;
                sheet.write_number(row, 5, item.net_weight)?;
                sheet.write_string(row, 6, &item.statistical_unit)?;
                sheet.write_number(row, 7, item.quantity)?;
                sheet.write_number(row, 8, item.customs_value)?;
                sheet.write_string(row, 9, &item.package_type)?;
                sheet.write_number(row, 10, item.package_count)?;
                sheet.write_string(row, 11, &item.marks_and_numbers)?;
                sheet.write_string(row, 12, item.previous_document.as_deref().unwrap_or(""))?;
            }
        }
        sheet.autofit();

        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAMES[2])?;
        sheet.merge_range(0, 0, 0, 2, "Declaration Summary", &title)?;
        for (offset, (label, value)) in summary_rows(declaration).into_iter().enumerate() {
            let row = offset as u32 + 2;
            sheet.write_string_with_format(row, 0, label, &bold)?;
            sheet.write_string(row, 1, value)?;
        }
        sheet.autofit();

        workbook.save_to_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::declaration::domain::fixtures::{declaration, item};

    #[test]
    fn summary_formats_totals_with_units() {
        let mut declaration = declaration();
        declaration.add_item(item(1, "65040000", "LADIES STRAW HAT"));
        declaration.add_item(item(2, "65040000", "MENS STRAW HAT"));
        let rows = summary_rows(&declaration);

        assert_eq!(rows[0], ("Total Items", "2".to_string()));
        assert_eq!(rows[2], ("Total Gross Weight", "0.60 kg".to_string()));
        assert_eq!(rows[4], ("Total Value", "20.00 XCD".to_string()));
    }

    #[test]
    fn declaration_sheet_lists_header_fields() {
        let rows = declaration_rows(&declaration());
        assert_eq!(rows[0], ("Registration Number", "A202510011200".to_string()));
        assert!(rows.contains(&("Delivery Terms", "CIF".to_string())));
        assert_eq!(rows.len(), 26);
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn workbook_has_three_named_sheets() {
        use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
        use std::io::Cursor;

        let mut declaration = declaration();
        declaration.add_item(item(1, "65040000", "LADIES STRAW HAT"));
        let bytes = SpreadsheetEncoder
            .encode_to_vec(&declaration)
            .expect("workbook renders");

        let mut workbook: Xlsx<_> =
            open_workbook_from_rs(Cursor::new(bytes)).expect("workbook opens");
        assert_eq!(workbook.sheet_names(), SHEET_NAMES.map(String::from).to_vec());

        let items = workbook.worksheet_range("Items").expect("items sheet");
        assert_eq!(
            items.get_value((2, 1)),
            Some(&Data::String("HS Code".to_string()))
        );
        assert_eq!(
            items.get_value((3, 2)),
            Some(&Data::String("LADIES STRAW HAT".to_string()))
        );
    }

    #[cfg(not(feature = "xlsx"))]
    #[test]
    fn reports_unavailable_without_feature() {
        let result = SpreadsheetEncoder.encode_to_vec(&declaration());
        assert!(matches!(result, Err(FormatError::Unavailable("spreadsheet"))));
    }
}
