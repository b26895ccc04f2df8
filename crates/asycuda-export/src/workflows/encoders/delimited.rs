use super::{day_month_year, decimal, FormatEncoder, FormatError, OutputFormat};
use crate::workflows::declaration::{Declaration, Item};
use std::io::Write;

/// Pipe-delimited records: one `H` header line followed by one `I` line per item.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedEncoder;

impl FormatEncoder for DelimitedEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Delimited
    }

    fn encode(&self, declaration: &Declaration, sink: &mut dyn Write) -> Result<(), FormatError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'|')
            .quote_style(csv::QuoteStyle::Necessary)
            .flexible(true)
            .has_headers(false)
            .from_writer(sink);

        writer.write_record(header_record(declaration))?;
        for item in declaration.items() {
            writer.write_record(item_record(item))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn header_record(declaration: &Declaration) -> Vec<String> {
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();
    vec![
        "H".to_string(),
        declaration.registration_number.clone(),
        declaration.declaration_type.code().to_string(),
        declaration.customs_office.clone(),
        day_month_year(declaration.issue_date),
        declaration.exporter.id.clone(),
        declaration.exporter.name.clone(),
        declaration.exporter.address_line1.clone(),
        declaration.exporter.city.clone(),
        declaration.exporter.country.clone(),
        declaration.declarant.id.clone(),
        declaration.declarant.name.clone(),
        declaration.general_procedure_code.clone(),
        declaration.extended_procedure_code.clone(),
        declaration.destination_country.clone(),
        declaration.transport_mode.clone(),
        declaration.entry_exit_office.clone(),
        declaration.currency_code.clone(),
        decimal(declaration.exchange_rate),
        declaration.total_packages().to_string(),
        declaration.commercial_reference.clone(),
        optional(&declaration.valuation_method),
        optional(&declaration.delivery_terms),
        optional(&declaration.place_of_loading),
        optional(&declaration.manifest_reference),
        optional(&declaration.warehouse_identification),
        optional(&declaration.declarant_signature),
    ]
}

fn item_record(item: &Item) -> Vec<String> {
    vec![
        "I".to_string(),
        item.item_number.to_string(),
        item.hs_code.clone(),
        item.description.clone(),
        item.origin_country.clone(),
        decimal(item.gross_weight),
        decimal(item.net_weight),
        item.statistical_unit.clone(),
        decimal(item.quantity),
        decimal(item.customs_value),
        item.package_type.clone(),
        item.package_count.to_string(),
        item.marks_and_numbers.clone(),
        item.previous_document.clone().unwrap_or_default(),
    ]
}
