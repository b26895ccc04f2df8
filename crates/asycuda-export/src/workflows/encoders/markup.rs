use super::{day_month_year, decimal, FormatEncoder, FormatError, OutputFormat};
use crate::workflows::declaration::{Declaration, Entity, Item};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// `AsycudaDeclaration` XML, indented by two spaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupEncoder;

impl FormatEncoder for MarkupEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Markup
    }

    fn encode(&self, declaration: &Declaration, sink: &mut dyn Write) -> Result<(), FormatError> {
        let mut writer = Writer::new_with_indent(&mut *sink, b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(markup_error)?;

        let root = BytesStart::new("AsycudaDeclaration").with_attributes([("version", "1.0")]);
        writer
            .write_event(Event::Start(root))
            .map_err(markup_error)?;

        open(&mut writer, "Header")?;
        leaf(&mut writer, "RegistrationNumber", &declaration.registration_number)?;
        leaf(&mut writer, "DeclarationType", declaration.declaration_type.code())?;
        leaf(&mut writer, "CustomsOffice", &declaration.customs_office)?;
        leaf(&mut writer, "Date", &day_month_year(declaration.issue_date))?;
        close(&mut writer, "Header")?;

        write_entity(&mut writer, "Exporter", &declaration.exporter)?;
        write_entity(&mut writer, "Declarant", &declaration.declarant)?;

        open(&mut writer, "DeclarationDetails")?;
        leaf(&mut writer, "GeneralProcedureCode", &declaration.general_procedure_code)?;
        leaf(&mut writer, "ExtendedProcedureCode", &declaration.extended_procedure_code)?;
        leaf(&mut writer, "CountryOfDestination", &declaration.destination_country)?;
        leaf(&mut writer, "ModeOfTransport", &declaration.transport_mode)?;
        leaf(&mut writer, "OfficeOfEntryExit", &declaration.entry_exit_office)?;
        leaf(&mut writer, "CurrencyCode", &declaration.currency_code)?;
        leaf(&mut writer, "ExchangeRate", &decimal(declaration.exchange_rate))?;
        leaf(&mut writer, "TotalPackages", &declaration.total_packages().to_string())?;
        leaf(&mut writer, "CommercialReference", &declaration.commercial_reference)?;
        let optional = [
            ("ValuationMethod", &declaration.valuation_method),
            ("DeliveryTerms", &declaration.delivery_terms),
            ("PlaceOfLoading", &declaration.place_of_loading),
            ("ManifestReference", &declaration.manifest_reference),
            ("WarehouseIdentification", &declaration.warehouse_identification),
            ("DeclarantSignature", &declaration.declarant_signature),
        ];
        for (name, value) in optional {
            if let Some(value) = value.as_deref().filter(|value| !value.is_empty()) {
                leaf(&mut writer, name, value)?;
            }
        }
        close(&mut writer, "DeclarationDetails")?;

        open(&mut writer, "Items")?;
        for item in declaration.items() {
            write_item(&mut writer, item)?;
        }
        close(&mut writer, "Items")?;

        close(&mut writer, "AsycudaDeclaration")?;
        writer.into_inner().write_all(b"\n")?;
        Ok(())
    }
}

fn write_entity<W: Write>(
    writer: &mut Writer<W>,
    section: &str,
    entity: &Entity,
) -> Result<(), FormatError> {
    open(writer, section)?;
    leaf(writer, "ID", &entity.id)?;
    leaf(writer, "Name", &entity.name)?;
    leaf(writer, "AddressLine1", &entity.address_line1)?;
    if let Some(line) = entity.address_line2.as_deref().filter(|line| !line.is_empty()) {
        leaf(writer, "AddressLine2", line)?;
    }
    leaf(writer, "City", &entity.city)?;
    leaf(writer, "Country", &entity.country)?;
    close(writer, section)
}

fn write_item<W: Write>(writer: &mut Writer<W>, item: &Item) -> Result<(), FormatError> {
    open(writer, "Item")?;
    leaf(writer, "ItemNumber", &item.item_number.to_string())?;
    leaf(writer, "HSCode", &item.hs_code)?;
    leaf(writer, "Description", &item.description)?;
    leaf(writer, "CountryOfOrigin", &item.origin_country)?;
    leaf(writer, "GrossWeight", &decimal(item.gross_weight))?;
    leaf(writer, "NetWeight", &decimal(item.net_weight))?;
    leaf(writer, "StatisticalUnit", &item.statistical_unit)?;
    leaf(writer, "Quantity", &decimal(item.quantity))?;
    leaf(writer, "CustomsValue", &decimal(item.customs_value))?;
    leaf(writer, "PackageType", &item.package_type)?;
    leaf(writer, "PackageCount", &item.package_count.to_string())?;
    leaf(writer, "MarksAndNumbers", &item.marks_and_numbers)?;
    if let Some(reference) = item.previous_document.as_deref().filter(|r| !r.is_empty()) {
        leaf(writer, "PreviousDocument", reference)?;
    }
    close(writer, "Item")
}

fn open<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), FormatError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(markup_error)
}

fn close<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), FormatError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(markup_error)
}

fn leaf<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<(), FormatError> {
    open(writer, name)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(markup_error)?;
    close(writer, name)
}

fn markup_error(err: impl std::fmt::Display) -> FormatError {
    FormatError::Markup(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::declaration::domain::fixtures::{declaration, item};
    use crate::workflows::validation::validate_markup;

    fn render(declaration: &Declaration) -> String {
        let bytes = MarkupEncoder
            .encode_to_vec(declaration)
            .expect("markup renders");
        String::from_utf8(bytes).expect("utf-8 markup")
    }

    #[test]
    fn renders_sections_that_pass_output_validation() {
        let mut declaration = declaration();
        declaration.add_item(item(1, "65040000", "LADIES STRAW HAT"));
        declaration.add_item(item(2, "61091000", "T-SHIRT SALT & PEPPER"));
        let markup = render(&declaration);

        assert!(markup.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(markup.contains("<AsycudaDeclaration version=\"1.0\">"));
        assert!(markup.contains("  <Header>"));
        assert!(markup.contains("<Date>01/10/2025</Date>"));
        assert!(markup.contains("<TotalPackages>2</TotalPackages>"));
        assert!(markup.contains("<GrossWeight>0.3</GrossWeight>"));
        assert!(markup.contains("<CustomsValue>10.0</CustomsValue>"));
        assert!(markup.contains("T-SHIRT SALT &amp; PEPPER"));

        let result = validate_markup(&markup);
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn omits_absent_optional_fields() {
        let mut declaration = declaration();
        let mut bare = item(1, "65040000", "LADIES STRAW HAT");
        bare.previous_document = None;
        declaration.add_item(bare);
        let markup = render(&declaration);

        assert!(!markup.contains("AddressLine2"));
        assert!(!markup.contains("PlaceOfLoading"));
        assert!(!markup.contains("PreviousDocument"));
        assert!(markup.contains("<DeliveryTerms>CIF</DeliveryTerms>"));
    }
}
