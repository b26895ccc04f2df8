use super::{day_month_year, decimal, FormatEncoder, FormatError, OutputFormat};
use crate::workflows::declaration::{Declaration, Entity};
use std::io::Write;

const STYLE: &str = "@page { size: letter; margin: 12mm; }
body { font-family: Helvetica, Arial, sans-serif; font-size: 9pt; }
h1 { font-size: 14pt; text-align: center; margin: 0 0 8pt; }
h2 { font-size: 10pt; margin: 8pt 0 4pt; }
table { width: 100%; border-collapse: collapse; }
th, td { border: 1px solid #444; padding: 2pt 4pt; text-align: left; vertical-align: top; }
th { background: #ddd; }
.parties td { width: 50%; }
.num { text-align: right; }";

/// Single-page HTML rendition of the customs form, ready for printing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintFormEncoder;

impl FormatEncoder for PrintFormEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::PrintForm
    }

    fn encode(&self, declaration: &Declaration, sink: &mut dyn Write) -> Result<(), FormatError> {
        writeln!(sink, "<!DOCTYPE html>")?;
        writeln!(sink, "<html lang=\"en\"><head><meta charset=\"utf-8\">")?;
        writeln!(
            sink,
            "<title>Export Declaration {}</title>",
            escape_html(&declaration.registration_number)
        )?;
        writeln!(sink, "<style>{STYLE}</style></head><body>")?;
        writeln!(sink, "<h1>ASYCUDA Export Declaration</h1>")?;

        let header = [
            ("Registration Number", declaration.registration_number.clone()),
            (
                "Declaration Type",
                format!(
                    "{} ({})",
                    declaration.declaration_type.code(),
                    declaration.declaration_type.label()
                ),
            ),
            ("Customs Office", declaration.customs_office.clone()),
            ("Date", day_month_year(declaration.issue_date)),
        ];
        write_pairs(sink, &header)?;

        writeln!(sink, "<table class=\"parties\"><tr>")?;
        write_party(sink, "Exporter", &declaration.exporter)?;
        write_party(sink, "Declarant", &declaration.declarant)?;
        writeln!(sink, "</tr></table>")?;

        writeln!(sink, "<h2>Declaration Details</h2>")?;
        let mut details = vec![
            ("General Procedure Code", declaration.general_procedure_code.clone()),
            ("Extended Procedure Code", declaration.extended_procedure_code.clone()),
            ("Country of Destination", declaration.destination_country.clone()),
            ("Mode of Transport", declaration.transport_mode.clone()),
            ("Office of Entry/Exit", declaration.entry_exit_office.clone()),
            ("Currency", declaration.currency_code.clone()),
            ("Exchange Rate", decimal(declaration.exchange_rate)),
            ("Commercial Reference", declaration.commercial_reference.clone()),
        ];
        let optional = [
            ("Valuation Method", &declaration.valuation_method),
            ("Delivery Terms", &declaration.delivery_terms),
            ("Place of Loading", &declaration.place_of_loading),
            ("Manifest Reference", &declaration.manifest_reference),
            ("Warehouse", &declaration.warehouse_identification),
        ];
        details.extend(
            optional
                .into_iter()
                .filter_map(|(label, value)| value.clone().map(|value| (label, value))),
        );
        write_pairs(sink, &details)?;

        writeln!(sink, "<h2>Items</h2>")?;
        writeln!(
            sink,
            "<table><tr><th>#</th><th>HS Code</th><th>Description</th><th>Origin</th>\
             <th>Gross kg</th><th>Net kg</th><th>Qty</th><th>Unit</th><th>Value</th>\
             <th>Pkgs</th><th>Previous Document</th></tr>"
        )?;
        for item in declaration.items() {
            writeln!(
                sink,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
                 <td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td>\
                 <td class=\"num\">{}</td><td>{}</td><td class=\"num\">{:.2}</td>\
                 <td class=\"num\">{} {}</td><td>{}</td></tr>",
                item.item_number,
                escape_html(&item.hs_code),
                escape_html(&item.description),
                escape_html(&item.origin_country),
                item.gross_weight,
                item.net_weight,
                decimal(item.quantity),
                escape_html(&item.statistical_unit),
                item.customs_value,
                item.package_count,
                escape_html(&item.package_type),
                escape_html(item.previous_document.as_deref().unwrap_or("")),
            )?;
        }
        writeln!(sink, "</table>")?;

        let totals = declaration.totals();
        writeln!(sink, "<h2>Totals</h2>")?;
        write_pairs(
            sink,
            &[
                ("Items", totals.total_items.to_string()),
                ("Packages", totals.total_packages.to_string()),
                ("Gross Weight", format!("{:.2} kg", totals.total_gross_weight)),
                ("Net Weight", format!("{:.2} kg", totals.total_net_weight)),
                (
                    "Total Value",
                    format!("{:.2} {}", totals.total_value, declaration.currency_code),
                ),
            ],
        )?;

        if let Some(signature) = &declaration.declarant_signature {
            writeln!(sink, "<p>Signed: {}</p>", escape_html(signature))?;
        }
        writeln!(sink, "</body></html>")?;
        Ok(())
    }
}

fn write_pairs(sink: &mut dyn Write, pairs: &[(&str, String)]) -> Result<(), FormatError> {
    writeln!(sink, "<table>")?;
    for (label, value) in pairs {
        writeln!(
            sink,
            "<tr><th>{}</th><td>{}</td></tr>",
            escape_html(label),
            escape_html(value)
        )?;
    }
    writeln!(sink, "</table>")?;
    Ok(())
}

fn write_party(sink: &mut dyn Write, role: &str, entity: &Entity) -> Result<(), FormatError> {
    writeln!(sink, "<td><h2>{role}</h2>")?;
    writeln!(
        sink,
        "<p>{}<br>{}<br>{}",
        escape_html(&entity.id),
        escape_html(&entity.name),
        escape_html(&entity.address_line1)
    )?;
    if let Some(line) = &entity.address_line2 {
        write!(sink, "<br>{}", escape_html(line))?;
    }
    writeln!(
        sink,
        "<br>{}, {}</p></td>",
        escape_html(&entity.city),
        escape_html(&entity.country)
    )?;
    Ok(())
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::declaration::domain::fixtures::{declaration, item};

    #[test]
    fn renders_parties_items_and_totals() {
        let mut declaration = declaration();
        declaration.add_item(item(1, "65040000", "LADIES STRAW HAT"));
        declaration.add_item(item(2, "42022200", "BAG <LARGE> & CO"));
        let html = String::from_utf8(
            PrintFormEncoder
                .encode_to_vec(&declaration)
                .expect("print form renders"),
        )
        .expect("utf-8 html");

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h2>Exporter</h2>"));
        assert!(html.contains("Island Duty Free Ltd"));
        assert!(html.contains("EX3 (Re-export)"));
        assert!(html.contains("BAG &lt;LARGE&gt; &amp; CO"));
        assert!(html.contains("<tr><th>Packages</th><td>2</td></tr>"));
        assert!(html.contains("<tr><th>Total Value</th><td>20.00 XCD</td></tr>"));
        assert!(html.trim_end().ends_with("</body></html>"));
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_html("A&B <\"x\">'"), "A&amp;B &lt;&quot;x&quot;&gt;&#39;");
    }
}
