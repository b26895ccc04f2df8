use super::result::ValidationResult;
use quick_xml::events::Event;
use quick_xml::Reader;

const MARKUP_ROOT: &str = "AsycudaDeclaration";
const MARKUP_SECTIONS: &[&str] = &[
    "Header",
    "Exporter",
    "Declarant",
    "DeclarationDetails",
    "Items",
];

/// Field count of the `H` record.
pub const HEADER_FIELDS: usize = 27;
/// Field count of each `I` record.
pub const ITEM_FIELDS: usize = 14;

/// Checks rendered markup: well-formed, expected root, required sections and at least one item.
pub fn validate_markup(markup: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(true);

    let mut root: Option<String> = None;
    let mut seen: Vec<String> = Vec::new();
    let mut item_count = 0usize;
    let mut depth = 0usize;

    loop {
        let name = match reader.read_event() {
            Ok(Event::Start(element)) => {
                depth += 1;
                String::from_utf8_lossy(element.name().as_ref()).into_owned()
            }
            Ok(Event::Empty(element)) => {
                String::from_utf8_lossy(element.name().as_ref()).into_owned()
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                continue;
            }
            Ok(Event::Eof) => break,
            Ok(_) => continue,
            Err(err) => {
                result.add_error(format!("XML is not well-formed: {err}"));
                return result;
            }
        };

        if root.is_none() {
            root = Some(name.clone());
        }
        if name == "Item" {
            item_count += 1;
        }
        if !seen.contains(&name) {
            seen.push(name);
        }
    }

    if depth != 0 {
        result.add_error("XML is not well-formed: unclosed elements at end of document");
    }

    match root.as_deref() {
        Some(MARKUP_ROOT) => {}
        Some(other) => result.add_error(format!(
            "Root element must be {MARKUP_ROOT} (found {other})"
        )),
        None => {
            result.add_error("XML document has no elements");
            return result;
        }
    }

    for section in MARKUP_SECTIONS {
        if !seen.iter().any(|name| name == section) {
            result.add_error(format!("Missing required section: {section}"));
        }
    }

    if item_count == 0 {
        result.add_error("XML must contain at least one Item");
    }

    result
}

/// Checks pipe-delimited output: one `H` record, then sequential `I` records.
pub fn validate_delimited(text: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => records.push(record),
            Err(err) => {
                result.add_error(format!("Text output could not be parsed: {err}"));
                return result;
            }
        }
    }

    let Some((header, items)) = records.split_first() else {
        result.add_error("Text output is empty");
        return result;
    };

    if header.get(0) != Some("H") {
        result.add_error("First line must be a header record starting with 'H'");
    } else if header.len() != HEADER_FIELDS {
        result.add_error(format!(
            "Header record must have {HEADER_FIELDS} fields (found {})",
            header.len()
        ));
    }

    let mut expected = 1u32;
    for (index, record) in items.iter().enumerate() {
        let line = index + 2;
        match record.get(0) {
            Some("I") => {}
            other => {
                result.add_error(format!(
                    "Line {line}: unexpected record type '{}'",
                    other.unwrap_or_default()
                ));
                continue;
            }
        }

        if record.len() != ITEM_FIELDS {
            result.add_error(format!(
                "Line {line}: item record must have {ITEM_FIELDS} fields (found {})",
                record.len()
            ));
        }
        match record.get(1).and_then(|raw| raw.trim().parse::<u32>().ok()) {
            Some(number) if number == expected => {}
            Some(number) => result.add_error(format!(
                "Line {line}: item number {number} is out of sequence (expected {expected})"
            )),
            None => result.add_error(format!("Line {line}: item number is missing or invalid")),
        }
        expected += 1;
    }

    if expected == 1 {
        result.add_error("Text output must contain at least one item record");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKUP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AsycudaDeclaration version="1.0">
  <Header><RegistrationNumber>A1</RegistrationNumber></Header>
  <Exporter><ID>EXP</ID></Exporter>
  <Declarant><ID>DEC</ID></Declarant>
  <DeclarationDetails><CurrencyCode>XCD</CurrencyCode></DeclarationDetails>
  <Items><Item><ItemNumber>1</ItemNumber></Item></Items>
</AsycudaDeclaration>"#;

    #[test]
    fn accepts_complete_markup() {
        let result = validate_markup(MARKUP);
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn reports_missing_sections_and_items() {
        let markup = "<AsycudaDeclaration><Header/><Items></Items></AsycudaDeclaration>";
        let result = validate_markup(markup);
        assert!(result
            .errors
            .contains(&"Missing required section: Exporter".to_string()));
        assert!(result
            .errors
            .contains(&"XML must contain at least one Item".to_string()));
    }

    #[test]
    fn rejects_malformed_markup_and_wrong_root() {
        assert!(!validate_markup("<AsycudaDeclaration><Header></Items>").is_valid);
        let result = validate_markup("<Declaration><Items><Item/></Items></Declaration>");
        assert!(result.errors[0].starts_with("Root element must be AsycudaDeclaration"));
    }

    fn header_line() -> String {
        let mut fields = vec!["H".to_string()];
        fields.extend((1..HEADER_FIELDS).map(|index| format!("h{index}")));
        fields.join("|")
    }

    fn item_line(number: u32) -> String {
        let mut fields = vec!["I".to_string(), number.to_string()];
        fields.extend((2..ITEM_FIELDS).map(|index| format!("i{index}")));
        fields.join("|")
    }

    #[test]
    fn accepts_sequential_delimited_records() {
        let text = format!("{}\n{}\n{}\n", header_line(), item_line(1), item_line(2));
        let result = validate_delimited(&text);
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn flags_short_records_and_gaps() {
        let text = format!("{}\n{}\nI|3|65040000\n", header_line(), item_line(1));
        let result = validate_delimited(&text);
        assert_eq!(
            result.errors,
            vec![
                "Line 3: item record must have 14 fields (found 3)".to_string(),
                "Line 3: item number 3 is out of sequence (expected 2)".to_string(),
            ]
        );

        let result = validate_delimited("I|1\n");
        assert!(result
            .errors
            .contains(&"First line must be a header record starting with 'H'".to_string()));
        assert!(!validate_delimited("").is_valid);
    }
}
