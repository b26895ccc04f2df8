/// Canonical form used to compare column headers: invisible characters
/// removed, whitespace collapsed, lowercase.
pub(crate) fn normalize_header(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

/// Cell text with surrounding whitespace and invisible characters removed.
pub(crate) fn clean_cell(value: &str) -> String {
    value.replace(['\u{feff}', '\u{200b}', '\u{a0}'], " ").trim().to_string()
}
