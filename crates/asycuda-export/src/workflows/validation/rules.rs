use super::result::ValidationResult;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Maximum field lengths, keyed by field name.
pub const MAX_LENGTHS: &[(&str, usize)] = &[
    ("registration_number", 20),
    ("declaration_type", 3),
    ("customs_office", 5),
    ("exporter_id", 20),
    ("exporter_name", 70),
    ("declarant_id", 20),
    ("declarant_name", 70),
    ("general_procedure_code", 4),
    ("extended_procedure_code", 3),
    ("country_of_destination", 2),
    ("mode_of_transport", 2),
    ("office_of_entry_exit", 5),
    ("currency_code", 3),
    ("commercial_reference", 35),
    ("hs_code", 10),
    ("description", 280),
    ("country_of_origin", 2),
    ("package_type", 2),
    ("marks_and_numbers", 140),
    ("previous_document", 50),
];

/// Named patterns a field value must match in full.
pub const PATTERNS: &[(&str, &str)] = &[
    ("registration_number", r"^[A-Z0-9]+$"),
    ("declaration_type", r"^EX[1-3]$"),
    ("customs_office", r"^LC[A-Z]{2,3}$"),
    ("general_procedure_code", r"^\d{4}$"),
    ("extended_procedure_code", r"^\d{3}$"),
    ("country_code", r"^[A-Z]{2}$"),
    ("currency_code", r"^[A-Z]{3}$"),
    ("hs_code", r"^\d{6,10}$"),
    ("numeric", r"^\d+(\.\d+)?$"),
    ("date", r"^\d{2}/\d{2}/\d{4}$"),
];

/// [`PATTERNS`] compiled once per process. Panics if a pattern is malformed.
fn compiled_patterns() -> &'static HashMap<&'static str, Regex> {
    static COMPILED: OnceLock<HashMap<&'static str, Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|(name, pattern)| {
                let regex = Regex::new(pattern)
                    .unwrap_or_else(|err| panic!("field pattern '{name}' is invalid: {err}"));
                (*name, regex)
            })
            .collect()
    })
}

/// Length, pattern, numeric and date checks shared by every validator.
#[derive(Debug, Clone)]
pub struct FieldRules {
    max_lengths: HashMap<&'static str, usize>,
    patterns: HashMap<&'static str, Regex>,
}

impl Default for FieldRules {
    fn default() -> Self {
        Self::standard()
    }
}

impl FieldRules {
    pub fn standard() -> Self {
        Self {
            max_lengths: MAX_LENGTHS.iter().copied().collect(),
            patterns: compiled_patterns().clone(),
        }
    }

    pub fn max_length(&self, field: &str) -> Option<usize> {
        self.max_lengths.get(field).copied()
    }

    pub fn has_pattern(&self, name: &str) -> bool {
        self.patterns.contains_key(name)
    }

    /// Fields without a configured limit always pass.
    pub fn check_length(&self, field: &str, value: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        if let Some(limit) = self.max_length(field) {
            if value.chars().count() > limit {
                result.add_error(format!(
                    "Field '{field}' exceeds maximum length of {limit} characters"
                ));
            }
        }
        result
    }

    pub fn check_pattern(&self, pattern: &str, value: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        if let Some(regex) = self.patterns.get(pattern) {
            if !regex.is_match(value) {
                result.add_error(format!(
                    "Value '{value}' does not match required pattern for {pattern}"
                ));
            }
        }
        result
    }

    pub fn check_non_negative(&self, field: &str, value: f64) -> ValidationResult {
        let mut result = ValidationResult::new();
        if !value.is_finite() {
            result.add_error(format!("Field '{field}' must be a valid number"));
        } else if value < 0.0 {
            result.add_error(format!("Field '{field}' must be a positive number"));
        }
        result
    }

    /// Accepts `DD/MM/YYYY` or ISO `YYYY-MM-DD` calendar dates.
    pub fn check_date(&self, field: &str, value: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        let parsed = if self
            .patterns
            .get("date")
            .is_some_and(|regex| regex.is_match(value))
        {
            NaiveDate::parse_from_str(value, "%d/%m/%Y").ok()
        } else {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
        };
        if parsed.is_none() {
            result.add_error(format!("Field '{field}' must be a valid date"));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_compiles() {
        let rules = FieldRules::standard();
        for (name, _) in PATTERNS {
            assert!(rules.has_pattern(name), "pattern {name} missing");
        }
        assert_eq!(compiled_patterns().len(), PATTERNS.len());
    }

    #[test]
    fn standard_rules_share_one_compiled_table() {
        let first: *const _ = compiled_patterns();
        let second: *const _ = compiled_patterns();
        assert_eq!(first, second);
        assert!(FieldRules::standard()
            .check_pattern("hs_code", "6504")
            .errors
            .iter()
            .any(|error| error.contains("hs_code")));
    }

    #[test]
    fn length_and_pattern_messages_name_the_field() {
        let rules = FieldRules::standard();
        let result = rules.check_length("commercial_reference", &"R".repeat(36));
        assert_eq!(
            result.errors,
            vec!["Field 'commercial_reference' exceeds maximum length of 35 characters"]
        );
        assert!(rules.check_length("unlisted", &"x".repeat(999)).is_valid);

        let result = rules.check_pattern("customs_office", "XXVFP");
        assert_eq!(
            result.errors,
            vec!["Value 'XXVFP' does not match required pattern for customs_office"]
        );
        assert!(rules.check_pattern("customs_office", "LCVFP").is_valid);
        assert!(rules.check_pattern("hs_code", "65040000").is_valid);
        assert!(!rules.check_pattern("hs_code", "6504").is_valid);
    }

    #[test]
    fn numbers_and_dates() {
        let rules = FieldRules::standard();
        assert!(rules.check_non_negative("customs_value", 0.0).is_valid);
        assert_eq!(
            rules.check_non_negative("exchange_rate", -1.0).errors,
            vec!["Field 'exchange_rate' must be a positive number"]
        );
        assert!(!rules.check_non_negative("quantity", f64::NAN).is_valid);

        assert!(rules.check_date("date", "01/10/2025").is_valid);
        assert!(rules.check_date("date", "2025-10-01").is_valid);
        assert!(!rules.check_date("date", "31/02/2025").is_valid);
        assert!(!rules.check_date("date", "yesterday").is_valid);
    }
}
