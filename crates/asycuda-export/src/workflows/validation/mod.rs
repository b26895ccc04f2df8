mod output;
mod report;
mod result;
mod rules;

pub use output::{validate_delimited, validate_markup};
pub use output::{HEADER_FIELDS, ITEM_FIELDS};
pub use report::{ContextSummary, ValidationContext, ValidationReport};
pub use result::ValidationResult;
pub use rules::{FieldRules, MAX_LENGTHS, PATTERNS};

use crate::workflows::declaration::{Declaration, DeclarationType, Entity, Item};
use tracing::info;

const HEADER_REQUIRED: &[&str] = &[
    "registration_number",
    "declaration_type",
    "customs_office",
    "general_procedure_code",
    "extended_procedure_code",
    "country_of_destination",
    "mode_of_transport",
    "office_of_entry_exit",
    "currency_code",
    "exchange_rate",
    "date",
];

/// Checks a declaration against format, length, pattern and cross-field rules.
///
/// Every check runs and the results are merged; nothing short-circuits. The
/// engine is stateless between calls.
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    rules: FieldRules,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self::with_rules(FieldRules::standard())
    }

    pub fn with_rules(rules: FieldRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &FieldRules {
        &self.rules
    }

    pub fn validate(&self, declaration: &Declaration) -> ValidationResult {
        info!(
            registration = %declaration.registration_number,
            items = declaration.items().len(),
            "validating declaration"
        );

        let mut result = self.validate_header(declaration);
        result.merge(self.validate_entity(&declaration.exporter, "exporter"));
        result.merge(self.validate_entity(&declaration.declarant, "declarant"));
        for (index, item) in declaration.items().iter().enumerate() {
            result.merge(self.validate_item(item, index + 1));
        }
        result.merge(self.validate_consistency(declaration));
        result
    }

    /// Validates the declaration and any rendered outputs into one report.
    pub fn validate_all(
        &self,
        declaration: &Declaration,
        markup: Option<&str>,
        delimited: Option<&str>,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.insert(ValidationContext::Declaration, self.validate(declaration));
        if let Some(markup) = markup {
            report.insert(ValidationContext::MarkupFormat, validate_markup(markup));
        }
        if let Some(delimited) = delimited {
            report.insert(ValidationContext::DelimitedFormat, validate_delimited(delimited));
        }
        report
    }

    pub fn validate_header(&self, declaration: &Declaration) -> ValidationResult {
        let mut result = ValidationResult::new();
        let date = declaration.issue_date.format("%d/%m/%Y").to_string();
        let exchange_rate = if declaration.exchange_rate.is_nan() {
            String::new()
        } else {
            declaration.exchange_rate.to_string()
        };

        for field in HEADER_REQUIRED {
            let value = match *field {
                "registration_number" => declaration.registration_number.as_str(),
                "declaration_type" => declaration.declaration_type.code(),
                "customs_office" => declaration.customs_office.as_str(),
                "general_procedure_code" => declaration.general_procedure_code.as_str(),
                "extended_procedure_code" => declaration.extended_procedure_code.as_str(),
                "country_of_destination" => declaration.destination_country.as_str(),
                "mode_of_transport" => declaration.transport_mode.as_str(),
                "office_of_entry_exit" => declaration.entry_exit_office.as_str(),
                "currency_code" => declaration.currency_code.as_str(),
                "exchange_rate" => exchange_rate.as_str(),
                _ => date.as_str(),
            };
            if value.trim().is_empty() {
                result.add_error(format!("Required field '{field}' is missing"));
            }
        }

        if present(&declaration.registration_number) {
            result.merge(
                self.rules
                    .check_length("registration_number", &declaration.registration_number),
            );
            result.merge(
                self.rules
                    .check_pattern("registration_number", &declaration.registration_number),
            );
        }
        result.merge(
            self.rules
                .check_pattern("declaration_type", declaration.declaration_type.code()),
        );
        for (pattern, value) in [
            ("customs_office", &declaration.customs_office),
            ("general_procedure_code", &declaration.general_procedure_code),
            ("extended_procedure_code", &declaration.extended_procedure_code),
            ("country_code", &declaration.destination_country),
            ("currency_code", &declaration.currency_code),
        ] {
            if present(value) {
                result.merge(self.rules.check_pattern(pattern, value));
            }
        }
        if present(&declaration.commercial_reference) {
            result.merge(
                self.rules
                    .check_length("commercial_reference", &declaration.commercial_reference),
            );
        }
        if !declaration.exchange_rate.is_nan() {
            result.merge(
                self.rules
                    .check_non_negative("exchange_rate", declaration.exchange_rate),
            );
        }
        result.merge(self.rules.check_date("date", &date));

        if declaration.items().is_empty() {
            result.add_error("Declaration must have at least one item");
        }

        result
    }

    pub fn validate_entity(&self, entity: &Entity, role: &str) -> ValidationResult {
        let mut result = ValidationResult::new();

        for (field, value) in [
            ("id", &entity.id),
            ("name", &entity.name),
            ("address_line1", &entity.address_line1),
        ] {
            if value.trim().is_empty() {
                result.add_error(format!("Required field '{field}' is missing for {role}"));
            }
        }

        if !entity.id.is_empty() {
            result.merge(self.rules.check_length(&format!("{role}_id"), &entity.id));
        }
        if !entity.name.is_empty() {
            result.merge(self.rules.check_length(&format!("{role}_name"), &entity.name));
        }
        if !entity.country.is_empty() {
            result.merge(self.rules.check_pattern("country_code", &entity.country));
        }

        result
    }

    /// Checks one line; `position` is the 1-based index used in messages.
    pub fn validate_item(&self, item: &Item, position: usize) -> ValidationResult {
        let mut result = ValidationResult::new();

        let text_fields = [
            ("hs_code", item.hs_code.as_str()),
            ("description", item.description.as_str()),
            ("country_of_origin", item.origin_country.as_str()),
            ("statistical_unit", item.statistical_unit.as_str()),
            ("package_type", item.package_type.as_str()),
        ];
        for (field, value) in text_fields {
            if value.trim().is_empty() {
                result.add_error(format!(
                    "Required field '{field}' is missing for item {position}"
                ));
            }
        }
        for (field, value) in [
            ("gross_weight", item.gross_weight),
            ("net_weight", item.net_weight),
            ("quantity", item.quantity),
            ("customs_value", item.customs_value),
        ] {
            if value.is_nan() {
                result.add_error(format!(
                    "Required field '{field}' is missing for item {position}"
                ));
            }
        }

        if !item.hs_code.is_empty() {
            result.merge(self.rules.check_pattern("hs_code", &item.hs_code));
        }
        if !item.description.is_empty() {
            result.merge(self.rules.check_length("description", &item.description));
        }
        if !item.origin_country.is_empty() {
            result.merge(self.rules.check_pattern("country_code", &item.origin_country));
        }
        for (field, value) in [
            ("gross_weight", item.gross_weight),
            ("net_weight", item.net_weight),
            ("quantity", item.quantity),
            ("customs_value", item.customs_value),
            ("package_count", f64::from(item.package_count)),
        ] {
            if !value.is_nan() {
                result.merge(self.rules.check_non_negative(field, value));
            }
        }
        result.merge(self.rules.check_length("marks_and_numbers", &item.marks_and_numbers));
        if let Some(previous) = item.previous_document.as_deref() {
            result.merge(self.rules.check_length("previous_document", previous));
        }

        if item.net_weight > item.gross_weight {
            result.add_error(format!(
                "Net weight cannot exceed gross weight for item {position}"
            ));
        }

        result
    }

    /// Cross-item checks: numbering, cached totals and per-regime expectations.
    pub fn validate_consistency(&self, declaration: &Declaration) -> ValidationResult {
        let mut result = ValidationResult::new();
        let items = declaration.items();

        let sequential = items
            .iter()
            .enumerate()
            .all(|(index, item)| item.item_number as usize == index + 1);
        if !sequential {
            result.add_error("Item numbers must be sequential starting from 1");
        }

        let package_sum: u64 = items.iter().map(|item| u64::from(item.package_count)).sum();
        if declaration.total_packages() != package_sum {
            result.add_warning(format!(
                "Total packages ({}) does not match the sum of item packages ({})",
                declaration.total_packages(),
                package_sum
            ));
        }

        for item in items {
            if item.customs_value == 0.0 {
                result.add_warning(format!(
                    "Item {} has a customs value of zero",
                    item.item_number
                ));
            }
            if declaration.declaration_type == DeclarationType::ReExport
                && item.previous_document.is_none()
            {
                result.add_warning(format!(
                    "Item {} is re-exported without a previous document reference",
                    item.item_number
                ));
            }
        }

        result
    }
}

fn present(value: &str) -> bool {
    !value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::declaration::domain::fixtures::{declaration, entity, item};

    fn populated() -> Declaration {
        let mut declaration = declaration();
        declaration.add_item(item(1, "65040000", "LADIES STRAW HAT"));
        declaration.add_item(item(2, "71179000", "SHELL NECKLACE"));
        declaration
    }

    #[test]
    fn well_formed_declaration_passes() {
        let result = ValidationEngine::new().validate(&populated());
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn empty_declaration_always_fails() {
        let result = ValidationEngine::new().validate(&declaration());
        assert!(!result.is_valid);
        assert!(result
            .errors
            .contains(&"Declaration must have at least one item".to_string()));
    }

    #[test]
    fn header_patterns_and_required_fields_are_checked_together() {
        let mut declaration = populated();
        declaration.registration_number = "a-1".to_string();
        declaration.customs_office = "VFP".to_string();
        declaration.currency_code = String::new();
        declaration.exchange_rate = -2.0;

        let errors = ValidationEngine::new().validate(&declaration).errors;
        assert!(errors.contains(&"Required field 'currency_code' is missing".to_string()));
        assert!(errors.contains(
            &"Value 'a-1' does not match required pattern for registration_number".to_string()
        ));
        assert!(errors
            .contains(&"Value 'VFP' does not match required pattern for customs_office".to_string()));
        assert!(errors.contains(&"Field 'exchange_rate' must be a positive number".to_string()));
    }

    #[test]
    fn net_weight_above_gross_is_caught_even_when_construction_was_bypassed() {
        let mut declaration = populated();
        declaration.items_mut()[0].net_weight = 5.0;

        let result = ValidationEngine::new().validate(&declaration);
        assert!(!result.is_valid);
        assert!(result
            .errors
            .iter()
            .any(|error| error.starts_with("Net weight cannot exceed gross weight")));
    }

    #[test]
    fn entity_checks_use_role_specific_limits() {
        let mut exporter = (*entity("EXP", "Shop")).clone();
        exporter.id = "X".repeat(21);
        exporter.address_line1 = String::new();
        exporter.country = "LCA".to_string();

        let errors = ValidationEngine::new()
            .validate_entity(&exporter, "exporter")
            .errors;
        assert_eq!(
            errors,
            vec![
                "Required field 'address_line1' is missing for exporter".to_string(),
                "Field 'exporter_id' exceeds maximum length of 20 characters".to_string(),
                "Value 'LCA' does not match required pattern for country_code".to_string(),
            ]
        );
    }

    #[test]
    fn item_checks_report_position() {
        let mut line = item(1, "65040000", "STRAW HAT");
        line.hs_code = "65A".to_string();
        line.origin_country = String::new();
        line.customs_value = -1.0;

        let errors = ValidationEngine::new().validate_item(&line, 3).errors;
        assert!(errors
            .contains(&"Required field 'country_of_origin' is missing for item 3".to_string()));
        assert!(errors
            .contains(&"Value '65A' does not match required pattern for hs_code".to_string()));
        assert!(errors.contains(&"Field 'customs_value' must be a positive number".to_string()));
    }

    #[test]
    fn consistency_flags_numbering_totals_and_missing_documents() {
        let mut declaration = populated();
        declaration.items_mut()[1].item_number = 5;
        declaration.items_mut()[1].previous_document = None;
        declaration.items_mut()[1].customs_value = 0.0;
        declaration.items_mut()[1].package_count = 4;

        let result = ValidationEngine::new().validate_consistency(&declaration);
        assert_eq!(
            result.errors,
            vec!["Item numbers must be sequential starting from 1"]
        );
        assert_eq!(result.warnings.len(), 3);
        assert!(result.warnings[0].starts_with("Total packages (2)"));
    }
}
