use super::result::ValidationResult;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// The unit a validation result was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationContext {
    Declaration,
    MarkupFormat,
    DelimitedFormat,
}

impl ValidationContext {
    pub const fn key(self) -> &'static str {
        match self {
            ValidationContext::Declaration => "declaration",
            ValidationContext::MarkupFormat => "xml_format",
            ValidationContext::DelimitedFormat => "txt_format",
        }
    }
}

/// Per-context view serialized into the report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContextSummary {
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl From<&ValidationResult> for ContextSummary {
    fn from(result: &ValidationResult) -> Self {
        Self {
            is_valid: result.is_valid,
            error_count: result.error_count(),
            warning_count: result.warning_count(),
            errors: result.errors.clone(),
            warnings: result.warnings.clone(),
        }
    }
}

/// Validation results keyed by context, in insertion order.
///
/// Serializes as `{ "<context>": {...}, ..., "overall": {...} }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    entries: Vec<(ValidationContext, ValidationResult)>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the result for `context`.
    pub fn insert(&mut self, context: ValidationContext, result: ValidationResult) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == context) {
            Some(entry) => entry.1 = result,
            None => self.entries.push((context, result)),
        }
    }

    pub fn get(&self, context: ValidationContext) -> Option<&ValidationResult> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == context)
            .map(|(_, result)| result)
    }

    pub fn contexts(&self) -> impl Iterator<Item = ValidationContext> + '_ {
        self.entries.iter().map(|(context, _)| *context)
    }

    /// Every context merged; valid only if all contexts are.
    pub fn overall(&self) -> ValidationResult {
        self.entries
            .iter()
            .fold(ValidationResult::new(), |overall, (_, result)| {
                overall.merged(result.clone())
            })
    }

    pub fn is_valid(&self) -> bool {
        self.entries.iter().all(|(_, result)| result.is_valid)
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().map(|(_, result)| result.error_count()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, result)| result.warning_count())
            .sum()
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len() + 1))?;
        for (context, result) in &self.entries {
            map.serialize_entry(context.key(), &ContextSummary::from(result))?;
        }
        map.serialize_entry("overall", &ContextSummary::from(&self.overall()))?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing(error: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.add_error(error);
        result
    }

    #[test]
    fn overall_ands_validity_and_sums_counts() {
        let mut report = ValidationReport::new();
        let mut declaration = ValidationResult::new();
        declaration.add_warning("Item 1 has a customs value of zero");
        report.insert(ValidationContext::Declaration, declaration);
        report.insert(ValidationContext::DelimitedFormat, failing("bad header"));

        assert!(!report.is_valid());
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
        let overall = report.overall();
        assert!(!overall.is_valid);
        assert_eq!(overall.errors, vec!["bad header"]);
    }

    #[test]
    fn insert_replaces_existing_context() {
        let mut report = ValidationReport::new();
        report.insert(ValidationContext::MarkupFormat, failing("broken"));
        report.insert(ValidationContext::MarkupFormat, ValidationResult::new());
        assert_eq!(report.contexts().count(), 1);
        assert!(report.is_valid());
    }

    #[test]
    fn serializes_contexts_then_overall() {
        let mut report = ValidationReport::new();
        report.insert(ValidationContext::Declaration, ValidationResult::new());
        report.insert(ValidationContext::MarkupFormat, failing("missing Items"));

        let value = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(value["declaration"]["is_valid"], true);
        assert_eq!(value["xml_format"]["error_count"], 1);
        assert_eq!(value["xml_format"]["errors"][0], "missing Items");
        assert_eq!(value["overall"]["is_valid"], false);
        assert_eq!(value["overall"]["warning_count"], 0);
    }
}
