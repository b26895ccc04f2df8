//! User-facing messages and remediation hints for failures and validation results.

use crate::error::AppError;
use crate::workflows::declaration::DeclarationError;
use crate::workflows::encoders::FormatError;
use crate::workflows::tabular::ImportError;
use crate::workflows::validation::{ValidationContext, ValidationReport, ValidationResult};
use serde::Serialize;
use std::io::ErrorKind;
use tracing::{error, warn};

const GENERAL_SUGGESTIONS: [&str; 2] = [
    "Check the error logs for more details",
    "If the issue persists, contact support",
];

const REVIEW_SUGGESTIONS: [&str; 3] = [
    "Review each validation error and fix the corresponding issue",
    "Check field formats and constraints",
    "Verify all required fields are provided",
];

/// Substring of a validation error (lowercase) and the hint it earns.
const ERROR_PATTERNS: &[(&str, &str)] = &[
    ("required field", "Provide values for all required fields"),
    ("maximum length", "Shorten field values that exceed maximum length"),
    ("pattern", "Correct field values to match required patterns"),
    ("valid number", "Ensure numeric fields contain valid positive numbers"),
    ("positive number", "Ensure numeric fields contain valid positive numbers"),
    ("date", "Verify date fields are in the correct format"),
    ("net weight", "Ensure net weight does not exceed gross weight"),
    ("sequential", "Fix item numbers to be sequential starting from 1"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    FileNotFound,
    PermissionDenied,
    InvalidValue,
    MissingField,
    CapabilityUnavailable,
    Unexpected,
}

impl ErrorCategory {
    pub fn of(err: &AppError) -> Self {
        match err {
            AppError::Io(err) => Self::from_io(err.kind()),
            AppError::Import(ImportError::Io(err)) => Self::from_io(err.kind()),
            AppError::Import(ImportError::MissingColumns { .. }) => ErrorCategory::MissingField,
            AppError::Import(_) | AppError::Config(_) => ErrorCategory::InvalidValue,
            AppError::Declaration(DeclarationError::MissingEntityField { .. }) => {
                ErrorCategory::MissingField
            }
            AppError::Declaration(_) => ErrorCategory::InvalidValue,
            AppError::Format(FormatError::Unavailable(_)) => ErrorCategory::CapabilityUnavailable,
            AppError::Format(FormatError::Io(err)) => Self::from_io(err.kind()),
            AppError::Format(FormatError::UnknownFormat(_)) => ErrorCategory::InvalidValue,
            AppError::Format(_) | AppError::Telemetry(_) | AppError::Server(_) => {
                ErrorCategory::Unexpected
            }
        }
    }

    fn from_io(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => ErrorCategory::FileNotFound,
            ErrorKind::PermissionDenied => ErrorCategory::PermissionDenied,
            ErrorKind::InvalidData | ErrorKind::InvalidInput => ErrorCategory::InvalidValue,
            _ => ErrorCategory::Unexpected,
        }
    }

    fn message(self) -> Option<&'static str> {
        match self {
            ErrorCategory::FileNotFound => Some(
                "The specified file could not be found. Please check the file path and try again.",
            ),
            ErrorCategory::PermissionDenied => {
                Some("You don't have permission to access this file or directory.")
            }
            ErrorCategory::InvalidValue => {
                Some("Invalid value provided. Please check your input and try again.")
            }
            ErrorCategory::MissingField => {
                Some("Required field or key is missing. Please check your input and try again.")
            }
            ErrorCategory::CapabilityUnavailable => {
                Some("A required output capability is not available in this installation.")
            }
            ErrorCategory::Unexpected => None,
        }
    }

    fn suggestions(self) -> &'static [&'static str] {
        match self {
            ErrorCategory::FileNotFound => &[
                "Check if the file exists at the specified location",
                "Verify the file path is correct",
                "Ensure the file has not been moved or deleted",
            ],
            ErrorCategory::PermissionDenied => &[
                "Check if you have the necessary permissions to access the file",
                "Verify the file is not locked by another process",
            ],
            ErrorCategory::InvalidValue => &[
                "Check the format of your input data",
                "Ensure numeric fields contain valid numbers",
                "Verify date fields are in the correct format",
            ],
            ErrorCategory::MissingField => &[
                "Check if the required field exists in your data",
                "Verify column names in your spreadsheet",
                "Ensure all required fields are provided",
            ],
            ErrorCategory::CapabilityUnavailable => &["Request a different output format"],
            ErrorCategory::Unexpected => &[],
        }
    }
}

/// Stage of the workflow a failure surfaced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingContext {
    SalesDataProcessing,
    ReferenceDataLoading,
    DeclarationGeneration,
    ExportFormatGeneration,
    Validation,
}

impl ProcessingContext {
    pub const fn key(self) -> &'static str {
        match self {
            ProcessingContext::SalesDataProcessing => "sales_data_processing",
            ProcessingContext::ReferenceDataLoading => "reference_data_loading",
            ProcessingContext::DeclarationGeneration => "declaration_generation",
            ProcessingContext::ExportFormatGeneration => "export_format_generation",
            ProcessingContext::Validation => "validation",
        }
    }

    fn message(self) -> &'static str {
        match self {
            ProcessingContext::SalesDataProcessing => {
                "Error processing sales data. Please check your sales report format."
            }
            ProcessingContext::ReferenceDataLoading => {
                "Error loading reference data. Please check your reference data format."
            }
            ProcessingContext::DeclarationGeneration => {
                "Error generating declaration. Please check your input data and settings."
            }
            ProcessingContext::ExportFormatGeneration => {
                "Error generating export format. Please check your declaration data."
            }
            ProcessingContext::Validation => {
                "Validation failed. Please check the validation details and fix the issues."
            }
        }
    }

    fn suggestions(self) -> [&'static str; 3] {
        match self {
            ProcessingContext::SalesDataProcessing => [
                "Check your sales file format and column names",
                "Ensure your sales data contains all required fields",
                "Verify numeric values are properly formatted",
            ],
            ProcessingContext::ReferenceDataLoading => [
                "Check your reference data file format",
                "Ensure your reference data contains all required columns",
                "Verify the reference data is in the expected format",
            ],
            ProcessingContext::DeclarationGeneration => [
                "Check your entity information (exporter and declarant)",
                "Verify default values are correctly set",
                "Ensure your sales data contains all required information",
            ],
            ProcessingContext::ExportFormatGeneration => [
                "Check your declaration data for completeness",
                "Verify all required fields are provided",
                "Ensure the declaration is valid before generating export formats",
            ],
            ProcessingContext::Validation => REVIEW_SUGGESTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserFacingError {
    pub category: ErrorCategory,
    pub context: ProcessingContext,
    pub message: String,
    pub detail: String,
    pub suggestions: Vec<String>,
}

/// Turns a failure into a message and remediation list, logging it on the way.
pub fn describe_error(err: &AppError, context: ProcessingContext) -> UserFacingError {
    error!(context = context.key(), error = %err, "processing failed");

    let category = ErrorCategory::of(err);
    let detail = err.to_string();
    let category_message = category
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("An error occurred: {detail}"));

    let suggestions = category
        .suggestions()
        .iter()
        .chain(context.suggestions().iter())
        .chain(GENERAL_SUGGESTIONS.iter())
        .map(|suggestion| suggestion.to_string())
        .collect();

    UserFacingError {
        category,
        context,
        message: format!("{} {}", context.message(), category_message),
        detail,
        suggestions,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFeedback {
    pub context: &'static str,
    pub success: bool,
    pub message: String,
    pub suggestions: Vec<String>,
}

pub fn describe_validation(
    result: &ValidationResult,
    context: ValidationContext,
) -> ValidationFeedback {
    if result.is_valid {
        return ValidationFeedback {
            context: context.key(),
            success: true,
            message: "Validation passed successfully.".to_string(),
            suggestions: vec!["No issues found.".to_string()],
        };
    }

    warn!(
        context = context.key(),
        errors = result.error_count(),
        warnings = result.warning_count(),
        "validation failed"
    );

    let consequence = match context {
        ValidationContext::Declaration => {
            "The declaration contains validation errors that must be fixed before it can be submitted to ASYCUDA."
        }
        ValidationContext::MarkupFormat => {
            "The XML format contains validation errors that must be fixed before it can be imported into ASYCUDA."
        }
        ValidationContext::DelimitedFormat => {
            "The pipe-delimited text format contains validation errors that must be fixed before it can be imported into ASYCUDA."
        }
    };
    let message = format!(
        "Validation failed with {} errors and {} warnings. {}",
        result.error_count(),
        result.warning_count(),
        consequence
    );

    let context_advice: &[&str] = match context {
        ValidationContext::Declaration => &[
            "Check exporter and declarant information",
            "Verify HS codes are in the correct format",
            "Ensure all items have the required fields",
            "Check numeric values are positive and in the correct range",
        ],
        ValidationContext::MarkupFormat => &[
            "Verify XML structure follows ASYCUDA requirements",
            "Check all required XML elements are present",
            "Ensure XML is well-formed and valid",
        ],
        ValidationContext::DelimitedFormat => &[
            "Check pipe-delimited format follows ASYCUDA requirements",
            "Verify header line starts with 'H|'",
            "Ensure item lines start with 'I|'",
            "Check all lines have the correct number of fields",
        ],
    };

    let mut suggestions: Vec<String> = REVIEW_SUGGESTIONS
        .iter()
        .chain(context_advice.iter())
        .map(|suggestion| suggestion.to_string())
        .collect();
    for err in &result.errors {
        let lowered = err.to_lowercase();
        for (pattern, suggestion) in ERROR_PATTERNS {
            if lowered.contains(pattern) && !suggestions.iter().any(|s| s == suggestion) {
                suggestions.push(suggestion.to_string());
            }
        }
    }

    ValidationFeedback {
        context: context.key(),
        success: false,
        message,
        suggestions,
    }
}

/// Feedback for every context in `report`, in report order.
pub fn describe_report(report: &ValidationReport) -> Vec<ValidationFeedback> {
    report
        .contexts()
        .filter_map(|context| {
            report
                .get(context)
                .map(|result| describe_validation(result, context))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_in_sales_processing() {
        let err = AppError::Import(ImportError::Io(std::io::Error::new(
            ErrorKind::NotFound,
            "sales.xlsx",
        )));
        let feedback = describe_error(&err, ProcessingContext::SalesDataProcessing);

        assert_eq!(feedback.category, ErrorCategory::FileNotFound);
        assert_eq!(
            feedback.message,
            "Error processing sales data. Please check your sales report format. \
             The specified file could not be found. Please check the file path and try again."
        );
        assert_eq!(
            feedback.suggestions.first().map(String::as_str),
            Some("Check if the file exists at the specified location")
        );
        assert_eq!(
            &feedback.suggestions[feedback.suggestions.len() - 2..],
            &GENERAL_SUGGESTIONS.map(String::from)
        );
    }

    #[test]
    fn unexpected_errors_carry_their_detail() {
        let err = AppError::Format(FormatError::Markup("writer closed".to_string()));
        let feedback = describe_error(&err, ProcessingContext::ExportFormatGeneration);
        assert_eq!(feedback.category, ErrorCategory::Unexpected);
        assert!(feedback
            .message
            .ends_with("An error occurred: output error: failed to render markup: writer closed"));
        assert_eq!(feedback.suggestions.len(), 5);
    }

    #[test]
    fn missing_columns_are_missing_fields() {
        let err = AppError::Import(ImportError::MissingColumns {
            table: "sales data",
            columns: vec!["ITEM SOLD".to_string()],
        });
        assert_eq!(ErrorCategory::of(&err), ErrorCategory::MissingField);
    }

    #[test]
    fn passing_validation_has_single_suggestion() {
        let feedback = describe_validation(&ValidationResult::new(), ValidationContext::Declaration);
        assert!(feedback.success);
        assert_eq!(feedback.message, "Validation passed successfully.");
        assert_eq!(feedback.suggestions, vec!["No issues found."]);
    }

    #[test]
    fn failing_validation_adds_pattern_hints_once() {
        let mut result = ValidationResult::new();
        result.add_error("Net weight cannot exceed gross weight for item 1");
        result.add_error("Net weight cannot exceed gross weight for item 2");
        result.add_error("Item numbers must be sequential starting from 1");
        result.add_warning("Item 3 has a customs value of zero");

        let feedback = describe_validation(&result, ValidationContext::DelimitedFormat);
        assert!(!feedback.success);
        assert!(feedback
            .message
            .starts_with("Validation failed with 3 errors and 1 warnings. The pipe-delimited"));
        let net_hints = feedback
            .suggestions
            .iter()
            .filter(|s| s.as_str() == "Ensure net weight does not exceed gross weight")
            .count();
        assert_eq!(net_hints, 1);
        assert!(feedback
            .suggestions
            .contains(&"Fix item numbers to be sequential starting from 1".to_string()));
        assert!(feedback
            .suggestions
            .contains(&"Verify header line starts with 'H|'".to_string()));
    }

    #[test]
    fn report_feedback_follows_context_order() {
        let mut report = ValidationReport::new();
        report.insert(ValidationContext::Declaration, ValidationResult::new());
        report.insert(ValidationContext::MarkupFormat, ValidationResult::new());
        let contexts: Vec<_> = describe_report(&report)
            .into_iter()
            .map(|feedback| feedback.context)
            .collect();
        assert_eq!(contexts, vec!["declaration", "xml_format"]);
    }
}
