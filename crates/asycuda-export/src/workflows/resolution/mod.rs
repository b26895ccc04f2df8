pub mod documents;
pub mod matcher;
pub mod similarity;
pub mod supplementary;
pub mod tables;
pub mod weights;

pub use documents::{DocumentReferenceResolver, ReferenceSource};
pub use matcher::{
    ClassificationMatch, ClassificationMatcher, MatchMethod, MatchTables, MatcherConfig,
    LOW_CONFIDENCE_THRESHOLD,
};
pub use similarity::SimilarityScorer;
pub use weights::{WeightEstimate, WeightEstimator, WeightProfile, WeightSource};

use crate::workflows::declaration::{DeclarationError, Item, ItemDefaults, ItemDraft};
use crate::workflows::reference::ReferenceDataStore;
use crate::workflows::sales::SalesRow;
use chrono::{Datelike, Local};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolutionOptions {
    pub matcher: MatcherConfig,
    /// Year stamped into synthesized prior-document references.
    pub current_year: i32,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            current_year: Local::now().year(),
        }
    }
}

/// A resolved line plus how each derived field was obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedItem {
    pub row_number: usize,
    pub item: Item,
    pub classification: ClassificationMatch,
    pub weight_source: WeightSource,
    pub reference_source: ReferenceSource,
}

/// A retained row that could not become an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowIssue {
    pub row_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolutionOutcome {
    pub items: Vec<ResolvedItem>,
    pub issues: Vec<RowIssue>,
}

impl ResolutionOutcome {
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().map(|resolved| &resolved.item)
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items.into_iter().map(|resolved| resolved.item).collect()
    }

    /// Item counts per match method, in strategy order.
    pub fn method_counts(&self) -> Vec<(MatchMethod, usize)> {
        MatchMethod::ordered()
            .into_iter()
            .map(|method| {
                let count = self
                    .items
                    .iter()
                    .filter(|resolved| resolved.classification.method == method)
                    .count();
                (method, count)
            })
            .collect()
    }

    pub fn low_confidence(&self) -> impl Iterator<Item = &ResolvedItem> {
        self.items
            .iter()
            .filter(|resolved| resolved.classification.is_low_confidence())
    }
}

#[derive(Debug, thiserror::Error)]
enum RowError {
    #[error("customs value '{0}' is not a number")]
    InvalidValue(String),
    #[error("customs value must not be negative (got {0})")]
    NegativeValue(f64),
    #[error("quantity '{0}' is not a number")]
    InvalidQuantity(String),
    #[error("quantity must be positive (got {0})")]
    NonPositiveQuantity(f64),
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
}

/// Turns sales rows into declaration items.
///
/// Each row runs through the classification matcher, the weight estimator
/// and the document resolver; item defaults fill the remaining fields. Rows
/// without a description or value are dropped without comment, and rows that
/// fail construction are reported as [`RowIssue`]s while the rest of the
/// batch continues.
#[derive(Debug, Clone)]
pub struct FieldResolutionEngine {
    matcher: ClassificationMatcher,
    weights: WeightEstimator,
    documents: DocumentReferenceResolver,
    defaults: ItemDefaults,
}

impl FieldResolutionEngine {
    pub fn new(
        store: Arc<ReferenceDataStore>,
        options: ResolutionOptions,
        defaults: ItemDefaults,
    ) -> Self {
        let documents = DocumentReferenceResolver::from_store(&store, options.current_year);
        Self {
            matcher: ClassificationMatcher::new(store, options.matcher),
            weights: WeightEstimator::standard(),
            documents,
            defaults,
        }
    }

    pub fn with_weights(mut self, weights: WeightEstimator) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_documents(mut self, documents: DocumentReferenceResolver) -> Self {
        self.documents = documents;
        self
    }

    pub fn matcher(&self) -> &ClassificationMatcher {
        &self.matcher
    }

    pub fn weights(&self) -> &WeightEstimator {
        &self.weights
    }

    pub fn documents(&self) -> &DocumentReferenceResolver {
        &self.documents
    }

    pub fn resolve_rows(&self, rows: &[SalesRow]) -> ResolutionOutcome {
        let mut outcome = ResolutionOutcome::default();

        for row in rows {
            let (Some(description), Some(value)) =
                (present(&row.description), present(&row.value))
            else {
                debug!(row = row.row_number, "skipping row without description or value");
                continue;
            };

            let item_number = outcome.items.len() as u32 + 1;
            match self.resolve_row(row, description, value, item_number) {
                Ok(resolved) => outcome.items.push(resolved),
                Err(err) => {
                    warn!(row = row.row_number, error = %err, "row skipped");
                    outcome.issues.push(RowIssue {
                        row_number: row.row_number,
                        description: Some(description.to_string()),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let counts = outcome.method_counts();
        let count_of = |method: MatchMethod| {
            counts
                .iter()
                .find(|(candidate, _)| *candidate == method)
                .map_or(0, |(_, count)| *count)
        };
        info!(
            items = outcome.items.len(),
            issues = outcome.issues.len(),
            exact = count_of(MatchMethod::Exact),
            keyword = count_of(MatchMethod::Keyword),
            fuzzy = count_of(MatchMethod::Fuzzy),
            token = count_of(MatchMethod::Token),
            fallback = count_of(MatchMethod::Default),
            "sales rows resolved"
        );
        outcome
    }

    fn resolve_row(
        &self,
        row: &SalesRow,
        description: &str,
        value: &str,
        item_number: u32,
    ) -> Result<ResolvedItem, RowError> {
        let customs_value =
            parse_amount(value).ok_or_else(|| RowError::InvalidValue(value.to_string()))?;
        if customs_value < 0.0 {
            return Err(RowError::NegativeValue(customs_value));
        }
        let quantity = match present(&row.quantity) {
            Some(raw) => {
                parse_amount(raw).ok_or_else(|| RowError::InvalidQuantity(raw.to_string()))?
            }
            None => 1.0,
        };
        if quantity <= 0.0 {
            return Err(RowError::NonPositiveQuantity(quantity));
        }

        let classification = self.matcher.classify(description);
        if classification.is_low_confidence() {
            debug!(
                row = row.row_number,
                code = %classification.code,
                confidence = classification.confidence,
                "low confidence classification"
            );
        }

        let weight = self
            .weights
            .estimate(Some(&classification.code), Some(description), quantity);
        let (previous_document, reference_source) = self.documents.resolve_with_source(
            present(&row.product_code),
            Some(description),
            Some(&classification.code),
        );

        let origin_country = classification
            .detail
            .as_ref()
            .and_then(|detail| detail.origin.as_deref())
            .map(|origin| origin.trim().to_ascii_uppercase())
            .filter(|origin| !origin.is_empty())
            .unwrap_or_else(|| self.defaults.origin_country.clone());

        let item = Item::try_from(ItemDraft {
            item_number,
            hs_code: classification.code.clone(),
            description: description.to_string(),
            origin_country,
            gross_weight: weight.gross,
            net_weight: weight.net,
            statistical_unit: self.defaults.statistical_unit.clone(),
            quantity,
            customs_value,
            package_type: self.defaults.package_type.clone(),
            package_count: package_count(quantity),
            marks_and_numbers: self.defaults.marks_and_numbers.clone(),
            previous_document: Some(previous_document),
        })?;

        Ok(ResolvedItem {
            row_number: row.row_number,
            item,
            classification,
            weight_source: weight.source,
            reference_source,
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Parses a monetary or count cell, tolerating currency symbols and thousands separators.
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn package_count(quantity: f64) -> u32 {
    (quantity.trunc() as u32).max(1)
}
