use asycuda_export::config::ResolutionConfig;
use asycuda_export::error::AppError;
use asycuda_export::workflows::declaration::DeclarationSettings;
use asycuda_export::workflows::reference::ReferenceDataStore;
use asycuda_export::workflows::pipeline::DeclarationPipeline;
use asycuda_export::workflows::resolution::{
    FieldResolutionEngine, ResolutionOptions, WeightEstimator,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared inputs for declaration and classification requests.
///
/// The reference store is loaded once at startup and only read afterwards;
/// requests that carry their own reference table build a private store.
#[derive(Clone)]
pub(crate) struct DeclarationState {
    pub(crate) reference: Arc<ReferenceDataStore>,
    pub(crate) resolution: ResolutionConfig,
    pub(crate) settings: DeclarationSettings,
    pub(crate) weights: WeightEstimator,
}

impl DeclarationState {
    pub(crate) fn new(reference: Arc<ReferenceDataStore>, resolution: ResolutionConfig) -> Self {
        Self {
            reference,
            resolution,
            settings: DeclarationSettings::default(),
            weights: WeightEstimator::standard(),
        }
    }

    pub(crate) fn with_weights(mut self, weights: WeightEstimator) -> Self {
        self.weights = weights;
        self
    }

    pub(crate) fn engine(&self, reference: Arc<ReferenceDataStore>) -> FieldResolutionEngine {
        FieldResolutionEngine::new(
            reference,
            self.options(),
            self.settings.item_defaults.clone(),
        )
        .with_weights(self.weights.clone())
    }

    pub(crate) fn pipeline(
        &self,
        reference: Arc<ReferenceDataStore>,
        settings: DeclarationSettings,
    ) -> DeclarationPipeline {
        DeclarationPipeline::new(reference, settings, self.options())
            .with_weights(self.weights.clone())
    }

    pub(crate) fn options(&self) -> ResolutionOptions {
        ResolutionOptions {
            matcher: self.resolution.matcher(),
            ..ResolutionOptions::default()
        }
    }

    /// The startup store, or one parsed from `reference_csv` when supplied.
    pub(crate) fn reference_for(
        &self,
        reference_csv: Option<String>,
    ) -> Result<Arc<ReferenceDataStore>, AppError> {
        match reference_csv.filter(|csv| !csv.trim().is_empty()) {
            Some(csv) => {
                let store = ReferenceDataStore::from_reader(Cursor::new(csv.into_bytes()))?;
                Ok(Arc::new(store))
            }
            None => Ok(self.reference.clone()),
        }
    }
}

/// Loads the reference table at `path`, or an empty store when none is configured.
pub(crate) fn load_reference(path: Option<&Path>) -> Result<Arc<ReferenceDataStore>, AppError> {
    match path {
        Some(path) => Ok(Arc::new(ReferenceDataStore::from_path(path)?)),
        None => Ok(Arc::new(ReferenceDataStore::new())),
    }
}

/// Built-in weight tables, extended by the table at `path` when one is configured.
pub(crate) fn load_weights(path: Option<&Path>) -> Result<WeightEstimator, AppError> {
    match path {
        Some(path) => Ok(WeightEstimator::from_path(path)?),
        None => Ok(WeightEstimator::standard()),
    }
}

/// Parses a `KEY=VALUE` command-line setting.
pub(crate) fn parse_setting(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("setting '{raw}' has an empty key"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
