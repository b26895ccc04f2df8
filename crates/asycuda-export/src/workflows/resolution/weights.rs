use super::tables;
use crate::workflows::tabular::{self, ImportError, Table, TableRow};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

const PREFIX_COLUMN: &str = "Prefix";
const KEYWORD_COLUMN: &str = "Keyword";
const GROSS_COLUMN: &str = "Gross";
const NET_COLUMN: &str = "Net";

/// Gross and net kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightProfile {
    pub gross: f64,
    pub net: f64,
}

impl WeightProfile {
    pub const fn new(gross: f64, net: f64) -> Self {
        Self { gross, net }
    }

    fn scaled(self, quantity: f64) -> Self {
        Self {
            gross: self.gross * quantity,
            net: self.net * quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSource {
    CodePrefix,
    ChapterPrefix,
    Keyword,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightEstimate {
    pub gross: f64,
    pub net: f64,
    pub source: WeightSource,
}

/// Per-unit weight lookup by code prefix, then description keyword.
#[derive(Debug, Clone)]
pub struct WeightEstimator {
    prefixes: Vec<(String, WeightProfile)>,
    keywords: Vec<(String, WeightProfile)>,
    fallback: WeightProfile,
}

impl Default for WeightEstimator {
    fn default() -> Self {
        Self::standard()
    }
}

impl WeightEstimator {
    pub fn new(
        prefixes: &[(&str, f64, f64)],
        keywords: &[(&str, f64, f64)],
        fallback: WeightProfile,
    ) -> Self {
        Self {
            prefixes: entries(prefixes),
            keywords: entries(keywords),
            fallback,
        }
    }

    pub fn standard() -> Self {
        let (gross, net) = tables::DEFAULT_WEIGHT;
        Self::new(
            tables::WEIGHT_BY_PREFIX,
            tables::WEIGHT_BY_KEYWORD,
            WeightProfile::new(gross, net),
        )
    }

    /// Adds or replaces a code-prefix mapping. New prefixes are consulted after existing ones.
    pub fn register_prefix(&mut self, prefix: &str, gross: f64, net: f64) {
        upsert(&mut self.prefixes, prefix.trim(), WeightProfile::new(gross, net));
    }

    /// Adds or replaces a description keyword mapping.
    pub fn register_keyword(&mut self, keyword: &str, gross: f64, net: f64) {
        upsert(
            &mut self.keywords,
            &keyword.trim().to_uppercase(),
            WeightProfile::new(gross, net),
        );
    }

    /// Built-in tables extended with the weight table at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ImportError> {
        let table = tabular::read_path(path)?;
        let mut estimator = Self::standard();
        estimator.load_table(&table)?;
        Ok(estimator)
    }

    /// Registers every row of a `Prefix`/`Keyword`, `Gross`, `Net` table.
    ///
    /// A row may fill either key column or both. Rows with unreadable or
    /// negative weights, or with net above gross, are skipped. Returns the
    /// number of mappings registered.
    pub fn load_table(&mut self, table: &Table) -> Result<usize, ImportError> {
        let mut missing = table.missing_columns(&[GROSS_COLUMN, NET_COLUMN]);
        if !table.has_column(PREFIX_COLUMN) && !table.has_column(KEYWORD_COLUMN) {
            missing.push(format!("{PREFIX_COLUMN} or {KEYWORD_COLUMN}"));
        }
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns {
                table: "weight table",
                columns: missing,
            });
        }

        let mut registered = 0;
        for row in table.rows() {
            let Some(profile) = row_profile(row) else {
                warn!(row = row.row_number, "weight row skipped: unusable weights");
                continue;
            };
            if let Some(prefix) = row.get(PREFIX_COLUMN) {
                let digits: String = prefix.chars().filter(char::is_ascii_digit).collect();
                if !digits.is_empty() {
                    self.register_prefix(&digits, profile.gross, profile.net);
                    registered += 1;
                }
            }
            if let Some(keyword) = row.get(KEYWORD_COLUMN) {
                self.register_keyword(keyword, profile.gross, profile.net);
                registered += 1;
            }
        }

        info!(mappings = registered, "weight table loaded");
        Ok(registered)
    }

    pub fn estimate(
        &self,
        code: Option<&str>,
        description: Option<&str>,
        quantity: f64,
    ) -> WeightEstimate {
        let (profile, source) = self.per_unit(code, description);
        let scaled = profile.scaled(quantity);
        WeightEstimate {
            gross: scaled.gross,
            net: scaled.net,
            source,
        }
    }

    pub fn per_unit(
        &self,
        code: Option<&str>,
        description: Option<&str>,
    ) -> (WeightProfile, WeightSource) {
        if let Some(code) = code.map(str::trim).filter(|code| !code.is_empty()) {
            if let Some(profile) = code.get(..4).and_then(|prefix| self.exact_prefix(prefix)) {
                return (profile, WeightSource::CodePrefix);
            }
            if let Some(profile) = code.get(..2).and_then(|chapter| self.chapter_prefix(chapter)) {
                return (profile, WeightSource::ChapterPrefix);
            }
        }

        if let Some(description) = description.map(str::to_uppercase) {
            if let Some((_, profile)) = self
                .keywords
                .iter()
                .find(|(keyword, _)| description.contains(keyword.as_str()))
            {
                return (*profile, WeightSource::Keyword);
            }
        }

        (self.fallback, WeightSource::Default)
    }

    fn exact_prefix(&self, prefix: &str) -> Option<WeightProfile> {
        self.prefixes
            .iter()
            .find(|(key, _)| key == prefix)
            .map(|(_, profile)| *profile)
    }

    fn chapter_prefix(&self, chapter: &str) -> Option<WeightProfile> {
        self.prefixes
            .iter()
            .find(|(key, _)| key.starts_with(chapter))
            .map(|(_, profile)| *profile)
    }
}

fn row_profile(row: &TableRow) -> Option<WeightProfile> {
    let weight = |column: &str| {
        row.get(column)?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
    };
    let (gross, net) = (weight(GROSS_COLUMN)?, weight(NET_COLUMN)?);
    (net <= gross).then_some(WeightProfile::new(gross, net))
}

fn entries(table: &[(&str, f64, f64)]) -> Vec<(String, WeightProfile)> {
    table
        .iter()
        .map(|(key, gross, net)| (key.to_uppercase(), WeightProfile::new(*gross, *net)))
        .collect()
}

fn upsert(entries: &mut Vec<(String, WeightProfile)>, key: &str, profile: WeightProfile) {
    if key.is_empty() {
        return;
    }
    match entries.iter_mut().find(|(existing, _)| existing == key) {
        Some(entry) => entry.1 = profile,
        None => entries.push((key.to_string(), profile)),
    }
}
