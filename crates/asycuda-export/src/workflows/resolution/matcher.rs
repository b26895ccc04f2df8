use super::similarity::{word_tokens, SimilarityScorer};
use super::tables;
use crate::workflows::reference::{description_key, CodeDetail, ReferenceDataStore};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub const EXACT_CONFIDENCE: u8 = 100;
pub const TOKEN_CONFIDENCE: u8 = 60;
pub const DEFAULT_CONFIDENCE: u8 = 30;
/// Matches scoring below this are flagged for manual review.
pub const LOW_CONFIDENCE_THRESHOLD: u8 = 60;

/// Strategy that produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Keyword,
    Fuzzy,
    Token,
    Default,
}

impl MatchMethod {
    pub const fn label(self) -> &'static str {
        match self {
            MatchMethod::Exact => "exact",
            MatchMethod::Keyword => "keyword",
            MatchMethod::Fuzzy => "fuzzy",
            MatchMethod::Token => "token",
            MatchMethod::Default => "default",
        }
    }

    pub const fn ordered() -> [Self; 5] {
        [
            MatchMethod::Exact,
            MatchMethod::Keyword,
            MatchMethod::Fuzzy,
            MatchMethod::Token,
            MatchMethod::Default,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationMatch {
    pub code: String,
    pub method: MatchMethod,
    pub confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<CodeDetail>,
}

impl ClassificationMatch {
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE_THRESHOLD
    }
}

/// Tunables for the fuzzy, token and keyword stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatcherConfig {
    pub fuzzy_threshold: u8,
    pub min_token_overlap: usize,
    pub keyword_confidence: u8,
    pub scorer: SimilarityScorer,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 80,
            min_token_overlap: 2,
            keyword_confidence: 90,
            scorer: SimilarityScorer::TokenSort,
        }
    }
}

impl MatcherConfig {
    /// Threshold clamped into the supported 50–100 band.
    pub fn with_fuzzy_threshold(mut self, threshold: u8) -> Self {
        self.fuzzy_threshold = threshold.clamp(50, 100);
        self
    }

    pub fn with_min_token_overlap(mut self, overlap: usize) -> Self {
        self.min_token_overlap = overlap.max(1);
        self
    }
}

/// Keyword and category tables consulted by the matcher.
#[derive(Debug, Clone, Copy)]
pub struct MatchTables {
    pub keywords: &'static [(&'static str, &'static str)],
    pub categories: &'static [(&'static [&'static str], &'static str)],
    pub default_code: &'static str,
    pub stop_words: &'static [&'static str],
}

impl MatchTables {
    pub const fn standard() -> Self {
        Self {
            keywords: tables::CLASSIFICATION_KEYWORDS,
            categories: tables::CATEGORY_FALLBACKS,
            default_code: tables::DEFAULT_CODE,
            stop_words: tables::STOP_WORDS,
        }
    }
}

impl Default for MatchTables {
    fn default() -> Self {
        Self::standard()
    }
}

struct Candidate {
    code: String,
    method: MatchMethod,
    confidence: u8,
}

type Strategy = fn(&ClassificationMatcher, &str) -> Option<Candidate>;

/// Resolves free-text descriptions to classification codes.
///
/// Strategies run in a fixed order (exact, keyword, fuzzy, token) and the
/// first that produces a candidate wins; the category fallback always
/// answers. The reference store is only read.
#[derive(Debug, Clone)]
pub struct ClassificationMatcher {
    store: Arc<ReferenceDataStore>,
    tables: MatchTables,
    config: MatcherConfig,
}

impl ClassificationMatcher {
    const STRATEGIES: [Strategy; 4] = [
        Self::exact_match,
        Self::keyword_match,
        Self::fuzzy_match,
        Self::token_match,
    ];

    pub fn new(store: Arc<ReferenceDataStore>, config: MatcherConfig) -> Self {
        Self::with_tables(store, config, MatchTables::standard())
    }

    pub fn with_tables(
        store: Arc<ReferenceDataStore>,
        config: MatcherConfig,
        tables: MatchTables,
    ) -> Self {
        Self {
            store,
            tables,
            config,
        }
    }

    pub fn config(&self) -> MatcherConfig {
        self.config
    }

    pub fn classify(&self, description: &str) -> ClassificationMatch {
        let normalized = description_key(description);
        if normalized.is_empty() {
            return self.finish(Candidate {
                code: self.tables.default_code.to_string(),
                method: MatchMethod::Default,
                confidence: 0,
            });
        }

        let candidate = Self::STRATEGIES
            .iter()
            .find_map(|strategy| strategy(self, &normalized))
            .unwrap_or_else(|| self.category_fallback(&normalized));

        debug!(
            description = %normalized,
            code = %candidate.code,
            method = candidate.method.label(),
            confidence = candidate.confidence,
            "classification resolved"
        );
        self.finish(candidate)
    }

    fn finish(&self, candidate: Candidate) -> ClassificationMatch {
        // Fallback codes carry no reference record.
        let detail = match candidate.method {
            MatchMethod::Default => None,
            _ => self.store.detail(&candidate.code).cloned(),
        };
        ClassificationMatch {
            code: candidate.code,
            method: candidate.method,
            confidence: candidate.confidence,
            detail,
        }
    }

    fn exact_match(&self, normalized: &str) -> Option<Candidate> {
        self.store
            .code_for_description(normalized)
            .or_else(|| self.store.code_for_product(normalized))
            .map(|code| Candidate {
                code: code.to_string(),
                method: MatchMethod::Exact,
                confidence: EXACT_CONFIDENCE,
            })
    }

    fn keyword_match(&self, normalized: &str) -> Option<Candidate> {
        self.tables
            .keywords
            .iter()
            .find(|(keyword, _)| normalized.contains(keyword))
            .map(|(_, code)| Candidate {
                code: (*code).to_string(),
                method: MatchMethod::Keyword,
                confidence: self.config.keyword_confidence,
            })
    }

    fn fuzzy_match(&self, normalized: &str) -> Option<Candidate> {
        let mut best: Option<(u8, &str)> = None;
        for (description, code) in self.store.descriptions() {
            let score = self.config.scorer.score(normalized, description);
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, code));
            }
        }

        best.filter(|(score, _)| *score >= self.config.fuzzy_threshold)
            .map(|(score, code)| Candidate {
                code: code.to_string(),
                method: MatchMethod::Fuzzy,
                confidence: score,
            })
    }

    fn token_match(&self, normalized: &str) -> Option<Candidate> {
        let wanted = self.significant_tokens(normalized);
        if wanted.is_empty() {
            return None;
        }

        let mut best: Option<(usize, &str)> = None;
        for (description, code) in self.store.descriptions() {
            let overlap = self
                .significant_tokens(description)
                .intersection(&wanted)
                .count();
            if best.map_or(true, |(best_overlap, _)| overlap > best_overlap) {
                best = Some((overlap, code));
            }
        }

        best.filter(|(overlap, _)| *overlap >= self.config.min_token_overlap)
            .map(|(_, code)| Candidate {
                code: code.to_string(),
                method: MatchMethod::Token,
                confidence: TOKEN_CONFIDENCE,
            })
    }

    fn category_fallback(&self, normalized: &str) -> Candidate {
        let code = self
            .tables
            .categories
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|keyword| normalized.contains(keyword)))
            .map_or(self.tables.default_code, |(_, code)| *code);

        Candidate {
            code: code.to_string(),
            method: MatchMethod::Default,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    fn significant_tokens<'t>(&self, text: &'t str) -> HashSet<&'t str> {
        word_tokens(text)
            .filter(|token| !self.tables.stop_words.contains(token))
            .collect()
    }
}
