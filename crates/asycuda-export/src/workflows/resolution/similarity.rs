use serde::{Deserialize, Serialize};

/// Scoring routine used by the fuzzy stage. Scores are 0–100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityScorer {
    /// Indel ratio over alphabetically sorted word tokens.
    #[default]
    TokenSort,
    /// Indel ratio over the raw lowercased strings.
    SequenceRatio,
}

impl SimilarityScorer {
    pub fn score(self, left: &str, right: &str) -> u8 {
        match self {
            SimilarityScorer::TokenSort => token_sort_ratio(left, right),
            SimilarityScorer::SequenceRatio => sequence_ratio(left, right),
        }
    }
}

pub fn token_sort_ratio(left: &str, right: &str) -> u8 {
    let left = sorted_tokens(left);
    let right = sorted_tokens(right);
    if left.is_empty() || right.is_empty() {
        return 0;
    }
    percent(indel_ratio(&left, &right))
}

pub fn sequence_ratio(left: &str, right: &str) -> u8 {
    let left = left.trim().to_lowercase();
    let right = right.trim().to_lowercase();
    if left.is_empty() || right.is_empty() {
        return 0;
    }
    percent(indel_ratio(&left, &right))
}

/// `2 * LCS / (len(a) + len(b))` over characters, in `0.0..=1.0`.
///
/// One minus the insertion/deletion distance normalized by the combined length.
pub fn indel_ratio(left: &str, right: &str) -> f64 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    let total = left.len() + right.len();
    if total == 0 {
        return 1.0;
    }
    (2 * longest_common_subsequence(&left, &right)) as f64 / total as f64
}

fn longest_common_subsequence(left: &[char], right: &[char]) -> usize {
    let mut previous = vec![0usize; right.len() + 1];
    let mut current = vec![0usize; right.len() + 1];
    for &a in left {
        for (j, &b) in right.iter().enumerate() {
            current[j + 1] = if a == b {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[right.len()]
}

/// Maximal runs of word characters (letters, digits, underscore).
pub fn word_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
}

fn sorted_tokens(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn percent(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}
