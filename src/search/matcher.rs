//! Query-to-category matching.
//!
//! Policy: score every corpus entry by cosine similarity, keep the top K by
//! score (ties go to the earlier corpus entry), and take the category of the
//! first kept entry whose score reaches the threshold. If none does, answer
//! with the fallback category.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::embedding::{Embedder, EmbeddingError};
use super::normalize::normalize_text;
use super::taxonomy::TaxonomyIndex;
use crate::config::{MatcherSection, DEFAULT_FALLBACK_CATEGORY, DEFAULT_THRESHOLD, DEFAULT_TOP_K};

/// Matching failures.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("Failed to encode query: {0}")]
    Encoding(#[from] EmbeddingError),

    #[error("Query embedding has dimension {got}, corpus has {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid matcher configuration: {0}")]
    InvalidConfig(String),
}

/// Selection policy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// How many top-scoring entries are inspected
    pub top_k: usize,
    /// Inclusive minimum similarity for a match
    pub threshold: f32,
    /// Answer when nothing clears the threshold
    pub fallback_category: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
            fallback_category: DEFAULT_FALLBACK_CATEGORY.to_string(),
        }
    }
}

impl From<&MatcherSection> for MatcherConfig {
    fn from(section: &MatcherSection) -> Self {
        Self {
            top_k: section.top_k,
            threshold: section.threshold,
            fallback_category: section.fallback_category.clone(),
        }
    }
}

/// Outcome of matching one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub category: String,
    /// Similarity of the deciding entry; `None` for the fallback
    pub confidence: Option<f32>,
    pub matched: bool,
    /// Corpus phrase that decided the match
    pub matched_text: Option<String>,
}

/// A corpus position with its similarity score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredEntry {
    pub position: usize,
    pub score: f32,
}

/// Maps queries onto the taxonomy.
pub struct Matcher {
    index: Arc<TaxonomyIndex>,
    embedder: Arc<dyn Embedder>,
    config: MatcherConfig,
}

impl Matcher {
    /// Build a matcher. The embedder must be the one the index was built with,
    /// or at least produce vectors of the same dimension.
    pub fn new(
        index: Arc<TaxonomyIndex>,
        embedder: Arc<dyn Embedder>,
        config: MatcherConfig,
    ) -> Result<Self, MatchError> {
        if config.top_k == 0 {
            return Err(MatchError::InvalidConfig("top_k must be at least 1".into()));
        }
        if !config.threshold.is_finite() || !(-1.0..=1.0).contains(&config.threshold) {
            return Err(MatchError::InvalidConfig(format!(
                "threshold must be within [-1, 1], got {}",
                config.threshold
            )));
        }
        if config.fallback_category.trim().is_empty() {
            return Err(MatchError::InvalidConfig(
                "fallback category must not be empty".into(),
            ));
        }
        if embedder.dimension() != index.dimension() {
            return Err(MatchError::DimensionMismatch {
                expected: index.dimension(),
                got: embedder.dimension(),
            });
        }

        Ok(Self {
            index,
            embedder,
            config,
        })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn index(&self) -> &TaxonomyIndex {
        &self.index
    }

    /// Match a raw query. Normalization happens here.
    pub fn match_query(&self, query: &str) -> Result<MatchResult, MatchError> {
        let normalized = normalize_text(query);
        if normalized.is_empty() {
            return Err(MatchError::EmptyQuery);
        }

        let vector = self.embedder.embed(&normalized)?;
        if vector.len() != self.index.dimension() {
            return Err(MatchError::DimensionMismatch {
                expected: self.index.dimension(),
                got: vector.len(),
            });
        }

        let scores = self.index.scores(&vector);
        let result = self.select(&scores);
        debug!(
            category = %result.category,
            matched = result.matched,
            confidence = ?result.confidence,
            "matched query"
        );
        Ok(result)
    }

    /// Apply the selection policy to per-entry scores in corpus order.
    ///
    /// The scan below relies on [`Matcher::top_k`] returning entries in
    /// descending score order; the first entry at or above the threshold is
    /// then also the best one.
    pub fn select(&self, scores: &[f32]) -> MatchResult {
        let top = Self::top_k(scores, self.config.top_k);

        let hit = top
            .iter()
            .find(|candidate| candidate.score >= self.config.threshold)
            .and_then(|candidate| {
                self.index
                    .entry(candidate.position)
                    .map(|entry| (entry, candidate.score))
            });

        match hit {
            Some((entry, score)) => MatchResult {
                category: entry.category.clone(),
                confidence: Some(score),
                matched: true,
                matched_text: Some(entry.text.clone()),
            },
            None => self.fallback(),
        }
    }

    /// The result returned when nothing qualifies.
    pub fn fallback(&self) -> MatchResult {
        MatchResult {
            category: self.config.fallback_category.clone(),
            confidence: None,
            matched: false,
            matched_text: None,
        }
    }

    /// Highest `k` scores, descending; equal scores keep corpus order.
    ///
    /// `k` is clamped to `scores.len()`. NaN ranks below every real score.
    pub fn top_k(scores: &[f32], k: usize) -> Vec<ScoredEntry> {
        let k = k.min(scores.len());
        let mut top: Vec<ScoredEntry> = Vec::with_capacity(k + 1);
        if k == 0 {
            return top;
        }

        for (position, &raw) in scores.iter().enumerate() {
            let score = if raw.is_nan() { f32::NEG_INFINITY } else { raw };
            // Strictly-less keeps earlier entries ahead of later ties.
            let slot = top
                .iter()
                .position(|kept| kept.score < score)
                .unwrap_or(top.len());
            if slot < k {
                top.insert(slot, ScoredEntry { position, score });
                top.truncate(k);
            }
        }

        top
    }
}
