//! Static taxonomy corpus and its precomputed embeddings.

use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use super::embedding::{Embedder, Embedding, EmbeddingError};
use super::normalize::normalize_text;
use super::similarity::cosine_similarity;

/// Corpus loading failures. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Failed to read corpus {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Corpus header must be `text,category`, found `{0}`")]
    BadHeader(String),

    #[error("Malformed corpus row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("Corpus is empty")]
    Empty,

    #[error("Corpus embedding at row {row} has dimension {got}, expected {expected}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Failed to embed corpus: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// One `(text, category)` pair as read from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRow {
    pub text: String,
    pub category: String,
}

impl CorpusRow {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
        }
    }
}

/// A corpus phrase with its vector.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    /// Normalized phrase
    pub text: String,
    pub category: String,
    pub embedding: Embedding,
}

/// Parse CSV corpus content with a `text,category` header.
///
/// Every row has exactly two fields. Unquoted text may not contain commas or
/// quotes; quoted text may contain commas, with `""` as an escaped quote.
/// Blank lines are skipped.
pub fn parse_corpus(content: &str) -> Result<Vec<CorpusRow>, CorpusError> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().ok_or(CorpusError::Empty)?;
    let header_fields: Vec<String> = header
        .trim_start_matches('\u{feff}')
        .split(',')
        .map(|f| f.trim().to_ascii_lowercase())
        .collect();
    if header_fields != ["text", "category"] {
        return Err(CorpusError::BadHeader(header.to_string()));
    }

    let mut rows = Vec::new();
    for (idx, line) in lines {
        let line_no = idx + 1;
        let (raw_text, raw_category) =
            line.rsplit_once(',')
                .ok_or_else(|| CorpusError::MalformedRow {
                    line: line_no,
                    reason: "expected two fields".to_string(),
                })?;

        let text = unquote(raw_text.trim()).map_err(|reason| CorpusError::MalformedRow {
            line: line_no,
            reason: reason.to_string(),
        })?;
        let category = raw_category.trim();

        if text.trim().is_empty() {
            return Err(CorpusError::MalformedRow {
                line: line_no,
                reason: "empty text".to_string(),
            });
        }
        if category.is_empty() {
            return Err(CorpusError::MalformedRow {
                line: line_no,
                reason: "empty category".to_string(),
            });
        }

        rows.push(CorpusRow::new(text, category));
    }

    Ok(rows)
}

fn unquote(field: &str) -> Result<String, &'static str> {
    match field.strip_prefix('"') {
        Some(rest) => {
            let inner = rest.strip_suffix('"').ok_or("unbalanced quotes in text")?;
            if inner.replace("\"\"", "").contains('"') {
                return Err("unescaped quote in text");
            }
            Ok(inner.replace("\"\"", "\""))
        }
        None if field.contains('"') => Err("unbalanced quotes in text"),
        None if field.contains(',') => Err("expected two fields"),
        None => Ok(field.to_string()),
    }
}

/// Read-only index of corpus entries, in corpus order.
#[derive(Debug)]
pub struct TaxonomyIndex {
    entries: Vec<CorpusEntry>,
    dimension: usize,
}

impl TaxonomyIndex {
    /// Read a CSV corpus file and embed it.
    pub fn load(path: impl AsRef<Path>, embedder: &dyn Embedder) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CorpusError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let rows = parse_corpus(&content)?;
        let index = Self::from_rows(rows, embedder)?;
        info!(
            "Loaded {} corpus entries across {} categories from {}",
            index.len(),
            index.categories().len(),
            path.display()
        );
        Ok(index)
    }

    /// Normalize and embed rows. Fails on an empty corpus or inconsistent vectors.
    pub fn from_rows(rows: Vec<CorpusRow>, embedder: &dyn Embedder) -> Result<Self, CorpusError> {
        if rows.is_empty() {
            return Err(CorpusError::Empty);
        }

        let texts: Vec<String> = rows.iter().map(|r| normalize_text(&r.text)).collect();
        let embeddings = embedder.embed_batch(&texts)?;
        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::BatchSize {
                expected: texts.len(),
                got: embeddings.len(),
            }
            .into());
        }

        let dimension = embedder.dimension();
        let mut entries = Vec::with_capacity(rows.len());
        for (row, ((text, embedding), source)) in texts
            .into_iter()
            .zip(embeddings)
            .zip(rows)
            .enumerate()
        {
            if embedding.len() != dimension {
                return Err(CorpusError::DimensionMismatch {
                    row,
                    expected: dimension,
                    got: embedding.len(),
                });
            }
            entries.push(CorpusEntry {
                text,
                category: source.category.trim().to_string(),
                embedding,
            });
        }

        Ok(Self { entries, dimension })
    }

    /// Number of entries. Never zero.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; an empty corpus is rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn entry(&self, position: usize) -> Option<&CorpusEntry> {
        self.entries.get(position)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.category.as_str()).collect()
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.entries.iter().any(|e| e.category == category)
    }

    /// Cosine similarity of `query` against every entry, in corpus order.
    pub fn scores(&self, query: &[f32]) -> Vec<f32> {
        self.entries
            .iter()
            .map(|e| cosine_similarity(query, &e.embedding))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::HashingEmbedder;

    const SAMPLE: &str = "text,category\n\
        Leaking pipe,plumber\n\
        \"Sparks, then the lights went out\",electrician\n\
        \n\
        clogged drain,plumber\n";

    #[test]
    fn test_parse_corpus() {
        let rows = parse_corpus(SAMPLE).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], CorpusRow::new("Leaking pipe", "plumber"));
        assert_eq!(rows[1].text, "Sparks, then the lights went out");
        assert_eq!(rows[1].category, "electrician");
    }

    #[test]
    fn test_parse_escaped_quotes() {
        let rows = parse_corpus("text,category\n\"the \"\"big\"\" door\",carpenter\n").unwrap();
        assert_eq!(rows[0].text, "the \"big\" door");
    }

    #[test]
    fn test_parse_rejects_bad_header() {
        let err = parse_corpus("phrase,label\nx,y\n").unwrap_err();
        assert!(matches!(err, CorpusError::BadHeader(_)));
    }

    #[test]
    fn test_parse_rejects_missing_category() {
        let err = parse_corpus("text,category\nleaking pipe,\n").unwrap_err();
        assert!(matches!(err, CorpusError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_parse_rejects_single_field() {
        let err = parse_corpus("text,category\nleaking pipe\n").unwrap_err();
        assert!(matches!(err, CorpusError::MalformedRow { .. }));
    }

    #[test]
    fn test_parse_rejects_extra_field() {
        let err = parse_corpus("text,category\nleaking pipe,plumber,extra\n").unwrap_err();
        assert!(matches!(err, CorpusError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_parse_rejects_extra_field_after_quoted_text() {
        let err =
            parse_corpus("text,category\nclogged drain,plumber\n\"a, b\",plumber,extra\n")
                .unwrap_err();
        assert!(matches!(err, CorpusError::MalformedRow { line: 3, .. }));
    }

    #[test]
    fn test_parse_rejects_unescaped_quote() {
        let err = parse_corpus("text,category\n\"the \"big door\",carpenter\n").unwrap_err();
        assert!(matches!(err, CorpusError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(matches!(parse_corpus(""), Err(CorpusError::Empty)));
    }

    #[test]
    fn test_from_rows_normalizes_text() {
        let embedder = HashingEmbedder::default();
        let index = TaxonomyIndex::from_rows(parse_corpus(SAMPLE).unwrap(), &embedder).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.entries()[0].text, "leaking pipe");
        assert_eq!(index.dimension(), embedder.dimension());
        assert_eq!(
            index.categories().into_iter().collect::<Vec<_>>(),
            vec!["electrician", "plumber"]
        );
    }

    #[test]
    fn test_from_rows_rejects_empty() {
        let embedder = HashingEmbedder::default();
        let err = TaxonomyIndex::from_rows(Vec::new(), &embedder).unwrap_err();
        assert!(matches!(err, CorpusError::Empty));
    }

    #[test]
    fn test_header_only_corpus_is_empty() {
        let embedder = HashingEmbedder::default();
        let rows = parse_corpus("text,category\n").unwrap();
        assert!(matches!(
            TaxonomyIndex::from_rows(rows, &embedder),
            Err(CorpusError::Empty)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let embedder = HashingEmbedder::default();
        let err = TaxonomyIndex::load("/nonexistent/corpus.csv", &embedder).unwrap_err();
        assert!(matches!(err, CorpusError::Unreadable { .. }));
    }

    #[test]
    fn test_scores_follow_corpus_order() {
        let embedder = HashingEmbedder::default();
        let index = TaxonomyIndex::from_rows(parse_corpus(SAMPLE).unwrap(), &embedder).unwrap();
        let query = embedder.embed("leaking pipe").unwrap();
        let scores = index.scores(&query);

        assert_eq!(scores.len(), 3);
        assert!((scores[0] - 1.0).abs() < 1e-5);
        assert!(scores[0] > scores[1]);
    }
}
