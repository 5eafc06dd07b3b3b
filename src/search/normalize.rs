//! Text normalization shared by corpus load and query time.

/// Trim surrounding whitespace and lowercase.
///
/// Corpus phrases and queries both go through this, so the two sides of a
/// similarity comparison see text prepared the same way.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}
