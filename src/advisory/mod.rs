//! Quick-fix advisories.
//!
//! A [`QuickFixGenerator`] produces the short safety tip attached to every
//! analysis. The strategy is picked once, at construction:
//! - [`ConstantQuickFix`] returns a fixed advisory (default)
//! - [`GenerativeQuickFix`] asks a generative model, rate limited, and falls
//!   back to fixed text whenever it cannot answer

mod generative;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use generative::{GenerativeQuickFix, GenerativeQuickFixConfig, SAFE_FALLBACK_ADVISORY};

use crate::config::{QuickFixSection, QuickFixStrategy, DEFAULT_ADVISORY};

/// Generative advisory failures. Absorbed before they reach callers.
#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),

    #[error("Rate limit reached")]
    RateLimited,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for AdvisoryError {
    fn from(err: reqwest::Error) -> Self {
        AdvisoryError::Request(err.to_string())
    }
}

/// Produces the advisory text for an analysis.
#[async_trait]
pub trait QuickFixGenerator: Send + Sync {
    /// Strategy label for logs and metrics
    fn strategy(&self) -> &'static str;

    /// Advisory for `problem` as classified into `category`. Never fails.
    async fn generate(&self, problem: &str, category: &str) -> String;
}

/// Returns the same advisory for every problem.
#[derive(Debug, Clone)]
pub struct ConstantQuickFix {
    advisory: String,
}

impl ConstantQuickFix {
    pub fn new(advisory: impl Into<String>) -> Self {
        Self {
            advisory: advisory.into(),
        }
    }

    pub fn advisory(&self) -> &str {
        &self.advisory
    }
}

impl Default for ConstantQuickFix {
    fn default() -> Self {
        Self::new(DEFAULT_ADVISORY)
    }
}

#[async_trait]
impl QuickFixGenerator for ConstantQuickFix {
    fn strategy(&self) -> &'static str {
        "constant"
    }

    async fn generate(&self, _problem: &str, _category: &str) -> String {
        metrics::counter!("homefix_quick_fix_total", "strategy" => "constant", "outcome" => "ok")
            .increment(1);
        self.advisory.clone()
    }
}

/// Build the configured strategy.
pub fn build_quick_fix(
    section: &QuickFixSection,
) -> Result<Arc<dyn QuickFixGenerator>, AdvisoryError> {
    match section.strategy {
        QuickFixStrategy::Constant => Ok(Arc::new(ConstantQuickFix::new(section.advisory.clone()))),
        QuickFixStrategy::Generative => {
            let config = GenerativeQuickFixConfig::from_section(section)?;
            Ok(Arc::new(GenerativeQuickFix::new(config)?))
        }
    }
}
