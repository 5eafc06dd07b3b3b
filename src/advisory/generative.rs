//! Generative quick-fix strategy backed by the Gemini `generateContent` API.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use serde_json::json;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

use super::{AdvisoryError, QuickFixGenerator};
use crate::config::QuickFixSection;

/// Returned when the model call fails for any reason other than rate limiting.
pub const SAFE_FALLBACK_ADVISORY: &str =
    "Please take basic safety precautions until a professional arrives.";

/// Settings for [`GenerativeQuickFix`].
#[derive(Debug, Clone)]
pub struct GenerativeQuickFixConfig {
    /// API base, e.g. `https://generativelanguage.googleapis.com/v1beta`
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub requests_per_minute: NonZeroU32,
    pub timeout: Duration,
    /// Returned while the rate limit is exhausted
    pub rate_limited_advisory: String,
}

impl GenerativeQuickFixConfig {
    /// Resolve the API key from the configured environment variable.
    pub fn from_section(section: &QuickFixSection) -> Result<Self, AdvisoryError> {
        let api_key = std::env::var(&section.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AdvisoryError::MissingApiKey(section.api_key_env.clone()))?;
        let requests_per_minute = NonZeroU32::new(section.requests_per_minute).ok_or_else(|| {
            AdvisoryError::Request("requests_per_minute must be positive".to_string())
        })?;

        Ok(Self {
            endpoint: section.endpoint.clone(),
            model: section.model.clone(),
            api_key,
            requests_per_minute,
            timeout: Duration::from_millis(section.timeout_ms),
            rate_limited_advisory: section.advisory.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Asks a generative model for temporary, safe suggestions.
pub struct GenerativeQuickFix {
    client: reqwest::Client,
    config: GenerativeQuickFixConfig,
    limiter: DefaultDirectRateLimiter,
}

impl GenerativeQuickFix {
    pub fn new(config: GenerativeQuickFixConfig) -> Result<Self, AdvisoryError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let limiter = RateLimiter::direct(Quota::per_minute(config.requests_per_minute));
        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    fn prompt(problem: &str, category: &str) -> String {
        format!(
            "You are a home service expert.\n\n\
             User problem:\n{problem}\n\n\
             Detected service category:\n{category}\n\n\
             Give 2-3 short, safe, temporary quick-fix suggestions.\n\n\
             Rules:\n\
             - Do NOT suggest professional repairs\n\
             - Do NOT mention complex tools\n\
             - Keep advice safe and simple\n\
             - Use bullet points\n"
        )
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn try_generate(&self, problem: &str, category: &str) -> Result<String, AdvisoryError> {
        self.limiter
            .check()
            .map_err(|_| AdvisoryError::RateLimited)?;

        let body = json!({
            "contents": [{ "parts": [{ "text": Self::prompt(problem, category) }] }]
        });

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");
        let text = text.trim();

        if text.is_empty() {
            return Err(AdvisoryError::InvalidResponse(
                "no text in candidates".to_string(),
            ));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl QuickFixGenerator for GenerativeQuickFix {
    fn strategy(&self) -> &'static str {
        "generative"
    }

    async fn generate(&self, problem: &str, category: &str) -> String {
        debug!("Requesting generative quick fix for category {}", category);
        match self.try_generate(problem, category).await {
            Ok(text) => {
                metrics::counter!("homefix_quick_fix_total", "strategy" => "generative", "outcome" => "ok")
                    .increment(1);
                text
            }
            Err(AdvisoryError::RateLimited) => {
                metrics::counter!("homefix_quick_fix_total", "strategy" => "generative", "outcome" => "rate_limited")
                    .increment(1);
                debug!("Quick-fix rate limit reached, using fixed advisory");
                self.config.rate_limited_advisory.clone()
            }
            Err(e) => {
                metrics::counter!("homefix_quick_fix_total", "strategy" => "generative", "outcome" => "error")
                    .increment(1);
                warn!("Generative quick fix failed: {}", e);
                SAFE_FALLBACK_ADVISORY.to_string()
            }
        }
    }
}
