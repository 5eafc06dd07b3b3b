//! Prometheus metrics.
//!
//! Counters and histograms are recorded through the `metrics` facade from
//! wherever they happen. This module installs the process-wide recorder once
//! and renders the scrape body for `GET /metrics`.

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::config::MetricsSection;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics settings.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl From<&MetricsSection> for MetricsConfig {
    fn from(section: &MetricsSection) -> Self {
        Self {
            enabled: section.enabled,
        }
    }
}

/// Handle onto the installed Prometheus recorder.
#[derive(Clone)]
pub struct MetricsService {
    handle: Option<PrometheusHandle>,
}

impl MetricsService {
    /// Install the recorder (first call only) and describe the service metrics.
    pub fn new(config: MetricsConfig) -> Self {
        if !config.enabled {
            return Self { handle: None };
        }

        let handle = match PROMETHEUS_HANDLE.get() {
            Some(existing) => Some(existing.clone()),
            None => match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => {
                    let _ = PROMETHEUS_HANDLE.set(handle);
                    describe();
                    info!("Prometheus recorder installed");
                    PROMETHEUS_HANDLE.get().cloned()
                }
                Err(e) => {
                    // Another recorder won the race, or one was installed elsewhere
                    warn!("Failed to install prometheus recorder: {}", e);
                    PROMETHEUS_HANDLE.get().cloned()
                }
            },
        };

        Self { handle }
    }

    /// Disabled service; `render` returns an empty body.
    pub fn disabled() -> Self {
        Self { handle: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle
            .as_ref()
            .map(PrometheusHandle::render)
            .unwrap_or_default()
    }
}

fn describe() {
    describe_counter!(
        "homefix_analyze_requests_total",
        "Problems analyzed, labelled by category and whether the corpus matched"
    );
    describe_counter!(
        "homefix_directory_fallback_total",
        "Worker lookups answered from the static table, labelled by reason"
    );
    describe_counter!(
        "homefix_quick_fix_total",
        "Quick-fix advisories produced, labelled by strategy and outcome"
    );
    describe_counter!(
        "homefix_workers_seeded_total",
        "Workers written by the seed operation"
    );
    describe_histogram!(
        "homefix_match_duration_seconds",
        Unit::Seconds,
        "Time spent embedding and matching a problem"
    );
}
