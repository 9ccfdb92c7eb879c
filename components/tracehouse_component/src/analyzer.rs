//! TraceAnalyzer implementation
//!
//! Runs the full pipeline for one capture: profile collection and event
//! synthesis, trace processing, navigation milestones, the responsiveness
//! estimate and critical request chains.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use cpu_profile_model::{CpuProfile, CpuProfileModel};
use critical_chains::{CriticalChains, CriticalRequestChainBuilder, NavigationContext};
use trace_processor::{ProcessedNavigation, ProcessedTrace, RiskPercentile, TraceProcessor};
use trace_types::{ErrorReport, NetworkRecord, TraceLog};

use crate::cache::{fingerprint, AnalysisCache, CacheStats};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// Length of the responsiveness window after the first meaningful paint (ms)
pub const RISK_WINDOW_MS: f64 = 5000.0;

/// Everything derived from one capture
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// CPU profiles found in the log
    pub profiles: Vec<CpuProfile>,
    pub processed_trace: ProcessedTrace,
    /// Absent when the capture has no first contentful paint
    pub processed_navigation: Option<ProcessedNavigation>,
    /// Expected input latency over the responsiveness window
    pub risk_percentiles: Vec<RiskPercentile>,
    pub critical_chains: CriticalChains,
}

/// One capture for batch analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisInput {
    pub log: TraceLog,
    #[serde(default)]
    pub network_records: Vec<NetworkRecord>,
}

impl AnalysisInput {
    /// Create an input from a log and its network records
    pub fn new(log: TraceLog, network_records: Vec<NetworkRecord>) -> Self {
        Self { log, network_records }
    }
}

/// Per-input outcome of a batch
pub type BatchResult = std::result::Result<Arc<Analysis>, ErrorReport>;

/// Memoizing trace analyzer
///
/// Cloning is cheap; clones share the configuration and the cache.
#[derive(Debug, Clone)]
pub struct TraceAnalyzer {
    config: Arc<AnalysisConfig>,
    cache: Arc<AnalysisCache<Analysis>>,
}

impl TraceAnalyzer {
    /// Create an analyzer
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when a risk percentile is outside `[0, 1]`.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        if let Some(bad) = config
            .risk_percentiles()
            .iter()
            .find(|p| !(0.0..=1.0).contains(*p))
        {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "risk percentile {} is outside [0, 1]",
                bad
            )));
        }

        info!(
            "Creating trace analyzer (cache capacity {})",
            config.cache_capacity()
        );

        Ok(Self {
            cache: Arc::new(AnalysisCache::new(config.cache_capacity())),
            config: Arc::new(config),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Snapshot of the cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every memoized analysis
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Analyze a capture, reusing a memoized result for identical input
    pub fn analyze(&self, log: &TraceLog, network_records: &[NetworkRecord]) -> Result<Arc<Analysis>> {
        let key = fingerprint(&(log, network_records, self.config.as_ref()))?;
        if let Some(analysis) = self.cache.get(key) {
            return Ok(analysis);
        }

        let analysis = Arc::new(self.run(log, network_records)?);
        self.cache.insert(key, Arc::clone(&analysis));
        Ok(analysis)
    }

    /// Parse and analyze a JSON event log
    pub fn analyze_json(&self, json: &str, network_records: &[NetworkRecord]) -> Result<Arc<Analysis>> {
        let log = TraceLog::from_json_str(json)?;
        self.analyze(&log, network_records)
    }

    /// Analyze independent captures in parallel
    ///
    /// One result per input, in input order. A failing input does not affect
    /// the others; only a crashed worker fails the whole batch.
    pub async fn analyze_batch(&self, inputs: Vec<AnalysisInput>) -> Result<Vec<BatchResult>> {
        let total = inputs.len();
        let handles: Vec<_> = inputs
            .into_iter()
            .map(|input| {
                let analyzer = self.clone();
                tokio::task::spawn_blocking(move || analyzer.analyze(&input.log, &input.network_records))
            })
            .collect();

        let mut results = Vec::with_capacity(total);
        for (index, handle) in handles.into_iter().enumerate() {
            let outcome = handle
                .await
                .map_err(|e| AnalysisError::TaskFailed(e.to_string()))?;
            if let Err(error) = &outcome {
                warn!("Batch input {} failed: {}", index, error);
            }
            results.push(outcome.map_err(ErrorReport::from));
        }

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!("Analyzed batch of {} captures ({} failed)", total, failed);
        Ok(results)
    }

    fn run(&self, log: &TraceLog, network_records: &[NetworkRecord]) -> Result<Analysis> {
        let profiles = CpuProfileModel::collect_profile_events(log)?;

        let synthesized;
        let log = if self.config.synthesize_profiler_events() && !profiles.is_empty() {
            synthesized = CpuProfileModel::synthesize_events_for_log(log)?;
            &synthesized
        } else {
            log
        };

        let processed_trace =
            TraceProcessor::process_trace(log, &self.config.process_trace_options())?;

        let processed_navigation = match TraceProcessor::process_navigation(&processed_trace) {
            Ok(navigation) => Some(navigation),
            Err(error) if error.code().is_semantic_absence() => {
                warn!("Skipping navigation milestones: {}", error);
                None
            }
            Err(error) => return Err(error.into()),
        };

        let window_start = processed_navigation.as_ref().map_or(0.0, |navigation| {
            navigation
                .timings
                .first_meaningful_paint
                .unwrap_or(navigation.timings.first_contentful_paint)
        });
        let window_end = window_start + RISK_WINDOW_MS;
        let top_level_events =
            TraceProcessor::get_main_thread_top_level_events(&processed_trace, window_start, window_end);
        let risk_percentiles = TraceProcessor::get_risk_to_responsiveness(
            &top_level_events,
            window_start,
            window_end,
            self.config.risk_percentiles(),
        );

        let context = NavigationContext::from_processed_trace(&processed_trace);
        let critical_chains = CriticalRequestChainBuilder::build_with_options(
            network_records,
            &context,
            self.config.chain_options(),
        );

        debug!(
            "Analyzed capture: {} profiles, {} top-level tasks, {} critical chains",
            profiles.len(),
            top_level_events.len(),
            critical_chains.len()
        );

        Ok(Analysis {
            profiles,
            processed_trace,
            processed_navigation,
            risk_percentiles,
            critical_chains,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range_percentile() {
        let config = AnalysisConfig::builder().risk_percentiles(vec![0.5, 1.5]).build();
        let err = TraceAnalyzer::new(config).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let analyzer = TraceAnalyzer::new(AnalysisConfig::default()).unwrap();
        let err = analyzer.analyze_json("{not json", &[]).unwrap_err();
        assert_eq!(err.code(), trace_types::ErrorCode::InvalidTraceJson);
    }

    #[test]
    fn test_empty_log_has_no_tracing_started() {
        let analyzer = TraceAnalyzer::new(AnalysisConfig::default()).unwrap();
        let err = analyzer.analyze(&TraceLog::default(), &[]).unwrap_err();
        assert_eq!(err.code(), trace_types::ErrorCode::NoTracingStarted);
    }
}
