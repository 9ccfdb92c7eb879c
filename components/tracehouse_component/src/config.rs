//! Configuration for trace analysis

use critical_chains::ChainOptions;
use serde::{Deserialize, Serialize};
use trace_processor::{ProcessTraceOptions, TimeOriginDeterminationMethod, DEFAULT_RISK_PERCENTILES};

/// Default number of memoized analyses
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

/// Configuration for [`crate::TraceAnalyzer`]
///
/// Every field takes part in the cache fingerprint, so two analyzers with
/// different configurations never share results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// How the time origin of a capture is chosen
    time_origin_method: TimeOriginDeterminationMethod,

    /// Percentiles reported by the responsiveness estimate
    risk_percentiles: Vec<f64>,

    /// Whether sampled CPU profiles are turned into trace events before processing
    synthesize_profiler_events: bool,

    /// Maximum number of memoized analyses (0 disables the cache)
    cache_capacity: usize,

    /// Critical chain options
    chain_options: ChainOptions,
}

impl AnalysisConfig {
    /// Create a new builder for AnalysisConfig
    ///
    /// # Example
    ///
    /// ```
    /// use tracehouse_component::AnalysisConfig;
    ///
    /// let config = AnalysisConfig::builder()
    ///     .cache_capacity(8)
    ///     .synthesize_profiler_events(false)
    ///     .build();
    /// ```
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Get the time origin method
    pub fn time_origin_method(&self) -> TimeOriginDeterminationMethod {
        self.time_origin_method
    }

    /// Get the reported risk percentiles
    pub fn risk_percentiles(&self) -> &[f64] {
        &self.risk_percentiles
    }

    /// Get whether profiler events are synthesized
    pub fn synthesize_profiler_events(&self) -> bool {
        self.synthesize_profiler_events
    }

    /// Get the cache capacity
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    /// Get the critical chain options
    pub fn chain_options(&self) -> &ChainOptions {
        &self.chain_options
    }

    /// Options passed to the trace processor
    pub fn process_trace_options(&self) -> ProcessTraceOptions {
        ProcessTraceOptions::with_method(self.time_origin_method)
    }
}

impl Default for AnalysisConfig {
    /// Default values:
    /// - time_origin_method: last navigation start
    /// - risk_percentiles: [0.5, 0.75, 0.9, 0.99, 1.0]
    /// - synthesize_profiler_events: true
    /// - cache_capacity: 32
    /// - chain_options: keep requests from before the time origin
    fn default() -> Self {
        Self {
            time_origin_method: TimeOriginDeterminationMethod::default(),
            risk_percentiles: DEFAULT_RISK_PERCENTILES.to_vec(),
            synthesize_profiler_events: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            chain_options: ChainOptions::default(),
        }
    }
}

/// Builder for AnalysisConfig
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfigBuilder {
    time_origin_method: Option<TimeOriginDeterminationMethod>,
    risk_percentiles: Option<Vec<f64>>,
    synthesize_profiler_events: Option<bool>,
    cache_capacity: Option<usize>,
    exclude_before_time_origin: Option<bool>,
}

impl AnalysisConfigBuilder {
    /// Set the time origin method
    pub fn time_origin_method(mut self, method: TimeOriginDeterminationMethod) -> Self {
        self.time_origin_method = Some(method);
        self
    }

    /// Set the reported risk percentiles
    ///
    /// # Arguments
    ///
    /// * `percentiles` - Fractions in `[0, 1]`, in any order
    pub fn risk_percentiles(mut self, percentiles: Vec<f64>) -> Self {
        self.risk_percentiles = Some(percentiles);
        self
    }

    /// Enable or disable profiler event synthesis
    pub fn synthesize_profiler_events(mut self, enabled: bool) -> Self {
        self.synthesize_profiler_events = Some(enabled);
        self
    }

    /// Set the maximum number of memoized analyses
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Drop network requests that started before the time origin
    pub fn exclude_before_time_origin(mut self, exclude: bool) -> Self {
        self.exclude_before_time_origin = Some(exclude);
        self
    }

    /// Build the AnalysisConfig
    pub fn build(self) -> AnalysisConfig {
        let defaults = AnalysisConfig::default();

        AnalysisConfig {
            time_origin_method: self.time_origin_method.unwrap_or(defaults.time_origin_method),
            risk_percentiles: self.risk_percentiles.unwrap_or(defaults.risk_percentiles),
            synthesize_profiler_events: self
                .synthesize_profiler_events
                .unwrap_or(defaults.synthesize_profiler_events),
            cache_capacity: self.cache_capacity.unwrap_or(defaults.cache_capacity),
            chain_options: ChainOptions {
                exclude_before_time_origin: self
                    .exclude_before_time_origin
                    .unwrap_or(defaults.chain_options.exclude_before_time_origin),
            },
        }
    }
}
