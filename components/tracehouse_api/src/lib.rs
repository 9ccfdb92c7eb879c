//! Public API for Corten Tracehouse
//!
//! This module provides a simple, ergonomic API for analyzing browser traces.
//! It wraps the lower-level `tracehouse_component` with a clean public
//! interface and re-exports the building blocks for callers that need a
//! single stage.
//!
//! # Example
//!
//! ```no_run
//! use tracehouse_api::{AnalysisConfig, Tracehouse};
//!
//! fn main() -> anyhow::Result<()> {
//!     let tracehouse = Tracehouse::new(AnalysisConfig::default())?;
//!     let analysis = tracehouse.analyze_file("trace.json", &[])?;
//!
//!     if let Some(navigation) = &analysis.processed_navigation {
//!         println!("FCP: {}ms", navigation.timings.first_contentful_paint);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

// Re-export public types from tracehouse_component
pub use tracehouse_component::{
    Analysis, AnalysisConfig, AnalysisConfigBuilder, AnalysisError, AnalysisInput, BatchResult,
    CacheStats, Result,
};

pub use cpu_profile_model::{CpuProfile, CpuProfileModel, KnownTask, SyntheticTaskEvent};
pub use critical_chains::{
    ChainOptions, CriticalChainNode, CriticalChains, CriticalRequestChainBuilder, NavigationContext,
};
pub use trace_processor::{
    ProcessTraceOptions, ProcessedNavigation, ProcessedTrace, RiskPercentile,
    TimeOriginDeterminationMethod, TraceProcessor,
};
pub use trace_types::{
    ErrorCode, ErrorReport, Initiator, NetworkRecord, TraceError, TraceEvent, TraceLog,
};

use tracehouse_component::TraceAnalyzer;

/// Main Tracehouse public API
///
/// This is the primary interface for analyzing captures. It provides a
/// simplified wrapper around the underlying TraceAnalyzer.
#[derive(Debug, Clone)]
pub struct Tracehouse {
    analyzer: TraceAnalyzer,
}

impl Tracehouse {
    /// Create a new Tracehouse instance with the given configuration
    ///
    /// # Example
    ///
    /// ```
    /// use tracehouse_api::{AnalysisConfig, Tracehouse};
    ///
    /// let tracehouse = Tracehouse::new(AnalysisConfig::default()).unwrap();
    /// ```
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        Ok(Self {
            analyzer: TraceAnalyzer::new(config)?,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &AnalysisConfig {
        self.analyzer.config()
    }

    /// Analyze a parsed event log
    pub fn analyze(&self, log: &TraceLog, network_records: &[NetworkRecord]) -> Result<Arc<Analysis>> {
        self.analyzer.analyze(log, network_records)
    }

    /// Analyze an event log given as JSON text
    pub fn analyze_json(&self, json: &str, network_records: &[NetworkRecord]) -> Result<Arc<Analysis>> {
        self.analyzer.analyze_json(json, network_records)
    }

    /// Read and analyze an event log file
    pub fn analyze_file(
        &self,
        path: impl AsRef<Path>,
        network_records: &[NetworkRecord],
    ) -> Result<Arc<Analysis>> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read trace file {}", path.display()))?;
        self.analyze_json(&json, network_records)
    }

    /// Analyze independent captures in parallel
    pub async fn analyze_batch(&self, inputs: Vec<AnalysisInput>) -> Result<Vec<BatchResult>> {
        self.analyzer.analyze_batch(inputs).await
    }

    /// Cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.analyzer.cache_stats()
    }
}
