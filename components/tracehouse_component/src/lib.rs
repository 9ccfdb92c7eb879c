//! Trace analysis orchestration
//!
//! This module provides the TraceAnalyzer that runs every analysis stage over a
//! captured event log and its network records, memoizing results per input.
//!
//! # Example
//!
//! ```no_run
//! use tracehouse_component::{AnalysisConfig, TraceAnalyzer};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let analyzer = TraceAnalyzer::new(AnalysisConfig::default())?;
//!     let json = std::fs::read_to_string("trace.json")?;
//!     let analysis = analyzer.analyze_json(&json, &[])?;
//!     println!("time origin: {}", analysis.processed_trace.timestamps.time_origin);
//!     Ok(())
//! }
//! ```

mod analyzer;
mod cache;
mod config;
mod error;

pub use analyzer::{Analysis, AnalysisInput, BatchResult, TraceAnalyzer, RISK_WINDOW_MS};
pub use cache::{fingerprint, AnalysisCache, CacheStats, Fingerprint};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, DEFAULT_CACHE_CAPACITY};
pub use error::{AnalysisError, Result};
