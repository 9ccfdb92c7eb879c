//! Corten Tracehouse
//!
//! Browser trace analysis: trace normalization, navigation milestones, CPU
//! profile event synthesis and critical request chains.

pub use tracehouse_api::*;
