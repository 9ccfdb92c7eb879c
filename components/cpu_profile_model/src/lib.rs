//! CPU profile model
//!
//! Rebuilds `Profile`/`ProfileChunk` fragments into complete sampled profiles
//! and converts them into begin/end function-call events.
//!
//! # Features
//!
//! - **Fragment merging**: fragments stitched by id in any arrival order
//! - **Validation**: length, node reference and parent-cycle checks
//! - **Synthesis**: stack diffing with linear-time refinement against known tasks

mod collect;
mod model;
mod synthesize;
mod types;

pub use collect::validate_profile;
pub use model::CpuProfileModel;
pub use types::*;
