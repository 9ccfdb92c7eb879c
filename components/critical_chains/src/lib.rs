//! Critical request chains
//!
//! Reconstructs the initiator forest of a page load's network requests and keeps
//! the part of it that blocked the main frame's rendering.
//!
//! # Features
//!
//! - **Initiator resolution**: redirects, explicit initiator requests and
//!   initiator URLs, preferring requests of the same frame
//! - **Eligibility**: favicons, link preloads, unfinished requests and other
//!   frames' requests never appear
//! - **Pruning**: requests below an excluded or `data:` request are dropped
//! - **Determinism**: the chains do not depend on input order

mod builder;
mod eligibility;
mod types;

pub use builder::CriticalRequestChainBuilder;
pub use eligibility::{is_eligible, is_favicon};
pub use types::*;
