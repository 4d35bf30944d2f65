//! Hybrid orchestrator: decision gate, identity merge, rescoring, ranking.
//!
//! Runs the local stage, decides whether the remote stage is needed,
//! deduplicates both result sets by identity key with additive
//! enrichment, and returns a ranked list that prefers verified data when
//! scores are comparable.

pub mod identity;
pub mod merge;
pub mod ranking;
pub mod resolve;

pub use resolve::{Resolution, Resolver};
