//! Alignment orchestration and result types
//!
//! Combines the canon stages into a complete per-track alignment:
//! - Orchestration state machine (degenerate / sequential fallback / normal)
//! - Batch analysis over many tracks
//! - Serializable result types

pub mod alignment;
pub mod batch;
pub mod result;
