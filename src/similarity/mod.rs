//! Beat self-similarity
//!
//! - Cosine self-similarity matrix over stacked beat descriptors
//! - Per-call diagonal cache keyed by offset

pub mod diagonal;
pub mod ssm;

pub use diagonal::DiagonalCache;
pub use ssm::SimilarityMatrix;
