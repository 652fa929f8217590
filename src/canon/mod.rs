//! Canon alignment stages
//!
//! Turns the beat self-similarity matrix into a jump target for every beat:
//! - Offset scoring (stability + bar-phase alignment)
//! - Run detection along one offset diagonal
//! - Candidate collection over relaxed thresholds
//! - Greedy segment assignment
//! - Gap filling for beats left uncovered
//! - Loop candidate graph for free-jump playback

pub mod assignment;
pub mod candidates;
pub mod gap_fill;
pub mod loop_graph;
pub mod offsets;
pub mod runs;

use crate::features::stats::WindowStats;
use crate::similarity::SimilarityMatrix;

/// Score of one candidate jump distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetScore {
    /// Jump distance in beats
    pub offset: usize,

    /// Mean similarity along the offset diagonal
    pub mean: f32,

    /// Standard deviation along the offset diagonal
    pub std: f32,

    /// Number of beat pairs on the diagonal
    pub length: usize,

    /// Fraction of pairs whose beats share the same bar phase
    pub phase_alignment: f32,

    /// Fraction of pairs at or above the similarity threshold
    pub high_similarity_ratio: f32,
}

/// A contiguous beat range that can jump by `offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonCandidate {
    /// Jump distance in beats
    pub offset: usize,

    /// First beat of the range
    pub start: usize,

    /// One past the last beat of the range
    pub end: usize,

    /// Threshold the run was detected at
    pub threshold: f32,

    /// Mean similarity over the run
    pub mean_similarity: f32,

    /// Median similarity over the run
    pub median_similarity: f32,

    /// Minimum similarity over the run
    pub min_similarity: f32,

    /// Maximum similarity over the run
    pub max_similarity: f32,

    /// Composite ranking score
    pub score: f32,
}

impl CanonCandidate {
    /// Number of beats in the range
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True for an empty range
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wraparound jump target of `idx` by `offset` on a ring of `n_beats`
#[inline]
pub(crate) fn ring_target(idx: usize, offset: usize, n_beats: usize) -> usize {
    (idx + offset) % n_beats
}

/// Similarity and phase agreement of a beat range jumping by `offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RingWindow {
    pub stats: WindowStats,
    pub phase_ratio: f32,
}

/// Evaluate `[start, end)` against its wraparound targets
///
/// Reads the SSM directly (targets past the track end wrap to its start, so
/// the cached diagonals do not apply).
pub(crate) fn evaluate_ring(
    ssm: &SimilarityMatrix,
    phases: &[usize],
    start: usize,
    end: usize,
    offset: usize,
) -> RingWindow {
    let n_beats = ssm.len();
    let mut sims = Vec::with_capacity(end - start);
    let mut phase_matches = 0usize;
    for idx in start..end {
        let dst = ring_target(idx, offset, n_beats);
        sims.push(ssm.get(idx, dst));
        if phases[idx] == phases[dst] {
            phase_matches += 1;
        }
    }
    let length = (end - start).max(1) as f32;
    RingWindow {
        stats: WindowStats::from_values(&sims),
        phase_ratio: phase_matches as f32 / length,
    }
}
