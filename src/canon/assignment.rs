//! Greedy segment assignment
//!
//! Consumes ranked candidates in score order and claims beat ranges for them.
//! A candidate is accepted only if:
//! 1. at least 60% of its (clamped) range is still unassigned,
//! 2. its wraparound targets are phase-aligned at least `min_phase_alignment`,
//! 3. its mean similarity reaches `threshold * 0.75`, or its maximum reaches
//!    `threshold`.
//!
//! Rejected candidates are dropped, never retried. An accepted candidate only
//! claims the beats of its range that are still free, so beats keep the target
//! of the best candidate that reached them and segments never overlap. A range
//! split by earlier claims yields one segment per free sub-range.

use super::{evaluate_ring, ring_target, CanonCandidate};
use crate::analysis::result::{Segment, SegmentLabel};
use crate::config::CanonConfig;
use crate::similarity::SimilarityMatrix;

/// Per-beat assignment arrays owned by one alignment run
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentState {
    /// Jump target per beat (`None` = unassigned)
    pub target: Vec<Option<usize>>,

    /// SSM similarity between each beat and its target
    pub similarity: Vec<f32>,

    /// Whether the beat has been claimed by a segment
    pub covered: Vec<bool>,
}

impl AssignmentState {
    /// Fresh state with every beat unassigned
    pub fn new(n_beats: usize) -> Self {
        Self {
            target: vec![None; n_beats],
            similarity: vec![0.0; n_beats],
            covered: vec![false; n_beats],
        }
    }

    /// Number of beats
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// True for an empty track
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Assign every beat of `[start, end)` its wraparound target by `offset`
    pub fn commit(&mut self, ssm: &SimilarityMatrix, start: usize, end: usize, offset: usize) {
        let n_beats = self.len();
        for idx in start..end {
            let dst = ring_target(idx, offset, n_beats);
            self.target[idx] = Some(dst);
            self.similarity[idx] = ssm.get(idx, dst);
            self.covered[idx] = true;
        }
    }

    /// Count of beats not yet covered in `[start, end)`
    pub fn free_in(&self, start: usize, end: usize) -> usize {
        self.covered[start..end].iter().filter(|&&c| !c).count()
    }

    /// Maximal ranges `[start, end)` of uncovered beats
    pub fn uncovered_ranges(&self) -> Vec<(usize, usize)> {
        self.uncovered_ranges_in(0, self.len())
    }

    /// Maximal uncovered ranges inside `[start, end)`
    pub fn uncovered_ranges_in(&self, start: usize, end: usize) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        let mut open: Option<usize> = None;
        for idx in start..end {
            match (self.covered[idx], open) {
                (false, None) => open = Some(idx),
                (true, Some(from)) => {
                    ranges.push((from, idx));
                    open = None;
                }
                _ => {}
            }
        }
        if let Some(from) = open {
            ranges.push((from, end));
        }
        ranges
    }

    /// Fraction of covered beats
    pub fn coverage_ratio(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        self.covered.iter().filter(|&&c| c).count() as f32 / self.len() as f32
    }
}

/// Apply ranked candidates to the assignment state
///
/// # Arguments
///
/// * `candidates` - Candidates sorted by score, highest first
/// * `ssm` - Beat self-similarity matrix
/// * `phases` - Bar phase of every beat
/// * `config` - Alignment configuration
/// * `state` - Assignment arrays to fill
///
/// # Returns
///
/// One `primary` segment per accepted candidate, in acceptance order.
pub fn apply_canon_candidates(
    candidates: &[CanonCandidate],
    ssm: &SimilarityMatrix,
    phases: &[usize],
    config: &CanonConfig,
    state: &mut AssignmentState,
) -> Vec<Segment> {
    let n_beats = ssm.len();
    let weights = &config.weights;
    let threshold = config.similarity_threshold;
    let mut segments = Vec::new();
    if n_beats == 0 {
        return segments;
    }

    for cand in candidates {
        if cand.offset == 0 {
            continue;
        }
        let start = cand.start.min(n_beats - 1);
        let end = cand.end.min(n_beats).max(start + 1);
        let length = end - start;
        if length < config.min_pairs {
            continue;
        }

        let free = state.free_in(start, end);
        if free == 0 {
            continue;
        }
        let coverage_ratio = free as f32 / length as f32;
        if coverage_ratio < weights.min_free_ratio {
            continue;
        }

        let window = evaluate_ring(ssm, phases, start, end, cand.offset);
        if window.phase_ratio < config.min_phase_alignment {
            continue;
        }
        let stats = &window.stats;
        if stats.mean < threshold * weights.assign_mean_factor && stats.max < threshold {
            continue;
        }

        let pieces = state.uncovered_ranges_in(start, end);
        for (piece_start, piece_end) in pieces {
            // Split pieces are re-measured over their own beats
            let piece = if (piece_start, piece_end) == (start, end) {
                window
            } else {
                evaluate_ring(ssm, phases, piece_start, piece_end, cand.offset)
            };
            state.commit(ssm, piece_start, piece_end, cand.offset);
            segments.push(Segment {
                start: piece_start,
                end: piece_end,
                offset: cand.offset,
                length: piece_end - piece_start,
                mean_similarity: piece.stats.mean,
                median_similarity: piece.stats.median,
                min_similarity: piece.stats.min,
                max_similarity: piece.stats.max,
                threshold: cand.threshold,
                phase_alignment: piece.phase_ratio,
                coverage_ratio,
                score: cand.score,
                label: SegmentLabel::Primary,
            });
        }
    }

    log::debug!(
        "Segment assignment: accepted {} of {} candidates, coverage={:.3}",
        segments.len(),
        candidates.len(),
        state.coverage_ratio()
    );

    segments
}
