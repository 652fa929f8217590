//! Gap filling
//!
//! Covers every beat the greedy assignment left unassigned. Each maximal gap
//! picks one offset from:
//! - the default offset,
//! - the offsets of the top ranked [`OffsetScore`]s,
//! - the offsets implied by the beats most similar to the gap's first beat.
//!
//! Offsets whose phase agreement over the gap falls below the relaxed floor
//! are skipped; the rest score
//!
//! ```text
//! mean + 0.05 * phase + 0.015 * len + 0.02 * max - max(0, 0.4 * threshold - min)
//! ```
//!
//! When nothing qualifies the default offset is used unconditionally, so a
//! gap is never left open.

use super::assignment::AssignmentState;
use super::{evaluate_ring, OffsetScore, RingWindow};
use crate::analysis::result::{Segment, SegmentLabel};
use crate::config::CanonConfig;
use crate::similarity::SimilarityMatrix;

/// Fill every uncovered range of `state`
///
/// # Arguments
///
/// * `state` - Assignment arrays after greedy assignment
/// * `ssm` - Beat self-similarity matrix
/// * `phases` - Bar phase of every beat
/// * `offset_scores` - Ranked offsets (best first)
/// * `default_offset` - Offset used when no candidate qualifies
/// * `config` - Alignment configuration
///
/// # Returns
///
/// One `fallback` segment per gap, in track order.
pub fn fill_unassigned_ranges(
    state: &mut AssignmentState,
    ssm: &SimilarityMatrix,
    phases: &[usize],
    offset_scores: &[OffsetScore],
    default_offset: usize,
    config: &CanonConfig,
) -> Vec<Segment> {
    let n_beats = ssm.len();
    let mut segments = Vec::new();
    if n_beats < 2 {
        return segments;
    }
    let default_offset = default_offset.clamp(1, n_beats - 1);

    let gaps = state.uncovered_ranges();
    log::debug!("Gap filling: {} uncovered ranges", gaps.len());

    for (start, end) in gaps {
        let offsets = gap_offsets(ssm, start, offset_scores, default_offset, config);

        let mut best: Option<(usize, f32, RingWindow)> = None;
        for &offset in &offsets {
            let window = evaluate_ring(ssm, phases, start, end, offset);
            if window.phase_ratio < relaxed_phase_floor(end - start, config) {
                continue;
            }
            let score = gap_score(&window, end - start, config);
            if best.map_or(true, |(_, best_score, _)| score > best_score) {
                best = Some((offset, score, window));
            }
        }

        let (offset, window) = match best {
            Some((offset, _, window)) => (offset, window),
            None => {
                log::debug!(
                    "No offset qualified for gap [{}, {}), using default {}",
                    start,
                    end,
                    default_offset
                );
                (
                    default_offset,
                    evaluate_ring(ssm, phases, start, end, default_offset),
                )
            }
        };

        state.commit(ssm, start, end, offset);
        segments.push(Segment {
            start,
            end,
            offset,
            length: end - start,
            mean_similarity: window.stats.mean,
            median_similarity: window.stats.median,
            min_similarity: window.stats.min,
            max_similarity: window.stats.max,
            threshold: config.similarity_threshold,
            phase_alignment: window.phase_ratio,
            coverage_ratio: 1.0,
            score: window.stats.mean,
            label: SegmentLabel::Fallback,
        });
    }

    segments
}

/// Candidate offsets for a gap starting at `start`, in evaluation order
fn gap_offsets(
    ssm: &SimilarityMatrix,
    start: usize,
    offset_scores: &[OffsetScore],
    default_offset: usize,
    config: &CanonConfig,
) -> Vec<usize> {
    let n_beats = ssm.len();
    let weights = &config.weights;
    let mut offsets = vec![default_offset];
    let mut push = |offset: usize| {
        if !offsets.contains(&offset) {
            offsets.push(offset);
        }
    };

    for score in offset_scores.iter().take(weights.gap_top_offsets) {
        if score.offset > 0 && score.offset < n_beats {
            push(score.offset);
        }
    }

    for candidate in ssm
        .ranked_row(start)
        .into_iter()
        .take(weights.gap_similar_beats.min(n_beats))
    {
        if candidate == start {
            continue;
        }
        let offset = (candidate + n_beats - start) % n_beats;
        if offset != 0 {
            push(offset);
        }
    }

    offsets
}

/// Phase floor inside a gap; short gaps are floored further to avoid starving them
fn relaxed_phase_floor(length: usize, config: &CanonConfig) -> f32 {
    let weights = &config.weights;
    let relaxed = config.min_phase_alignment - weights.gap_phase_relaxation;
    if length <= config.min_pairs {
        relaxed.max(weights.gap_short_phase_floor)
    } else {
        relaxed
    }
}

fn gap_score(window: &RingWindow, length: usize, config: &CanonConfig) -> f32 {
    let weights = &config.weights;
    let stats = &window.stats;
    stats.mean
        + weights.gap_phase_weight * window.phase_ratio
        + weights.gap_length_weight * length as f32
        + weights.gap_max_weight * stats.max
        - (config.similarity_threshold * weights.gap_min_sim_factor - stats.min).max(0.0)
}
