//! Alignment orchestration over a finished self-similarity matrix
//!
//! Terminal states:
//! - **Degenerate**: one beat or fewer, no alignment (`None`)
//! - **Sequential fallback**: no admissible offset, every beat jumps to the next
//! - **Normal**: candidates, greedy assignment and gap filling cover every beat

use super::result::{
    AlignmentNotes, AlignmentResult, Coverage, JumpEdge, OffsetCandidate, RunInfo, Segment,
};
use crate::canon::assignment::{apply_canon_candidates, AssignmentState};
use crate::canon::candidates::collect_canon_candidates;
use crate::canon::gap_fill::fill_unassigned_ranges;
use crate::canon::loop_graph::compute_loop_candidates;
use crate::canon::offsets::{evaluate_offsets, is_bar_aligned};
use crate::canon::runs::detect_runs;
use crate::canon::{ring_target, OffsetScore};
use crate::config::CanonConfig;
use crate::features::stats;
use crate::similarity::{DiagonalCache, SimilarityMatrix};

const SEQUENTIAL_FALLBACK_MESSAGE: &str =
    "Fallback sequential offset applied due to insufficient similarity data.";

/// Compute the canon alignment from a self-similarity matrix
///
/// # Arguments
///
/// * `ssm` - Beat self-similarity matrix
/// * `phases` - Bar phase of every beat (same length as the matrix)
/// * `config` - Alignment configuration (assumed validated)
///
/// # Returns
///
/// `None` for one beat or fewer, otherwise a complete alignment.
pub fn align_similarity_matrix(
    ssm: &SimilarityMatrix,
    phases: &[usize],
    config: &CanonConfig,
) -> Option<AlignmentResult> {
    let n_beats = ssm.len();
    if n_beats <= 1 {
        log::debug!("Canon alignment skipped: {} beat(s)", n_beats);
        return None;
    }
    debug_assert_eq!(phases.len(), n_beats);

    let offsets = evaluate_offsets(ssm, phases, config);
    let loop_candidates = compute_loop_candidates(
        ssm,
        phases,
        config.loop_min_similarity(),
        config.max_neighbors,
        &config.weights,
    );

    if offsets.is_empty() {
        log::warn!(
            "No offset passed min_pairs={} / min_phase_alignment={:.2} over {} beats; using sequential fallback",
            config.min_pairs,
            config.min_phase_alignment,
            n_beats
        );
        return Some(sequential_fallback(ssm, phases, config, loop_candidates));
    }

    let top = &offsets[..offsets.len().min(config.top_candidates)];
    let default_offset = choose_default_offset(top, config.beats_per_bar);
    log::debug!("Default offset: {} beats", default_offset);

    let mut cache = DiagonalCache::new(ssm);
    let candidates = collect_canon_candidates(&mut cache, top, config);

    let mut state = AssignmentState::new(n_beats);
    let primary = apply_canon_candidates(&candidates, ssm, phases, config, &mut state);
    let fallback = fill_unassigned_ranges(&mut state, ssm, phases, top, default_offset, config);

    let mut forced = 0usize;
    for idx in 0..n_beats {
        if state.target[idx].is_none() {
            state.commit(ssm, idx, idx + 1, default_offset);
            forced += 1;
        }
    }
    if forced > 0 {
        log::warn!("Force-assigned {} beats via default offset {}", forced, default_offset);
    }

    let coverage_ratio = state.coverage_ratio();
    let uncovered = state.covered.iter().filter(|&&c| !c).count();
    let pairs: Vec<usize> = state.target.iter().flatten().copied().collect();
    debug_assert_eq!(pairs.len(), n_beats);
    let pair_similarity = state.similarity;

    let runs: Vec<RunInfo> = detect_runs(
        cache.get(default_offset),
        config.similarity_threshold,
        config.min_pairs,
    )
    .into_iter()
    .map(|run| RunInfo {
        start: run.start,
        end: run.end,
        length: run.len(),
    })
    .collect();

    let notes = AlignmentNotes {
        candidate_count: Some(candidates.len()),
        primary_segments: Some(primary.len()),
        fallback_segments: Some(fallback.len()),
        overall_similarity: Some(stats::mean(&pair_similarity)),
        ..AlignmentNotes::default()
    };

    let mut segments: Vec<Segment> = primary.into_iter().chain(fallback).collect();
    segments.sort_by_key(|s| (s.start, s.offset));

    log::debug!(
        "Canon alignment: offset={}, {} segments, coverage={:.3}, {} loop edges",
        default_offset,
        segments.len(),
        coverage_ratio,
        loop_candidates.len()
    );

    Some(AlignmentResult {
        offset: default_offset,
        beats_per_bar: config.beats_per_bar,
        context_window: config.context_window,
        similarity_threshold: config.similarity_threshold,
        min_phase_alignment: config.min_phase_alignment,
        min_pairs: config.min_pairs,
        offset_candidates: top.iter().map(OffsetCandidate::from).collect(),
        runs,
        coverage: Coverage {
            ratio: coverage_ratio,
            uncovered,
            segments: segments.len(),
        },
        segments,
        transitions: build_transitions(&pairs, &pair_similarity, config.weights.max_transitions),
        start_index: choose_start_index(phases, &pair_similarity),
        pairs,
        pair_similarity,
        loop_candidates,
        notes,
    })
}

/// Best bar-aligned offset among the top ranked, else the best overall
fn choose_default_offset(top: &[OffsetScore], beats_per_bar: usize) -> usize {
    top.iter()
        .find(|s| is_bar_aligned(s.offset, beats_per_bar))
        .or_else(|| top.first())
        .map_or(1, |s| s.offset)
}

/// Every beat jumps to its successor (the last one wraps to the first)
fn sequential_fallback(
    ssm: &SimilarityMatrix,
    phases: &[usize],
    config: &CanonConfig,
    loop_candidates: Vec<JumpEdge>,
) -> AlignmentResult {
    let n_beats = ssm.len();
    let offset = 1;
    let pairs: Vec<usize> = (0..n_beats).map(|i| ring_target(i, offset, n_beats)).collect();
    let pair_similarity: Vec<f32> = pairs
        .iter()
        .enumerate()
        .map(|(src, &dst)| ssm.get(src, dst))
        .collect();

    AlignmentResult {
        offset,
        beats_per_bar: config.beats_per_bar,
        context_window: config.context_window,
        similarity_threshold: config.similarity_threshold,
        min_phase_alignment: config.min_phase_alignment,
        min_pairs: config.min_pairs,
        offset_candidates: Vec::new(),
        runs: Vec::new(),
        segments: Vec::new(),
        transitions: build_transitions(&pairs, &pair_similarity, config.weights.max_transitions),
        coverage: Coverage {
            ratio: 1.0,
            uncovered: 0,
            segments: 0,
        },
        loop_candidates,
        start_index: choose_start_index(phases, &pair_similarity),
        pairs,
        pair_similarity,
        notes: AlignmentNotes {
            message: Some(SEQUENTIAL_FALLBACK_MESSAGE.to_string()),
            ..AlignmentNotes::default()
        },
    }
}

/// Bar-start beat with the best jump similarity (all beats if no bar start)
///
/// Ties keep the earliest beat.
fn choose_start_index(phases: &[usize], pair_similarity: &[f32]) -> usize {
    let mut pool: Vec<usize> = (0..pair_similarity.len()).filter(|&i| phases[i] == 0).collect();
    if pool.is_empty() {
        pool = (0..pair_similarity.len()).collect();
    }
    let mut best: Option<usize> = None;
    for idx in pool {
        if best.map_or(true, |b| pair_similarity[idx] > pair_similarity[b]) {
            best = Some(idx);
        }
    }
    best.unwrap_or(0)
}

/// Outgoing canon edges per source beat, best first, capped per source
fn build_transitions(pairs: &[usize], pair_similarity: &[f32], cap: usize) -> Vec<JumpEdge> {
    let mut transitions = Vec::with_capacity(pairs.len());
    for (source, (&target, &similarity)) in pairs.iter().zip(pair_similarity).enumerate() {
        let mut outgoing = vec![JumpEdge {
            source,
            target,
            similarity,
        }];
        outgoing.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        outgoing.truncate(cap);
        transitions.extend(outgoing);
    }
    transitions
}
