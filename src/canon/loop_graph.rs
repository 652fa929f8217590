//! Loop candidate graph
//!
//! A dense, non-exclusive jump graph for free-form playback, built straight
//! from the SSM and independent of the canon assignment.
//!
//! For each source beat the other beats are visited best-first. Self jumps,
//! adjacent beats (`|dst - src| <= 1`) and beats in a different bar phase are
//! skipped. Edges are kept while they reach the beat's dynamic floor (20th
//! percentile of its top-16 similarities, never below the global minimum), up
//! to `max_neighbors`. Until `max(2, max_neighbors / 2)` edges exist,
//! below-floor edges are admitted as well so no beat is left without a jump.

use super::offsets::is_bar_aligned;
use crate::analysis::result::JumpEdge;
use crate::config::ScoringWeights;
use crate::features::stats;
use crate::similarity::SimilarityMatrix;

/// Build the loop candidate edge list
///
/// # Arguments
///
/// * `ssm` - Beat self-similarity matrix
/// * `phases` - Bar phase of every beat
/// * `min_similarity` - Global similarity floor
/// * `max_neighbors` - Maximum edges per source beat
/// * `weights` - Neighbourhood size and percentile of the dynamic floor
///
/// # Returns
///
/// Edges grouped by source beat, each group ordered best-first.
pub fn compute_loop_candidates(
    ssm: &SimilarityMatrix,
    phases: &[usize],
    min_similarity: f32,
    max_neighbors: usize,
    weights: &ScoringWeights,
) -> Vec<JumpEdge> {
    let n_beats = ssm.len();
    let mut edges = Vec::new();
    if n_beats == 0 {
        return edges;
    }

    let min_similarity = min_similarity.max(-1.0);
    let escape = (max_neighbors / 2).max(2);

    for src in 0..n_beats {
        let row = ssm.row(src);
        let ranked = ssm.ranked_row(src);

        let top_k = weights.loop_top_k.min(ranked.len());
        let neighbourhood: Vec<f32> = ranked[..top_k]
            .iter()
            .filter(|&&i| i != src)
            .map(|&i| row[i])
            .collect();
        let dynamic_floor = if neighbourhood.is_empty() {
            -1.0
        } else {
            stats::percentile(&neighbourhood, weights.loop_floor_percentile)
        }
        .max(min_similarity);

        let mut added = 0usize;
        for dst in ranked {
            if dst.abs_diff(src) <= 1 {
                continue;
            }
            if phases[src] != phases[dst] {
                continue;
            }
            let similarity = row[dst];
            if similarity < dynamic_floor && added >= escape {
                continue;
            }
            edges.push(JumpEdge {
                source: src,
                target: dst,
                similarity,
            });
            added += 1;
            if added >= max_neighbors {
                break;
            }
        }
    }

    log::debug!(
        "Loop graph: {} edges over {} beats (max_neighbors={})",
        edges.len(),
        n_beats,
        max_neighbors
    );

    edges
}

/// Share of loop edges whose jump distance spans whole bars
pub fn bar_aligned_share(edges: &[JumpEdge], beats_per_bar: usize) -> f32 {
    if edges.is_empty() {
        return 0.0;
    }
    let aligned = edges
        .iter()
        .filter(|e| is_bar_aligned(e.source.abs_diff(e.target), beats_per_bar))
        .count();
    aligned as f32 / edges.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn phases(n: usize) -> Vec<usize> {
        (0..n).map(|i| i % 4).collect()
    }

    #[test]
    fn test_no_self_or_adjacent_edges() {
        let ssm = SimilarityMatrix::from_array(Array2::from_elem((16, 16), 0.9));
        let edges = compute_loop_candidates(&ssm, &vec![0; 16], 0.4, 8, &ScoringWeights::default());
        assert!(!edges.is_empty());
        for edge in &edges {
            assert_ne!(edge.source, edge.target);
            assert!(edge.source.abs_diff(edge.target) > 1);
        }
    }

    #[test]
    fn test_same_phase_only_and_capped() {
        let n = 40;
        let ssm = SimilarityMatrix::from_array(Array2::from_shape_fn((n, n), |(i, j)| {
            if i % 4 == j % 4 {
                0.9
            } else {
                0.95
            }
        }));
        let edges = compute_loop_candidates(&ssm, &phases(n), 0.4, 8, &ScoringWeights::default());
        assert!(edges.iter().all(|e| e.source % 4 == e.target % 4));
        for src in 0..n {
            let count = edges.iter().filter(|e| e.source == src).count();
            assert!(count <= 8);
        }
        assert!((bar_aligned_share(&edges, 4) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_anti_starvation_admits_below_floor_edges() {
        // Everything is dissimilar: no edge reaches the floor
        let n = 16;
        let ssm = SimilarityMatrix::from_array(Array2::zeros((n, n)));
        let edges = compute_loop_candidates(&ssm, &phases(n), 0.4, 8, &ScoringWeights::default());
        for src in 0..n {
            let count = edges.iter().filter(|e| e.source == src).count();
            // max(2, 8 / 2) = 4 escape edges, 3 same-phase beats available
            assert_eq!(count, 3);
        }
    }

    #[test]
    fn test_edges_ordered_best_first_per_source() {
        let n = 20;
        let ssm = SimilarityMatrix::from_array(Array2::from_shape_fn((n, n), |(i, j)| {
            if i % 4 == j % 4 {
                1.0 - (i.abs_diff(j) as f32) * 0.01
            } else {
                0.0
            }
        }));
        let edges = compute_loop_candidates(&ssm, &phases(n), 0.4, 8, &ScoringWeights::default());
        let from_zero: Vec<&JumpEdge> = edges.iter().filter(|e| e.source == 0).collect();
        assert_eq!(from_zero[0].target, 4);
        for pair in from_zero.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn test_empty_matrix() {
        let ssm = SimilarityMatrix::from_array(Array2::zeros((0, 0)));
        assert!(compute_loop_candidates(&ssm, &[], 0.4, 8, &ScoringWeights::default()).is_empty());
    }
}
