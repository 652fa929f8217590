//! Offset scoring
//!
//! Scores every jump distance by how stable and how bar-phase aligned its SSM
//! diagonal is.
//!
//! # Algorithm
//!
//! For every offset in `[1, n_beats)`:
//! 1. Take the diagonal `(i, i + offset)`; reject it below `min_pairs` pairs
//! 2. Reject it if fewer than `min_phase_alignment` of its pairs share a phase
//! 3. Record mean, std and the share of pairs at/above the threshold
//!
//! Survivors are ranked by `mean - 0.4 * std` (+0.05 for bar-aligned offsets),
//! then high-similarity ratio, then phase alignment. Equal keys keep
//! ascending offset order.

use super::OffsetScore;
use crate::config::CanonConfig;
use crate::features::stats;
use crate::similarity::SimilarityMatrix;
use std::cmp::Ordering;

/// Score and rank all admissible offsets
///
/// # Arguments
///
/// * `ssm` - Beat self-similarity matrix
/// * `phases` - Bar phase of every beat
/// * `config` - Alignment configuration
///
/// # Returns
///
/// Ranked offset scores, best first. Empty when no offset passes the
/// pair-count and phase filters.
pub fn evaluate_offsets(
    ssm: &SimilarityMatrix,
    phases: &[usize],
    config: &CanonConfig,
) -> Vec<OffsetScore> {
    let n_beats = ssm.len();
    let mut scores = Vec::new();

    for offset in 1..n_beats {
        let diag = ssm.diagonal(offset);
        if diag.len() < config.min_pairs {
            continue;
        }

        let pairs = diag.len() as f32;
        let phase_matches = (0..diag.len())
            .filter(|&i| phases[i] == phases[i + offset])
            .count();
        let phase_alignment = phase_matches as f32 / pairs;
        if phase_alignment < config.min_phase_alignment {
            continue;
        }

        let high_sim = diag
            .iter()
            .filter(|&&v| v >= config.similarity_threshold)
            .count();

        scores.push(OffsetScore {
            offset,
            mean: stats::mean(&diag),
            std: stats::std_dev(&diag),
            length: diag.len(),
            phase_alignment,
            high_similarity_ratio: high_sim as f32 / pairs,
        });
    }

    scores.sort_by(|a, b| compare_rank(b, a, config));

    log::debug!(
        "Offset evaluation: {} of {} offsets admissible{}",
        scores.len(),
        n_beats.saturating_sub(1),
        scores
            .first()
            .map(|s| format!(", best={} (mean={:.3})", s.offset, s.mean))
            .unwrap_or_default()
    );

    scores
}

/// Primary ranking key: stability plus the bar-alignment bonus
pub fn stability_key(score: &OffsetScore, config: &CanonConfig) -> f32 {
    let weights = &config.weights;
    let bar_bonus = if is_bar_aligned(score.offset, config.beats_per_bar) {
        weights.bar_aligned_bonus
    } else {
        0.0
    };
    score.mean - weights.offset_std_penalty * score.std + bar_bonus
}

/// True if `offset` spans a whole number of bars
pub fn is_bar_aligned(offset: usize, beats_per_bar: usize) -> bool {
    beats_per_bar > 0 && offset % beats_per_bar == 0
}

fn compare_rank(a: &OffsetScore, b: &OffsetScore, config: &CanonConfig) -> Ordering {
    stability_key(a, config)
        .total_cmp(&stability_key(b, config))
        .then(a.high_similarity_ratio.total_cmp(&b.high_similarity_ratio))
        .then(a.phase_alignment.total_cmp(&b.phase_alignment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// SSM where beats with equal `period` residue are identical and others orthogonal
    fn periodic_ssm(n: usize, period: usize) -> SimilarityMatrix {
        let values = Array2::from_shape_fn((n, n), |(i, j)| if i % period == j % period { 1.0 } else { 0.0 });
        SimilarityMatrix::from_array(values)
    }

    fn phases(n: usize, beats_per_bar: usize) -> Vec<usize> {
        (0..n).map(|i| i % beats_per_bar).collect()
    }

    #[test]
    fn test_periodic_offset_wins() {
        let ssm = periodic_ssm(12, 4);
        let config = CanonConfig::default();
        let scores = evaluate_offsets(&ssm, &phases(12, 4), &config);

        // Only offset 4 has >= 6 pairs and full phase alignment
        assert_eq!(scores.len(), 1);
        let best = scores[0];
        assert_eq!(best.offset, 4);
        assert_eq!(best.length, 8);
        assert!((best.phase_alignment - 1.0).abs() < 1e-6);
        assert!((best.mean - 1.0).abs() < 1e-6);
        assert!((best.high_similarity_ratio - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_min_pairs_filter() {
        let ssm = periodic_ssm(3, 4);
        let scores = evaluate_offsets(&ssm, &phases(3, 4), &CanonConfig::default());
        assert!(scores.is_empty());
    }

    #[test]
    fn test_phase_filter_can_be_relaxed() {
        let ssm = periodic_ssm(16, 4);
        let config = CanonConfig {
            min_phase_alignment: 0.0,
            ..CanonConfig::default()
        };
        let scores = evaluate_offsets(&ssm, &phases(16, 4), &config);
        // offsets 1..=10 have >= 6 pairs
        assert_eq!(scores.len(), 10);
        // bar-aligned perfect offsets rank first, smaller offset first on ties
        assert_eq!(scores[0].offset, 4);
        assert_eq!(scores[1].offset, 8);
    }

    #[test]
    fn test_bar_bonus_breaks_near_ties() {
        let config = CanonConfig::default();
        let aligned = OffsetScore {
            offset: 8,
            mean: 0.80,
            std: 0.0,
            length: 10,
            phase_alignment: 1.0,
            high_similarity_ratio: 0.5,
        };
        let unaligned = OffsetScore {
            offset: 6,
            mean: 0.83,
            ..aligned
        };
        assert!(stability_key(&aligned, &config) > stability_key(&unaligned, &config));
        assert!(is_bar_aligned(8, 4));
        assert!(!is_bar_aligned(6, 4));
    }
}
