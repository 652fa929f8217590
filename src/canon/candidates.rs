//! Candidate collection
//!
//! Extracts contiguous high-similarity runs for the best offsets and ranks
//! them as [`CanonCandidate`]s.
//!
//! # Algorithm
//!
//! For each offset, try the nominal threshold shifted by each configured
//! step (strictest first, floored at 0.2). Every run found scores
//!
//! ```text
//! mean * (1 + 0.12 * ln(1 + len)) + 0.05 * max - 0.03 * std + 0.08 * high_ratio * len
//! ```
//!
//! and runs found below the nominal threshold are multiplied by 0.92. The
//! best 16 per offset are kept, then the 128 best overall.

use super::runs::detect_runs;
use super::{CanonCandidate, OffsetScore};
use crate::config::CanonConfig;
use crate::features::stats::WindowStats;
use crate::similarity::DiagonalCache;

/// Collect and rank canon candidates
///
/// # Arguments
///
/// * `cache` - Diagonal cache over the track SSM
/// * `offset_scores` - Offsets to explore (already bounded to `top_candidates`)
/// * `config` - Alignment configuration
///
/// # Returns
///
/// Candidates sorted by score, highest first. Equal scores keep discovery order.
pub fn collect_canon_candidates(
    cache: &mut DiagonalCache<'_>,
    offset_scores: &[OffsetScore],
    config: &CanonConfig,
) -> Vec<CanonCandidate> {
    let n_beats = cache.matrix().len();
    let weights = &config.weights;
    let thresholds = threshold_levels(config);

    log::debug!(
        "Collecting candidates over {} offsets at thresholds {:?}",
        offset_scores.len(),
        thresholds
    );

    let mut pool = Vec::new();
    for score in offset_scores {
        let offset = score.offset;
        if offset == 0 || offset >= n_beats {
            continue;
        }
        let diag = cache.get(offset);
        if diag.len() < config.min_pairs {
            continue;
        }

        let mut per_offset = Vec::new();
        for &threshold in &thresholds {
            for run in detect_runs(diag, threshold, config.min_pairs) {
                let window = &diag[run.start..run.end];
                let stats = WindowStats::from_values(window);
                let length = run.len() as f32;

                let mut run_score = stats.mean * (1.0 + weights.run_length_gain * length.ln_1p())
                    + weights.run_max_weight * stats.max
                    - weights.run_std_penalty * stats.std
                    + weights.run_high_ratio_gain * score.high_similarity_ratio * length;
                if threshold < config.similarity_threshold {
                    run_score *= weights.relaxed_penalty;
                }

                per_offset.push(CanonCandidate {
                    offset,
                    start: run.start,
                    end: run.end,
                    threshold,
                    mean_similarity: stats.mean,
                    median_similarity: stats.median,
                    min_similarity: stats.min,
                    max_similarity: stats.max,
                    score: run_score,
                });
            }
        }

        sort_by_score(&mut per_offset);
        per_offset.truncate(weights.max_candidates_per_offset);
        pool.extend(per_offset);
    }

    sort_by_score(&mut pool);
    pool.truncate(weights.max_candidates_total);

    log::debug!("Collected {} canon candidates", pool.len());

    pool
}

/// Threshold levels to try, strictest first
///
/// Levels are rounded to three decimals, floored at the configured minimum
/// and deduplicated.
pub fn threshold_levels(config: &CanonConfig) -> Vec<f32> {
    let weights = &config.weights;
    let mut levels: Vec<f32> = weights
        .threshold_steps
        .iter()
        .map(|step| {
            let raw = ((config.similarity_threshold + step) * 1000.0).round() / 1000.0;
            raw.max(weights.threshold_floor)
        })
        .collect();
    levels.sort_by(|a, b| b.total_cmp(a));
    levels.dedup();
    levels
}

fn sort_by_score(candidates: &mut [CanonCandidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}
