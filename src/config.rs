//! Configuration parameters for canon alignment

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// Canon alignment configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonConfig {
    // Musical grid
    /// Beats per bar used to derive beat phase (default: 4)
    pub beats_per_bar: usize,

    /// Number of beats (current beat included) concatenated into each
    /// stacked descriptor (default: 5)
    pub context_window: usize,

    // Similarity gates
    /// Nominal cosine similarity a beat pair must reach to count as a match (default: 0.50)
    pub similarity_threshold: f32,

    /// Minimum fraction of pairs whose beats share the same bar phase (default: 0.70)
    pub min_phase_alignment: f32,

    /// Minimum number of beat pairs for an offset or a run to be considered (default: 6)
    pub min_pairs: usize,

    /// Number of ranked offsets handed to candidate collection (default: 8)
    pub top_candidates: usize,

    // Loop graph
    /// Maximum outgoing edges per beat in the loop candidate graph (default: 8)
    pub max_neighbors: usize,

    /// Empirical scoring weights
    pub weights: ScoringWeights,
}

impl Default for CanonConfig {
    fn default() -> Self {
        Self {
            beats_per_bar: 4,
            context_window: 5,
            similarity_threshold: 0.50,
            min_phase_alignment: 0.70,
            min_pairs: 6,
            top_candidates: 8,
            max_neighbors: 8,
            weights: ScoringWeights::default(),
        }
    }
}

impl CanonConfig {
    /// Check that every parameter is inside its valid domain
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let counts = [
            ("beats_per_bar", self.beats_per_bar),
            ("context_window", self.context_window),
            ("min_pairs", self.min_pairs),
            ("top_candidates", self.top_candidates),
            ("max_neighbors", self.max_neighbors),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(AnalysisError::InvalidConfig(format!("{} must be > 0", name)));
            }
        }

        if !self.similarity_threshold.is_finite() {
            return Err(AnalysisError::InvalidConfig(
                "similarity_threshold must be finite".to_string(),
            ));
        }
        if !self.min_phase_alignment.is_finite() {
            return Err(AnalysisError::InvalidConfig(
                "min_phase_alignment must be finite".to_string(),
            ));
        }

        self.weights.validate()
    }

    /// Similarity floor used by the loop candidate graph
    pub fn loop_min_similarity(&self) -> f32 {
        self.similarity_threshold * self.weights.loop_floor_factor
    }
}

/// Empirically chosen constants of the scoring formulas
///
/// None of these are theoretically motivated; they are exposed so callers can
/// recalibrate them without touching the algorithms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    // Offset ranking
    /// Weight of the diagonal std in the offset stability key (default: 0.4)
    pub offset_std_penalty: f32,
    /// Bonus for offsets that are a multiple of `beats_per_bar` (default: 0.05)
    pub bar_aligned_bonus: f32,

    // Candidate collection
    /// Threshold deltas tried per offset, applied to the nominal threshold (default: +0.05, 0, -0.05, -0.1)
    pub threshold_steps: Vec<f32>,
    /// Lowest threshold ever used when relaxing (default: 0.2)
    pub threshold_floor: f32,
    /// Length gain of the run score: `mean * (1 + gain * ln(1 + length))` (default: 0.12)
    pub run_length_gain: f32,
    /// Weight of the run maximum similarity (default: 0.05)
    pub run_max_weight: f32,
    /// Penalty on the run similarity std (default: 0.03)
    pub run_std_penalty: f32,
    /// Weight of `high_similarity_ratio * length` (default: 0.08)
    pub run_high_ratio_gain: f32,
    /// Multiplier applied to runs found below the nominal threshold (default: 0.92)
    pub relaxed_penalty: f32,
    /// Candidates kept per offset (default: 16)
    pub max_candidates_per_offset: usize,
    /// Candidates kept overall (default: 128)
    pub max_candidates_total: usize,

    // Segment assignment
    /// Minimum fraction of a candidate range that must still be free (default: 0.6)
    pub min_free_ratio: f32,
    /// Candidate accepted when mean similarity reaches `threshold * factor` (default: 0.75)
    pub assign_mean_factor: f32,

    // Gap filling
    /// Ranked offsets considered for every gap (default: 8)
    pub gap_top_offsets: usize,
    /// Most similar beats to the gap start whose offsets are considered (default: 10)
    pub gap_similar_beats: usize,
    /// Relaxation of `min_phase_alignment` inside gaps (default: 0.1)
    pub gap_phase_relaxation: f32,
    /// Phase floor for gaps no longer than `min_pairs` (default: 0.45)
    pub gap_short_phase_floor: f32,
    /// Weight of the phase ratio in the gap score (default: 0.05)
    pub gap_phase_weight: f32,
    /// Weight of the gap length in the gap score (default: 0.015)
    pub gap_length_weight: f32,
    /// Weight of the maximum similarity in the gap score (default: 0.02)
    pub gap_max_weight: f32,
    /// Gap score penalty kicks in when min similarity drops below `threshold * factor` (default: 0.4)
    pub gap_min_sim_factor: f32,

    // Loop graph
    /// Neighbourhood size used for the dynamic floor (default: 16)
    pub loop_top_k: usize,
    /// Percentile of the neighbourhood used as dynamic floor (default: 20.0)
    pub loop_floor_percentile: f32,
    /// Global loop floor as a fraction of `similarity_threshold` (default: 0.8)
    pub loop_floor_factor: f32,

    // Output
    /// Outgoing transitions kept per beat (default: 6)
    pub max_transitions: usize,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            offset_std_penalty: 0.4,
            bar_aligned_bonus: 0.05,
            threshold_steps: vec![0.05, 0.0, -0.05, -0.1],
            threshold_floor: 0.2,
            run_length_gain: 0.12,
            run_max_weight: 0.05,
            run_std_penalty: 0.03,
            run_high_ratio_gain: 0.08,
            relaxed_penalty: 0.92,
            max_candidates_per_offset: 16,
            max_candidates_total: 128,
            min_free_ratio: 0.6,
            assign_mean_factor: 0.75,
            gap_top_offsets: 8,
            gap_similar_beats: 10,
            gap_phase_relaxation: 0.1,
            gap_short_phase_floor: 0.45,
            gap_phase_weight: 0.05,
            gap_length_weight: 0.015,
            gap_max_weight: 0.02,
            gap_min_sim_factor: 0.4,
            loop_top_k: 16,
            loop_floor_percentile: 20.0,
            loop_floor_factor: 0.8,
            max_transitions: 6,
        }
    }
}

impl ScoringWeights {
    fn validate(&self) -> Result<(), AnalysisError> {
        if self.threshold_steps.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "weights.threshold_steps must not be empty".to_string(),
            ));
        }
        if self.threshold_steps.iter().any(|s| !s.is_finite()) {
            return Err(AnalysisError::InvalidConfig(
                "weights.threshold_steps must be finite".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.loop_floor_percentile) {
            return Err(AnalysisError::InvalidConfig(
                "weights.loop_floor_percentile must be within [0, 100]".to_string(),
            ));
        }
        if self.max_candidates_per_offset == 0 || self.max_candidates_total == 0 {
            return Err(AnalysisError::InvalidConfig(
                "candidate caps must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
