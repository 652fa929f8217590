//! Alignment result types

use crate::canon::OffsetScore;
use serde::{Deserialize, Serialize};

/// How a segment was assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentLabel {
    /// Accepted from a ranked canon candidate
    Primary,
    /// Filled in for beats no candidate covered
    Fallback,
}

/// Contiguous beat range `[start, end)` that jumps by `offset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First beat
    pub start: usize,

    /// One past the last beat
    pub end: usize,

    /// Jump distance in beats (targets wrap around the track)
    pub offset: usize,

    /// Number of beats (`end - start`)
    pub length: usize,

    /// Mean similarity between each beat and its target
    pub mean_similarity: f32,

    /// Median similarity between each beat and its target
    pub median_similarity: f32,

    /// Minimum similarity between each beat and its target
    pub min_similarity: f32,

    /// Maximum similarity between each beat and its target
    pub max_similarity: f32,

    /// Similarity threshold the segment was accepted at
    pub threshold: f32,

    /// Fraction of beats whose target shares their bar phase
    pub phase_alignment: f32,

    /// Fraction of the range that was still unassigned when accepted
    pub coverage_ratio: f32,

    /// Ranking score
    pub score: f32,

    /// Assignment origin
    pub label: SegmentLabel,
}

/// Diagnostic view of a ranked offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetCandidate {
    /// Jump distance in beats
    pub offset: usize,

    /// Mean diagonal similarity
    pub mean_similarity: f32,

    /// Diagonal similarity standard deviation
    pub std_similarity: f32,

    /// Beat pairs on the diagonal
    pub pairs_evaluated: usize,

    /// Fraction of phase-matched pairs
    pub phase_alignment: f32,

    /// Fraction of pairs at or above the threshold
    pub high_similarity_ratio: f32,
}

impl From<&OffsetScore> for OffsetCandidate {
    fn from(score: &OffsetScore) -> Self {
        Self {
            offset: score.offset,
            mean_similarity: score.mean,
            std_similarity: score.std,
            pairs_evaluated: score.length,
            phase_alignment: score.phase_alignment,
            high_similarity_ratio: score.high_similarity_ratio,
        }
    }
}

/// Above-threshold run on the default offset diagonal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    /// First beat
    pub start: usize,
    /// One past the last beat
    pub end: usize,
    /// Number of pairs
    pub length: usize,
}

/// Directed jump between two beats
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpEdge {
    /// Beat jumped from
    pub source: usize,
    /// Beat jumped to
    pub target: usize,
    /// SSM similarity of the two beats
    pub similarity: f32,
}

/// Coverage summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    /// Fraction of beats with a jump target (1.0 on every successful run)
    pub ratio: f32,
    /// Beats left without a target
    pub uncovered: usize,
    /// Number of segments
    pub segments: usize,
}

/// Free-form diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentNotes {
    /// Explanation when the sequential fallback was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Ranked canon candidates handed to assignment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<usize>,

    /// Segments accepted from candidates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_segments: Option<usize>,

    /// Segments created by gap filling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_segments: Option<usize>,

    /// Mean similarity over all assigned pairs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_similarity: Option<f32>,
}

/// Complete canon alignment of one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// Default jump distance in beats
    pub offset: usize,

    /// Beats per bar used for phase
    pub beats_per_bar: usize,

    /// Context window used for stacking
    pub context_window: usize,

    /// Nominal similarity threshold
    pub similarity_threshold: f32,

    /// Minimum phase alignment
    pub min_phase_alignment: f32,

    /// Minimum pairs per offset/run
    pub min_pairs: usize,

    /// Ranked offsets considered (top `top_candidates`)
    pub offset_candidates: Vec<OffsetCandidate>,

    /// Above-threshold runs on the default offset
    pub runs: Vec<RunInfo>,

    /// Assigned segments sorted by `(start, offset)`
    pub segments: Vec<Segment>,

    /// Jump target of every beat
    pub pairs: Vec<usize>,

    /// Similarity of every beat to its target
    pub pair_similarity: Vec<f32>,

    /// Per-beat outgoing edges, best first
    pub transitions: Vec<JumpEdge>,

    /// Coverage summary
    pub coverage: Coverage,

    /// Free-jump graph edges
    pub loop_candidates: Vec<JumpEdge>,

    /// Recommended playback start beat
    pub start_index: usize,

    /// Diagnostics
    pub notes: AlignmentNotes,
}

impl AlignmentResult {
    /// Number of aligned beats
    pub fn n_beats(&self) -> usize {
        self.pairs.len()
    }

    /// True if the sequential fallback produced this alignment
    pub fn is_sequential_fallback(&self) -> bool {
        self.notes.message.is_some()
    }
}
