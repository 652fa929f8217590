//! Parallel alignment of many tracks

use crate::analysis::result::AlignmentResult;
use crate::config::CanonConfig;
use crate::error::AnalysisError;
use crate::features::{Beat, FrameFeatures};
use rayon::prelude::*;

/// Inputs for one track
#[derive(Debug, Clone)]
pub struct TrackInput {
    /// Detected beats
    pub beats: Vec<Beat>,

    /// Track duration in seconds
    pub duration: f32,

    /// Frame-level features
    pub features: FrameFeatures,
}

/// Align every track on the current rayon pool
///
/// Tracks are independent; results come back in input order and one
/// failing track does not affect the others.
pub fn analyze_batch(
    tracks: &[TrackInput],
    config: &CanonConfig,
) -> Vec<Result<Option<AlignmentResult>, AnalysisError>> {
    log::debug!("Batch alignment: {} tracks", tracks.len());
    tracks
        .par_iter()
        .map(|track| {
            crate::compute_canon_alignment(&track.beats, track.duration, &track.features, config)
        })
        .collect()
}
