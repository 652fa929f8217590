//! # Canon Align
//!
//! A beat-synchronous canon alignment engine. Given the beats of a track and
//! its frame-level audio features, it decides for every beat which other beat
//! it should jump to, so that a player can overlay or continue the track from
//! a musically similar point.
//!
//! ## Features
//!
//! - **Beat Descriptors**: Chroma, MFCC, delta, onset and RMS statistics per beat, z-scored with temporal context
//! - **Self-Similarity**: Cosine similarity matrix over stacked beat descriptors
//! - **Canon Assignment**: Offset ranking, run detection and greedy segment assignment with full coverage
//! - **Loop Graph**: Phase-aligned free-jump edges for every beat
//!
//! ## Quick Start
//!
//! ```no_run
//! use canon_align::{compute_canon_alignment, Beat, CanonConfig, FrameFeatures};
//!
//! # fn load() -> (Vec<Beat>, f32, FrameFeatures) { unimplemented!() }
//! // Beats from a beat tracker, features from a DSP front end
//! let (beats, duration, features) = load();
//!
//! if let Some(alignment) = compute_canon_alignment(&beats, duration, &features, &CanonConfig::default())? {
//!     println!("Offset: {} beats, {} segments", alignment.offset, alignment.segments.len());
//! }
//! # Ok::<(), canon_align::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! The alignment pipeline follows this flow:
//!
//! ```text
//! Beats + Frame Features → Beat Stacking → SSM → Offsets → Candidates → Assignment → Gap Fill → Result
//!                                           └──────────────→ Loop Graph ─────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod canon;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod similarity;

// Re-export main types
pub use analysis::batch::{analyze_batch, TrackInput};
pub use analysis::result::{AlignmentResult, JumpEdge, Segment, SegmentLabel};
pub use config::{CanonConfig, ScoringWeights};
pub use error::AnalysisError;
pub use features::{Beat, FrameFeatureSource, FrameFeatures, PrecomputedFeatures};

use features::beat_stack::stack_beat_features;
use similarity::SimilarityMatrix;

/// Main alignment function
///
/// Stacks per-beat descriptors, builds the beat self-similarity matrix and
/// runs the canon alignment over it.
///
/// # Arguments
///
/// * `beats` - Detected beats in track order
/// * `duration` - Track duration in seconds (closes the last beat)
/// * `features` - Frame-level features of the track
/// * `config` - Alignment configuration parameters
///
/// # Returns
///
/// `None` when the track has one beat or fewer, otherwise an alignment
/// assigning a jump target to every beat.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidConfig` for out-of-domain parameters and
/// `AnalysisError::InvalidInput` for empty or malformed frame features.
pub fn compute_canon_alignment(
    beats: &[Beat],
    duration: f32,
    features: &FrameFeatures,
    config: &CanonConfig,
) -> Result<Option<AlignmentResult>, AnalysisError> {
    config.validate()?;

    log::debug!(
        "Starting canon alignment: {} beats over {:.2}s",
        beats.len(),
        duration
    );

    if beats.len() <= 1 {
        log::debug!("Not enough beats for alignment");
        return Ok(None);
    }

    features.validate()?;

    let stacked = stack_beat_features(
        beats,
        duration,
        features,
        config.beats_per_bar,
        config.context_window,
    );
    let phases: Vec<usize> = stacked.contexts.iter().map(|c| c.phase).collect();

    let ssm = SimilarityMatrix::from_features(&stacked.stacked);
    log::debug!("Similarity matrix: {}x{}", ssm.len(), ssm.len());

    Ok(analysis::alignment::align_similarity_matrix(
        &ssm, &phases, config,
    ))
}

/// Alignment from raw samples through a feature source
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `hop_length` - Hop length the feature source should use
/// * `beats` - Detected beats in track order
/// * `duration` - Track duration in seconds
/// * `source` - Frame feature extractor
/// * `config` - Alignment configuration parameters
///
/// # Errors
///
/// Propagates extraction failures from `source`, then behaves like
/// [`compute_canon_alignment`].
pub fn compute_canon_alignment_from_audio<S: FrameFeatureSource + ?Sized>(
    samples: &[f32],
    sample_rate: u32,
    hop_length: usize,
    beats: &[Beat],
    duration: f32,
    source: &S,
    config: &CanonConfig,
) -> Result<Option<AlignmentResult>, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate".to_string()));
    }
    if hop_length == 0 {
        return Err(AnalysisError::InvalidInput("Invalid hop length".to_string()));
    }
    log::debug!(
        "Extracting frame features: {} samples at {} Hz, hop={}",
        samples.len(),
        sample_rate,
        hop_length
    );
    let features = source.extract(samples, sample_rate, hop_length)?;
    compute_canon_alignment(beats, duration, &features, config)
}
