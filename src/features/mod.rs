//! Beat-level feature modules
//!
//! Turns the frame-level arrays produced by the external DSP collaborator
//! into one descriptor per beat:
//! - Frame feature container and extraction seam
//! - Beat feature stacking (summary statistics, z-scoring, temporal context)
//! - Summary statistics helpers

pub mod beat_stack;
pub mod stats;

use crate::error::AnalysisError;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A detected beat as delivered by the beat tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    /// Beat start time in seconds
    pub start: f32,

    /// Beat duration in seconds
    pub duration: f32,

    /// Tracker confidence (0.0-1.0)
    #[serde(default)]
    pub confidence: f32,
}

/// Frame-level features sharing one hop length
///
/// Matrices are laid out `(coefficients, frames)`: chroma has one row per
/// pitch class, MFCC one row per coefficient.
#[derive(Debug, Clone)]
pub struct FrameFeatures {
    /// Sample rate the frames were computed at (Hz)
    pub sample_rate: u32,

    /// Hop length between frames (samples)
    pub hop_length: usize,

    /// Chroma matrix (pitch classes x frames)
    pub chroma: Array2<f32>,

    /// MFCC matrix (coefficients x frames)
    pub mfcc: Array2<f32>,

    /// First-order MFCC delta (coefficients x frames)
    pub mfcc_delta: Array2<f32>,

    /// Onset strength envelope (frames)
    pub onset_strength: Array1<f32>,

    /// RMS energy (frames)
    pub rms: Array1<f32>,
}

impl FrameFeatures {
    /// Build frame features from nested row vectors
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if a matrix is ragged or the
    /// assembled features fail [`FrameFeatures::validate`].
    pub fn from_rows(
        sample_rate: u32,
        hop_length: usize,
        chroma: Vec<Vec<f32>>,
        mfcc: Vec<Vec<f32>>,
        mfcc_delta: Vec<Vec<f32>>,
        onset_strength: Vec<f32>,
        rms: Vec<f32>,
    ) -> Result<Self, AnalysisError> {
        let features = Self {
            sample_rate,
            hop_length,
            chroma: rows_to_matrix("chroma", chroma)?,
            mfcc: rows_to_matrix("mfcc", mfcc)?,
            mfcc_delta: rows_to_matrix("mfcc_delta", mfcc_delta)?,
            onset_strength: Array1::from(onset_strength),
            rms: Array1::from(rms),
        };
        features.validate()?;
        Ok(features)
    }

    /// Check the minimal shape contract needed for bounds-clamped slicing
    ///
    /// Every array must hold at least one frame and every matrix at least one
    /// row. Values themselves (NaNs, alignment between arrays) are trusted.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidInput("Invalid sample rate".to_string()));
        }
        if self.hop_length == 0 {
            return Err(AnalysisError::InvalidInput("Invalid hop length".to_string()));
        }
        let matrices = [
            ("chroma", &self.chroma),
            ("mfcc", &self.mfcc),
            ("mfcc_delta", &self.mfcc_delta),
        ];
        for (name, matrix) in matrices {
            if matrix.nrows() == 0 || matrix.ncols() == 0 {
                return Err(AnalysisError::InvalidInput(format!(
                    "Empty {} matrix ({}x{})",
                    name,
                    matrix.nrows(),
                    matrix.ncols()
                )));
            }
        }
        if self.onset_strength.is_empty() {
            return Err(AnalysisError::InvalidInput("Empty onset strength envelope".to_string()));
        }
        if self.rms.is_empty() {
            return Err(AnalysisError::InvalidInput("Empty RMS envelope".to_string()));
        }
        Ok(())
    }

    /// Convert a time in seconds to a frame index (`floor(t * sr / hop)`)
    pub fn time_to_frame(&self, time: f32) -> i64 {
        (time as f64 * self.sample_rate as f64 / self.hop_length as f64).floor() as i64
    }
}

fn rows_to_matrix(name: &str, rows: Vec<Vec<f32>>) -> Result<Array2<f32>, AnalysisError> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != n_cols) {
        return Err(AnalysisError::InvalidInput(format!("Ragged {} matrix", name)));
    }
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| AnalysisError::InvalidInput(format!("Malformed {} matrix: {}", name, e)))
}

/// Source of frame-level features for a decoded track
///
/// Implemented by the DSP collaborator (chroma, MFCC, onset strength, RMS).
/// The alignment engine only consumes the resulting [`FrameFeatures`].
pub trait FrameFeatureSource {
    /// Extract frame features from mono samples
    ///
    /// # Errors
    ///
    /// Implementations report failures as `AnalysisError::FeatureExtraction`.
    fn extract(
        &self,
        samples: &[f32],
        sample_rate: u32,
        hop_length: usize,
    ) -> Result<FrameFeatures, AnalysisError>;
}

/// Feature source backed by features computed elsewhere
#[derive(Debug, Clone)]
pub struct PrecomputedFeatures(pub FrameFeatures);

impl FrameFeatureSource for PrecomputedFeatures {
    fn extract(
        &self,
        _samples: &[f32],
        sample_rate: u32,
        hop_length: usize,
    ) -> Result<FrameFeatures, AnalysisError> {
        if sample_rate != self.0.sample_rate || hop_length != self.0.hop_length {
            return Err(AnalysisError::FeatureExtraction(format!(
                "Precomputed features are at {} Hz / hop {}, requested {} Hz / hop {}",
                self.0.sample_rate, self.0.hop_length, sample_rate, hop_length
            )));
        }
        Ok(self.0.clone())
    }
}
