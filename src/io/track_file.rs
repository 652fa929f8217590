//! JSON track files
//!
//! A track file bundles what the beat tracker and the DSP front end produced
//! for one track:
//!
//! ```json
//! {
//!   "track_id": "intro-loop",
//!   "duration": 12.0,
//!   "beats": [{ "start": 0.0, "duration": 0.5, "confidence": 0.9 }],
//!   "features": {
//!     "sample_rate": 22050,
//!     "hop_length": 512,
//!     "chroma": [[...], ...],
//!     "mfcc": [[...], ...],
//!     "mfcc_delta": [[...], ...],
//!     "onset_strength": [...],
//!     "rms": [...]
//!   }
//! }
//! ```

use crate::analysis::result::AlignmentResult;
use crate::error::AnalysisError;
use crate::features::{Beat, FrameFeatures};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Frame features as nested rows (`matrix[row][frame]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRows {
    /// Sample rate the frames were computed at (Hz)
    pub sample_rate: u32,
    /// Hop length between frames (samples)
    pub hop_length: usize,
    /// Chroma rows
    pub chroma: Vec<Vec<f32>>,
    /// MFCC rows
    pub mfcc: Vec<Vec<f32>>,
    /// MFCC delta rows
    pub mfcc_delta: Vec<Vec<f32>>,
    /// Onset strength envelope
    pub onset_strength: Vec<f32>,
    /// RMS energy envelope
    pub rms: Vec<f32>,
}

impl FeatureRows {
    /// Convert to [`FrameFeatures`]
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for ragged or empty arrays.
    pub fn into_features(self) -> Result<FrameFeatures, AnalysisError> {
        FrameFeatures::from_rows(
            self.sample_rate,
            self.hop_length,
            self.chroma,
            self.mfcc,
            self.mfcc_delta,
            self.onset_strength,
            self.rms,
        )
    }
}

/// One track's alignment inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFile {
    /// Free-form identifier (defaults to empty)
    #[serde(default)]
    pub track_id: String,

    /// Detected beats in track order
    pub beats: Vec<Beat>,

    /// Track duration in seconds
    pub duration: f32,

    /// Frame-level features
    pub features: FeatureRows,
}

/// Read a track file from disk
///
/// # Errors
///
/// Returns `AnalysisError::Io` if the file cannot be opened and
/// `AnalysisError::Json` if it is not a valid track file.
pub fn load_track_file<P: AsRef<Path>>(path: P) -> Result<TrackFile, AnalysisError> {
    let path = path.as_ref();
    log::debug!("Loading track file: {}", path.display());
    let file = File::open(path).map_err(|e| AnalysisError::io("opening track file", e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AnalysisError::json("parsing track file", e))
}

/// Write an alignment as pretty-printed JSON
///
/// # Errors
///
/// Returns `AnalysisError::Io` or `AnalysisError::Json` on failure.
pub fn write_alignment<P: AsRef<Path>>(
    path: P,
    alignment: &AlignmentResult,
) -> Result<(), AnalysisError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| AnalysisError::io("creating alignment file", e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, alignment)
        .map_err(|e| AnalysisError::json("serializing alignment", e))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| AnalysisError::io("writing alignment file", e))?;
    log::debug!("Wrote alignment: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK_JSON: &str = r#"{
        "track_id": "tiny",
        "duration": 1.0,
        "beats": [{"start": 0.0, "duration": 0.5}, {"start": 0.5, "duration": 0.5, "confidence": 0.8}],
        "features": {
            "sample_rate": 22050,
            "hop_length": 441,
            "chroma": [[1.0, 0.0], [0.0, 1.0]],
            "mfcc": [[0.1, 0.2]],
            "mfcc_delta": [[0.0, 0.1]],
            "onset_strength": [0.5, 0.2],
            "rms": [0.3, 0.3]
        }
    }"#;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("canon-align-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_parse_track_file() {
        let track: TrackFile = serde_json::from_str(TRACK_JSON).unwrap();
        assert_eq!(track.track_id, "tiny");
        assert_eq!(track.beats.len(), 2);
        assert_eq!(track.beats[0].confidence, 0.0);
        let features = track.features.into_features().unwrap();
        assert_eq!(features.chroma.dim(), (2, 2));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let mut track: TrackFile = serde_json::from_str(TRACK_JSON).unwrap();
        track.features.chroma[1].push(0.5);
        assert!(matches!(
            track.features.into_features(),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_track_file(temp_path("missing.json")).unwrap_err();
        assert!(matches!(err, AnalysisError::Io { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let path = temp_path("track.json");
        std::fs::write(&path, TRACK_JSON).unwrap();
        let track = load_track_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(track.duration, 1.0);

        let path = temp_path("broken.json");
        std::fs::write(&path, "{").unwrap();
        let err = load_track_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, AnalysisError::Json { .. }));
    }
}
