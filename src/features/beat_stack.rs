//! Beat feature stacking
//!
//! Builds one descriptor per beat from frame-level features.
//!
//! # Algorithm
//!
//! 1. Map every beat's `[start, end)` time range to frames (`end` is the next
//!    beat's start, or the track duration for the last beat)
//! 2. Summarize each frame slice: chroma mean+std, MFCC mean+std, MFCC-delta
//!    mean, onset mean/max/p90, RMS mean/max/std, beat duration
//! 3. Z-score every dimension across the whole track (zero std floored to 1.0)
//! 4. Concatenate the normalized vectors of the `context_window` beats ending
//!    at each beat, left-padding with zeros before the track start

use super::stats;
use super::{Beat, FrameFeatures};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Per-beat context carried through the alignment
#[derive(Debug, Clone, PartialEq)]
pub struct BeatContext {
    /// Beat index in the track
    pub index: usize,

    /// Beat start time in seconds
    pub start: f32,

    /// Time until the next beat (or track end) in seconds
    pub duration: f32,

    /// Position within the bar (`index % beats_per_bar`)
    pub phase: usize,

    /// Z-scored base descriptor of this beat alone
    pub normalized_vector: Vec<f32>,
}

/// Stacked beat descriptors
#[derive(Debug, Clone)]
pub struct StackedBeats {
    /// One row per beat, `context_window * base_dim` columns
    pub stacked: Array2<f32>,

    /// Per-beat context, in beat order
    pub contexts: Vec<BeatContext>,
}

impl StackedBeats {
    /// Number of beats
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// True if no beats were stacked
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Build stacked beat descriptors
///
/// # Arguments
///
/// * `beats` - Beats in time order
/// * `duration` - Track duration in seconds (closes the last beat)
/// * `features` - Frame-level features (must pass [`FrameFeatures::validate`])
/// * `beats_per_bar` - Beats per bar for phase computation (> 0)
/// * `context_window` - Beats concatenated per descriptor (> 0)
///
/// # Returns
///
/// Stacked descriptors and per-beat contexts. An empty beat list yields an
/// empty result.
pub fn stack_beat_features(
    beats: &[Beat],
    duration: f32,
    features: &FrameFeatures,
    beats_per_bar: usize,
    context_window: usize,
) -> StackedBeats {
    log::debug!(
        "Stacking beat features: {} beats, context_window={}, hop={}",
        beats.len(),
        context_window,
        features.hop_length
    );

    let base_dim = base_dimension(features);
    if beats.is_empty() {
        return StackedBeats {
            stacked: Array2::zeros((0, base_dim * context_window)),
            contexts: Vec::new(),
        };
    }

    let n_beats = beats.len();
    let mut boundaries: Vec<f32> = beats.iter().map(|b| b.start).collect();
    boundaries.push(duration);
    let boundary_frames: Vec<i64> = boundaries.iter().map(|&t| features.time_to_frame(t)).collect();

    let mut base = Array2::<f32>::zeros((n_beats, base_dim));
    let mut contexts = Vec::with_capacity(n_beats);
    for idx in 0..n_beats {
        let start = boundaries[idx];
        let end = boundaries[idx + 1];
        let beat_duration = end - start;
        let vector = beat_descriptor(
            features,
            boundary_frames[idx],
            boundary_frames[idx + 1],
            beat_duration,
        );
        base.row_mut(idx).assign(&vector);
        contexts.push(BeatContext {
            index: idx,
            start,
            duration: beat_duration,
            phase: idx % beats_per_bar,
            normalized_vector: Vec::new(),
        });
    }

    let normalized = z_score_columns(&base);

    let mut stacked = Array2::<f32>::zeros((n_beats, base_dim * context_window));
    for (idx, context) in contexts.iter_mut().enumerate() {
        context.normalized_vector = normalized.row(idx).to_vec();
        for slot in 0..context_window {
            let lag = context_window - 1 - slot;
            if idx < lag {
                continue; // zero padding
            }
            let source = idx - lag;
            stacked
                .slice_mut(s![idx, slot * base_dim..(slot + 1) * base_dim])
                .assign(&normalized.row(source));
        }
    }

    log::debug!("Stacked descriptor dimension: {}", stacked.ncols());

    StackedBeats { stacked, contexts }
}

fn base_dimension(features: &FrameFeatures) -> usize {
    let n_chroma = features.chroma.nrows();
    let n_mfcc = features.mfcc.nrows();
    let n_delta = features.mfcc_delta.nrows();
    2 * n_chroma + 2 * n_mfcc + n_delta + 3 + 3 + 1
}

/// Clamp a frame range to `[0, n_frames)`, never returning an empty range
fn clamp_frames(start: i64, end: i64, n_frames: usize) -> (usize, usize) {
    let n = n_frames as i64;
    let start = start.min(n - 1).max(0);
    let end = end.min(n).max(start + 1);
    (start as usize, end as usize)
}

fn slice_2d(matrix: &Array2<f32>, start: i64, end: i64) -> ArrayView2<'_, f32> {
    let (a, b) = clamp_frames(start, end, matrix.ncols());
    matrix.slice(s![.., a..b])
}

fn slice_1d(vector: &Array1<f32>, start: i64, end: i64) -> ArrayView1<'_, f32> {
    let (a, b) = clamp_frames(start, end, vector.len());
    vector.slice(s![a..b])
}

fn row_means(view: &ArrayView2<'_, f32>) -> Array1<f32> {
    view.mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(view.nrows()))
}

fn beat_descriptor(
    features: &FrameFeatures,
    frame_start: i64,
    frame_end: i64,
    beat_duration: f32,
) -> Array1<f32> {
    let chroma = slice_2d(&features.chroma, frame_start, frame_end);
    let mfcc = slice_2d(&features.mfcc, frame_start, frame_end);
    let mfcc_delta = slice_2d(&features.mfcc_delta, frame_start, frame_end);
    let onset = slice_1d(&features.onset_strength, frame_start, frame_end).to_vec();
    let rms = slice_1d(&features.rms, frame_start, frame_end).to_vec();

    let mut vector = Vec::with_capacity(base_dimension(features));
    vector.extend(row_means(&chroma).iter().copied());
    vector.extend(chroma.std_axis(Axis(1), 0.0).iter().copied());
    vector.extend(row_means(&mfcc).iter().copied());
    vector.extend(mfcc.std_axis(Axis(1), 0.0).iter().copied());
    vector.extend(row_means(&mfcc_delta).iter().copied());
    vector.extend([
        stats::mean(&onset),
        stats::max(&onset),
        stats::percentile(&onset, 90.0),
    ]);
    vector.extend([stats::mean(&rms), stats::max(&rms), stats::std_dev(&rms)]);
    vector.push(beat_duration);

    Array1::from(vector)
}

/// Z-score every column; columns with zero spread are divided by 1.0
///
/// Accumulates in f64 so a constant column yields an exact zero spread.
fn z_score_columns(base: &Array2<f32>) -> Array2<f32> {
    let mut normalized = base.clone();
    for mut column in normalized.columns_mut() {
        let n = column.len() as f64;
        let mean = column.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = column
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        let std = if var == 0.0 { 1.0 } else { var.sqrt() };
        column.mapv_inplace(|v| ((v as f64 - mean) / std) as f32);
    }
    normalized
}
