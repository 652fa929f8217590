//! Summary statistics over similarity and feature slices
//!
//! All functions follow numpy conventions: `std` is the population standard
//! deviation (ddof = 0), `median` averages the two middle values of an even
//! sized slice, and `percentile` interpolates linearly between closest ranks.
//! Empty slices yield `0.0`.

/// Arithmetic mean
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Population standard deviation
pub fn std_dev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32;
    var.sqrt()
}

/// Minimum value
pub fn min(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().copied().fold(f32::INFINITY, f32::min)
}

/// Maximum value
pub fn max(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

/// Median value
pub fn median(values: &[f32]) -> f32 {
    percentile(values, 50.0)
}

/// Percentile with linear interpolation
///
/// # Arguments
///
/// * `values` - Input values (any order)
/// * `q` - Percentile in [0, 100]
pub fn percentile(values: &[f32], q: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = rank - lower as f32;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Summary of a similarity window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// Mean similarity
    pub mean: f32,
    /// Median similarity
    pub median: f32,
    /// Minimum similarity
    pub min: f32,
    /// Maximum similarity
    pub max: f32,
    /// Population standard deviation
    pub std: f32,
}

impl WindowStats {
    /// Compute all window statistics in one go
    pub fn from_values(values: &[f32]) -> Self {
        Self {
            mean: mean(values),
            median: median(values),
            min: min(values),
            max: max(values),
            std: std_dev(values),
        }
    }
}
