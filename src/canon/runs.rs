//! Run detection along one offset diagonal

/// Contiguous span of diagonal positions `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// First diagonal position (= source beat index)
    pub start: usize,
    /// One past the last position
    pub end: usize,
}

impl Run {
    /// Number of beat pairs in the run
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True for an empty run
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Find maximal runs of diagonal values at or above `threshold`
///
/// A run opens when a value reaches the threshold and closes on the first
/// value below it (or at the end of the diagonal). Runs shorter than
/// `min_length` are dropped.
///
/// # Example
///
/// ```
/// use canon_align::canon::runs::{detect_runs, Run};
///
/// let diag = [0.9, 0.8, 0.1, 0.7, 0.9, 0.95];
/// let runs = detect_runs(&diag, 0.5, 2);
/// assert_eq!(runs, vec![Run { start: 0, end: 2 }, Run { start: 3, end: 6 }]);
/// ```
pub fn detect_runs(diagonal: &[f32], threshold: f32, min_length: usize) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut open: Option<usize> = None;

    for (idx, &value) in diagonal.iter().enumerate() {
        if value >= threshold {
            if open.is_none() {
                open = Some(idx);
            }
        } else if let Some(start) = open.take() {
            if idx - start >= min_length {
                runs.push(Run { start, end: idx });
            }
        }
    }
    if let Some(start) = open {
        if diagonal.len() - start >= min_length {
            runs.push(Run {
                start,
                end: diagonal.len(),
            });
        }
    }

    runs
}
