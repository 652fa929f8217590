//! Cosine self-similarity matrix
//!
//! # Algorithm
//!
//! 1. Normalize each stacked descriptor to unit L2 norm (zero norms left as-is)
//! 2. Compute the upper triangle of pairwise dot products and mirror it
//! 3. Clip to [-1, 1] and force the diagonal to 1
//!
//! Mirroring (instead of a full matrix product) keeps the matrix exactly
//! symmetric regardless of summation order.

use ndarray::{Array2, ArrayView1};

/// Square, symmetric beat x beat cosine similarity matrix
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    values: Array2<f32>,
}

impl SimilarityMatrix {
    /// Build the matrix from stacked descriptors (one row per beat)
    pub fn from_features(features: &Array2<f32>) -> Self {
        let n = features.nrows();
        log::debug!("Computing {}x{} cosine SSM ({} dims)", n, n, features.ncols());

        let normalized = normalize_rows(features);
        let mut values = Array2::<f32>::zeros((n, n));
        for i in 0..n {
            values[[i, i]] = 1.0;
            let row_i = normalized.row(i);
            for j in (i + 1)..n {
                let sim = row_i.dot(&normalized.row(j)).clamp(-1.0, 1.0);
                values[[i, j]] = sim;
                values[[j, i]] = sim;
            }
        }

        Self { values }
    }

    /// Wrap an existing matrix
    ///
    /// The caller guarantees it is square; the diagonal is forced to 1.
    pub fn from_array(mut values: Array2<f32>) -> Self {
        debug_assert_eq!(values.nrows(), values.ncols());
        values.diag_mut().fill(1.0);
        Self { values }
    }

    /// Number of beats
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    /// True for an empty matrix
    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// Similarity between beats `i` and `j`
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[[i, j]]
    }

    /// Similarity row of beat `i`
    pub fn row(&self, i: usize) -> ArrayView1<'_, f32> {
        self.values.row(i)
    }

    /// The `offset`-th upper diagonal: pairs `(i, i + offset)`
    ///
    /// Empty when `offset >= len()`.
    pub fn diagonal(&self, offset: usize) -> Vec<f32> {
        let n = self.len();
        if offset >= n {
            return Vec::new();
        }
        (0..n - offset).map(|i| self.values[[i, i + offset]]).collect()
    }

    /// Beats of row `src` ordered by similarity, highest first
    ///
    /// Ties keep ascending beat order, which makes downstream choices deterministic.
    pub fn ranked_row(&self, src: usize) -> Vec<usize> {
        let row = self.values.row(src);
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.sort_by(|&a, &b| row[b].total_cmp(&row[a]));
        indices
    }

    /// Underlying matrix
    pub fn as_array(&self) -> &Array2<f32> {
        &self.values
    }
}

fn normalize_rows(a: &Array2<f32>) -> Array2<f32> {
    let mut res = a.clone();
    for mut row in res.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|x| x / norm);
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_symmetric_with_unit_diagonal() {
        let features = array![
            [1.0, 0.0, 0.5],
            [0.9, 0.1, 0.4],
            [-1.0, 0.2, 0.0],
            [0.3, 0.3, 0.3]
        ];
        let ssm = SimilarityMatrix::from_features(&features);
        assert_eq!(ssm.len(), 4);
        for i in 0..4 {
            assert_eq!(ssm.get(i, i), 1.0);
            for j in 0..4 {
                assert_eq!(ssm.get(i, j), ssm.get(j, i));
                assert!(ssm.get(i, j) >= -1.0 && ssm.get(i, j) <= 1.0);
            }
        }
    }

    #[test]
    fn test_zero_rows_are_guarded() {
        let features = array![[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]];
        let ssm = SimilarityMatrix::from_features(&features);
        assert_eq!(ssm.get(0, 1), 0.0);
        assert_eq!(ssm.get(0, 2), 0.0);
        assert_eq!(ssm.get(0, 0), 1.0);
        assert!(ssm.as_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_scale_invariance() {
        let features = array![[1.0, 2.0], [2.0, 4.0], [-1.0, -2.0]];
        let ssm = SimilarityMatrix::from_features(&features);
        assert!((ssm.get(0, 1) - 1.0).abs() < 1e-6);
        assert!((ssm.get(0, 2) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_diagonal_extraction() {
        let values = array![
            [1.0, 0.1, 0.2, 0.3],
            [0.1, 1.0, 0.4, 0.5],
            [0.2, 0.4, 1.0, 0.6],
            [0.3, 0.5, 0.6, 1.0]
        ];
        let ssm = SimilarityMatrix::from_array(values);
        assert_eq!(ssm.diagonal(1), vec![0.1, 0.4, 0.6]);
        assert_eq!(ssm.diagonal(3), vec![0.3]);
        assert!(ssm.diagonal(4).is_empty());
    }

    #[test]
    fn test_ranked_row_ties_keep_index_order() {
        let values = array![[1.0, 0.5, 0.5, 0.9], [0.5, 1.0, 0.0, 0.0], [0.5, 0.0, 1.0, 0.0], [0.9, 0.0, 0.0, 1.0]];
        let ssm = SimilarityMatrix::from_array(values);
        assert_eq!(ssm.ranked_row(0), vec![0, 3, 1, 2]);
    }
}
