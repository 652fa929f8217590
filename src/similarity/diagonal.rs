//! Per-call diagonal cache
//!
//! Offset diagonals are read several times within one alignment (offset
//! scoring, candidate collection, diagnostics). The cache lives on the stack
//! of a single invocation and is dropped with it.

use super::SimilarityMatrix;
use std::collections::HashMap;

/// Lazily extracted SSM diagonals keyed by offset
#[derive(Debug)]
pub struct DiagonalCache<'a> {
    ssm: &'a SimilarityMatrix,
    diagonals: HashMap<usize, Vec<f32>>,
}

impl<'a> DiagonalCache<'a> {
    /// Create an empty cache over `ssm`
    pub fn new(ssm: &'a SimilarityMatrix) -> Self {
        Self {
            ssm,
            diagonals: HashMap::new(),
        }
    }

    /// The `offset`-th diagonal, extracted on first use
    pub fn get(&mut self, offset: usize) -> &[f32] {
        let ssm = self.ssm;
        self.diagonals
            .entry(offset)
            .or_insert_with(|| ssm.diagonal(offset))
    }

    /// Matrix this cache reads from
    pub fn matrix(&self) -> &'a SimilarityMatrix {
        self.ssm
    }

    /// Number of cached diagonals
    pub fn len(&self) -> usize {
        self.diagonals.len()
    }

    /// True when nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.diagonals.is_empty()
    }
}
