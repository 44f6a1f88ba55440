//! Bigram transition-count matrices built from raw text.
//!
//! Every cell starts at 1 before counting, so the reference matrix is
//! strictly positive everywhere and its logarithm is always defined. The
//! target evaluator relies on this.

use crate::alphabet;

/// Square matrix of bigram occurrence counts over the cipher alphabet,
/// stored row-major. Read-only for the duration of a run.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    dim: usize,
    counts: Vec<u32>,
}

impl CountMatrix {
    /// Count successive character pairs of `text`, with every cell
    /// initialized to 1.
    pub fn from_text(text: &str, dim: usize) -> Self {
        let mut counts = vec![1u32; dim * dim];

        let mut chars = text.chars();
        if let Some(first) = chars.next() {
            let mut prev = alphabet::index_of(first).min(dim - 1);
            for ch in chars {
                let cur = alphabet::index_of(ch).min(dim - 1);
                counts[prev * dim + cur] += 1;
                prev = cur;
            }
        }

        CountMatrix { dim, counts }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> u32 {
        self.counts[i * self.dim + j]
    }

    /// Natural log of every cell, row-major. Well-defined because cells
    /// are at least 1.
    pub fn log_table(&self) -> Vec<f64> {
        self.counts.iter().map(|&c| f64::from(c).ln()).collect()
    }
}
