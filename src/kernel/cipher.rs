//! Permutation-space kernel: Metropolis search over substitution-cipher
//! keys, scored against bigram count matrices.

use std::sync::Arc;

use rayon::prelude::*;

use crate::corpus::CountMatrix;
use crate::kernel::TemperModel;
use crate::TpResult;

/// Target model for cipher-key search.
///
/// Holds the log of the reference bigram matrix `R` (strictly positive by
/// construction, so the log table is finite) and the ciphertext bigram
/// matrix `C`. Shared read-only by every chain.
pub struct CipherModel {
    dim: usize,
    log_ref: Arc<Vec<f64>>,
    coded: Arc<CountMatrix>,
}

impl CipherModel {
    pub fn new(reference: &CountMatrix, coded: Arc<CountMatrix>) -> Self {
        let dim = reference.dim();
        debug_assert_eq!(dim, coded.dim());
        CipherModel {
            dim,
            log_ref: Arc::new(reference.log_table()),
            coded,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Log-target of key `x` at `temp`:
    /// `temp * sum_{i,j} ln(R[i][j]) * C[x[i]][x[j]]`.
    ///
    /// Summed with a parallel row reduction; the floating-point summation
    /// order varies with thread count, so callers must tolerate small drift.
    pub fn log_target(&self, x: &[u16], temp: f64) -> f64 {
        let dim = self.dim;
        let log_ref = &self.log_ref;
        let coded = &self.coded;

        let sum: f64 = (0..dim)
            .into_par_iter()
            .map(|i| {
                let ci = x[i] as usize;
                let row = &log_ref[i * dim..(i + 1) * dim];
                let mut acc = 0.0;
                for (j, &lr) in row.iter().enumerate() {
                    let cj = x[j] as usize;
                    acc += lr * f64::from(coded.get(ci, cj));
                }
                acc
            })
            .sum();

        temp * sum
    }

    /// One Metropolis step with an explicit acceptance draw.
    ///
    /// `swap` names the two distinct positions of the proposal and
    /// `current` is the log-target of `x` at `temp`. Returns the log-target
    /// after the step (unchanged on rejection). Exposed so tests can force
    /// the coin.
    pub fn step(
        &self,
        x: &mut [u16],
        temp: f64,
        current: f64,
        swap: (usize, usize),
        coin: f64,
    ) -> f64 {
        let (a, b) = swap;
        x.swap(a, b);
        let proposed = self.log_target(x, temp);

        if coin < (proposed - current).exp() {
            proposed
        } else {
            x.swap(a, b);
            current
        }
    }

    /// Two distinct uniform positions in `0..dim`.
    fn propose_swap(&self, rng: &mut fastrand::Rng) -> (usize, usize) {
        let a = rng.usize(0..self.dim);
        let mut b = rng.usize(0..self.dim - 1);
        if b >= a {
            b += 1;
        }
        (a, b)
    }

    /// Re-seed the `u` worst-scoring chains of a local pool from the `u`
    /// best, ranked by log-target at `temp`.
    pub fn rotate_worst(&self, chains: &mut [Vec<u16>], u: usize, temp: f64) {
        let s = chains.len();
        if u == 0 || 2 * u > s {
            return;
        }

        let mut order: Vec<usize> = (0..s).collect();
        let values: Vec<f64> = chains.iter().map(|x| self.log_target(x, temp)).collect();
        order.sort_by(|&i, &j| values[i].partial_cmp(&values[j]).expect("finite log-target"));

        for k in 0..u {
            let best = order[s - k - 1];
            let worst = order[k];
            chains[worst] = chains[best].clone();
        }
    }
}

impl TemperModel for CipherModel {
    type State = Vec<u16>;

    fn init_state(&self, rng: &mut fastrand::Rng) -> Vec<u16> {
        crate::alphabet::random_key(self.dim, rng)
    }

    /// `steps`-entry chain history semantics: the chain makes `steps - 1`
    /// proposals (entry 0 is the starting state), keeping the current state
    /// on rejection. Only the final state is retained.
    fn advance(
        &self,
        state: &mut Vec<u16>,
        steps: usize,
        temp: f64,
        rng: &mut fastrand::Rng,
    ) -> TpResult<()> {
        let mut current = self.log_target(state, temp);
        for _ in 1..steps {
            let swap = self.propose_swap(rng);
            let coin = rng.f64();
            current = self.step(state, temp, current, swap, coin);
        }
        Ok(())
    }

    fn weight(&self, state: &Vec<u16>, temp: f64) -> f64 {
        self.log_target(state, temp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet;

    fn tiny_model(dim: usize) -> CipherModel {
        let text: String = "the quick brown fox jumps over the lazy dog".repeat(4);
        let reference = CountMatrix::from_text(&text, dim);
        let coded = Arc::new(CountMatrix::from_text(&text[..20], dim));
        CipherModel::new(&reference, coded)
    }

    fn is_permutation(x: &[u16]) -> bool {
        let mut seen = vec![false; x.len()];
        x.iter().all(|&v| {
            let v = v as usize;
            v < seen.len() && !std::mem::replace(&mut seen[v], true)
        })
    }

    #[test]
    fn advance_preserves_permutation() {
        let model = tiny_model(12);
        let mut rng = fastrand::Rng::with_seed(7);
        let mut x = alphabet::random_key(12, &mut rng);

        model.advance(&mut x, 200, 0.8, &mut rng).unwrap();
        assert!(is_permutation(&x));
    }

    #[test]
    fn forced_reject_keeps_state() {
        let model = tiny_model(10);
        let mut rng = fastrand::Rng::with_seed(3);
        let x0 = alphabet::random_key(10, &mut rng);

        let mut x = x0.clone();
        let mut current = model.log_target(&x, 1.0);
        for swap in [(0usize, 1usize), (2, 5), (7, 3)] {
            let proposed = {
                let mut y = x.clone();
                y.swap(swap.0, swap.1);
                model.log_target(&y, 1.0)
            };
            // Coin 1.0 rejects any proposal that is not strictly better by
            // more than a full unit of probability, i.e. everything with
            // ratio <= 1.
            if proposed < current {
                current = model.step(&mut x, 1.0, current, swap, 1.0);
                assert_eq!(x, x0);
            }
        }
    }

    #[test]
    fn forced_accept_applies_swap() {
        let model = tiny_model(10);
        let mut rng = fastrand::Rng::with_seed(5);
        let mut x = alphabet::random_key(10, &mut rng);
        let before = x.clone();

        let current = model.log_target(&x, 1.0);
        model.step(&mut x, 1.0, current, (1, 4), 0.0);
        assert_eq!(x[1], before[4]);
        assert_eq!(x[4], before[1]);
    }

    #[test]
    fn rotate_worst_copies_best_over_worst() {
        let model = tiny_model(8);
        let mut rng = fastrand::Rng::with_seed(17);
        let mut chains: Vec<Vec<u16>> =
            (0..4).map(|_| alphabet::random_key(8, &mut rng)).collect();

        let values: Vec<f64> = chains.iter().map(|x| model.log_target(x, 1.0)).collect();
        let best = (0..4)
            .max_by(|&i, &j| values[i].partial_cmp(&values[j]).unwrap())
            .unwrap();
        let worst = (0..4)
            .min_by(|&i, &j| values[i].partial_cmp(&values[j]).unwrap())
            .unwrap();
        let best_state = chains[best].clone();

        model.rotate_worst(&mut chains, 1, 1.0);
        assert_eq!(chains[worst], best_state);
    }
}
