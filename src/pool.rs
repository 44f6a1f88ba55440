//! Replica pool bookkeeping: how the logical chain pool is partitioned
//! across worker ranks, and the temperature ladder.

use serde::{Deserialize, Serialize};

/// Partition of `total_chains` logical chains across `ranks` workers.
///
/// Every rank owns `base = total/ranks` chains, except the last rank which
/// also absorbs the remainder. `owner_of` divides by the base count, so it
/// is an approximation once the last rank holds extra chains; the exchange
/// schedule only ever selects indices for which the approximation agrees
/// with real ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankLayout {
    pub total_chains: usize,
    pub ranks: usize,
}

impl RankLayout {
    pub fn new(total_chains: usize, ranks: usize) -> Self {
        debug_assert!(ranks >= 1 && total_chains >= 1);
        RankLayout { total_chains, ranks }
    }

    /// Chains per rank before remainder distribution.
    #[inline]
    pub fn base(&self) -> usize {
        self.total_chains / self.ranks
    }

    /// Number of chains the given rank owns.
    pub fn chains_on(&self, rank: usize) -> usize {
        if rank == self.ranks - 1 {
            self.base() + self.total_chains % self.ranks
        } else {
            self.base()
        }
    }

    /// Rank that owns the chain with global index `g`.
    #[inline]
    pub fn owner_of(&self, g: usize) -> usize {
        g / self.base()
    }

    /// Local index of global chain `g` within its owning rank.
    #[inline]
    pub fn local_of(&self, g: usize) -> usize {
        g % self.base()
    }

    /// Global index of the `c`-th local chain on `rank`.
    #[inline]
    pub fn global_of(&self, rank: usize, c: usize) -> usize {
        rank * self.base() + c
    }
}

/// One temperature per global chain index, fixed for the run's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ladder(pub Vec<f64>);

impl Ladder {
    /// Default ladder: chain 0 at unit temperature and every
    /// other chain flat at `low`.
    pub fn flat(total: usize, low: f64) -> Self {
        let mut temps = vec![low; total];
        temps[0] = 1.0;
        Ladder(temps)
    }

    /// Linearly decreasing ladder from 1.0 down to `low`.
    pub fn linear(total: usize, low: f64) -> Self {
        if total == 1 {
            return Ladder(vec![1.0]);
        }
        let step = (1.0 - low) / (total - 1) as f64;
        Ladder((0..total).map(|i| 1.0 - step * i as f64).collect())
    }

    #[inline]
    pub fn temp(&self, g: usize) -> f64 {
        self.0[g]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
