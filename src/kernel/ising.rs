//! Lattice-space kernel: thread-banded Gibbs sweeps over a 2D Ising spin
//! system on a torus.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Barrier;

use rayon::prelude::*;

use crate::kernel::TemperModel;
use crate::{TemperError, TpResult};

/// Square binary spin lattice with wrap-around neighbors on both axes.
///
/// Cells are atomic so that the deliberately unsynchronized first phase of
/// a sweep (neighboring bands reading each other's rows mid-update) is
/// well-defined. All accesses are relaxed; the two sweep barriers provide
/// the only ordering the scheme needs.
pub struct Lattice {
    side: usize,
    cells: Vec<AtomicU8>,
}

impl Lattice {
    pub fn new(side: usize) -> Self {
        let cells = (0..side * side).map(|_| AtomicU8::new(0)).collect();
        Lattice { side, cells }
    }

    /// Uniformly random spins.
    pub fn random(side: usize, rng: &mut fastrand::Rng) -> Self {
        let lat = Lattice::new(side);
        for cell in &lat.cells {
            cell.store(u8::from(rng.f64() < 0.5), Ordering::Relaxed);
        }
        lat
    }

    pub fn side(&self) -> usize {
        self.side
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> u8 {
        self.cells[i * self.side + j].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, i: usize, j: usize, spin: u8) {
        self.cells[i * self.side + j].store(spin, Ordering::Relaxed)
    }

    /// Sum of the four torus-neighbor spins of cell `(i, j)`.
    #[inline]
    pub fn neighbor_sum(&self, i: usize, j: usize) -> u8 {
        let n = self.side;
        let up = if i == 0 { n - 1 } else { i - 1 };
        let down = if i == n - 1 { 0 } else { i + 1 };
        let left = if j == 0 { n - 1 } else { j - 1 };
        let right = if j == n - 1 { 0 } else { j + 1 };
        self.get(up, j) + self.get(down, j) + self.get(i, left) + self.get(i, right)
    }

    /// Interaction energy `sum_{i,j} x[i][j] * (four-neighbor sum)`,
    /// reduced in parallel over rows.
    pub fn interaction_sum(&self) -> f64 {
        (0..self.side)
            .into_par_iter()
            .map(|i| {
                let mut acc = 0.0;
                for j in 0..self.side {
                    acc += f64::from(self.get(i, j)) * f64::from(self.neighbor_sum(i, j));
                }
                acc
            })
            .sum()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.cells.iter().map(|c| c.load(Ordering::Relaxed)).collect()
    }
}

impl Clone for Lattice {
    fn clone(&self) -> Self {
        Lattice {
            side: self.side,
            cells: self
                .cells
                .iter()
                .map(|c| AtomicU8::new(c.load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

impl PartialEq for Lattice {
    fn eq(&self, other: &Self) -> bool {
        self.side == other.side && self.to_vec() == other.to_vec()
    }
}

impl std::fmt::Debug for Lattice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lattice")
            .field("side", &self.side)
            .finish_non_exhaustive()
    }
}

/// Target model for the 2D Ising sampler.
#[derive(Debug)]
pub struct IsingModel {
    side: usize,
    threads: usize,
}

impl IsingModel {
    pub fn new(side: usize, threads: usize) -> TpResult<Self> {
        if threads == 0 || side / threads <= 1 {
            return Err(TemperError::Config(format!(
                "{threads} sweep threads over {side} rows leaves fewer than 2 rows per band"
            )));
        }
        Ok(IsingModel { side, threads })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    /// Gibbs-update one cell in place.
    #[inline]
    fn update_cell(lat: &Lattice, i: usize, j: usize, temp: f64, rng: &mut fastrand::Rng) {
        let s = f64::from(lat.neighbor_sum(i, j));
        let up = (temp * s).exp();
        let down = (-temp * s).exp();
        let cond_p = up / (up + down);
        lat.set(i, j, u8::from(rng.f64() < cond_p));
    }

    /// Run `sweeps` full Gibbs sweeps over `lat` at `temp`.
    ///
    /// Rows are split into one contiguous band per thread. Each sweep
    /// updates every band row except the last against current in-memory
    /// values, synchronizes at a barrier, updates the band's last row (its
    /// down-neighbor row is fresh after the barrier), then synchronizes
    /// again before the next sweep. Both barriers are load-bearing.
    pub fn gibbs_sweeps(
        &self,
        lat: &Lattice,
        sweeps: usize,
        temp: f64,
        rng: &mut fastrand::Rng,
    ) -> TpResult<()> {
        let side = self.side;
        let threads = self.threads;
        debug_assert_eq!(lat.side(), side);

        let seeds: Vec<u64> = (0..threads).map(|_| rng.u64(..)).collect();
        let barrier = Barrier::new(threads);

        std::thread::scope(|scope| {
            for (tid, seed) in seeds.into_iter().enumerate() {
                let barrier = &barrier;
                scope.spawn(move || {
                    let mut rng = fastrand::Rng::with_seed(seed);
                    let low = side * tid / threads;
                    let high = (side * (tid + 1) / threads).min(side);

                    for _ in 0..sweeps {
                        for i in low..high.saturating_sub(1) {
                            for j in 0..side {
                                Self::update_cell(lat, i, j, temp, &mut rng);
                            }
                        }

                        barrier.wait();

                        let i = high - 1;
                        for j in 0..side {
                            Self::update_cell(lat, i, j, temp, &mut rng);
                        }

                        barrier.wait();
                    }
                });
            }
        });

        Ok(())
    }
}

impl TemperModel for IsingModel {
    type State = Lattice;

    fn init_state(&self, rng: &mut fastrand::Rng) -> Lattice {
        Lattice::random(self.side, rng)
    }

    fn advance(
        &self,
        state: &mut Lattice,
        steps: usize,
        temp: f64,
        rng: &mut fastrand::Rng,
    ) -> TpResult<()> {
        self.gibbs_sweeps(state, steps, temp, rng)
    }

    /// Already-exponentiated exchange weight `exp(temp * 0.5 * t(x))`.
    /// The non-log convention is deliberate and must stay paired with this
    /// model's exchange path (see `TemperModel` docs).
    fn weight(&self, state: &Lattice, temp: f64) -> f64 {
        (temp * 0.5 * state.interaction_sum()).exp()
    }
}
