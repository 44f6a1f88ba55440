//! Local chain kernels: the per-replica samplers that the tempered pool
//! advances between exchange attempts.

pub mod cipher;
pub mod ising;

pub use cipher::CipherModel;
pub use ising::{IsingModel, Lattice};

use crate::TpResult;

/// A target distribution together with its local transition kernel.
///
/// `weight` is the quantity the exchange coordinator sums for the two
/// replicas and feeds through `exp(proposed - original)`. The cipher model
/// keeps it in log-space; the Ising model returns an already-exponentiated
/// value. The two conventions are not interchangeable, so a model's
/// `weight` must only ever be combined with weights from the same model.
pub trait TemperModel: Sync {
    type State: Clone + Send;

    /// Fresh uniformly random starting state.
    fn init_state(&self, rng: &mut fastrand::Rng) -> Self::State;

    /// Advance one chain by `steps` kernel steps at fixed `temp`.
    fn advance(
        &self,
        state: &mut Self::State,
        steps: usize,
        temp: f64,
        rng: &mut fastrand::Rng,
    ) -> TpResult<()>;

    /// Exchange weight of `state` at `temp` (see trait docs for the
    /// per-model convention).
    fn weight(&self, state: &Self::State, temp: f64) -> f64;
}
