//! The tempered replica pool and the per-rank run loops.

use tracing::debug;

use crate::comm::Comm;
use crate::exchange::{classify, select_pair, Message, Role};
use crate::kernel::{CipherModel, IsingModel, TemperModel};
use crate::pool::{Ladder, RankLayout};
use crate::TpResult;

/// The replicas one rank owns, plus everything needed to advance them and
/// to execute exchange attempts with peer ranks.
pub struct TemperedPool<'a, M: TemperModel> {
    model: &'a M,
    comm: Comm<Message<M::State>>,
    layout: RankLayout,
    ladder: &'a Ladder,
    steps_per_iter: usize,
    replicas: Vec<M::State>,
    rng: fastrand::Rng,
    exchanges: usize,
}

impl<'a, M: TemperModel> TemperedPool<'a, M> {
    pub fn new(
        model: &'a M,
        comm: Comm<Message<M::State>>,
        layout: RankLayout,
        ladder: &'a Ladder,
        steps_per_iter: usize,
        seed: Option<u64>,
    ) -> Self {
        let mut rng = match seed {
            Some(s) => fastrand::Rng::with_seed(s.wrapping_add(comm.rank() as u64)),
            None => fastrand::Rng::new(),
        };

        let replicas = (0..layout.chains_on(comm.rank()))
            .map(|_| model.init_state(&mut rng))
            .collect();

        TemperedPool {
            model,
            comm,
            layout,
            ladder,
            steps_per_iter,
            replicas,
            rng,
            exchanges: 0,
        }
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    pub fn comm(&self) -> &Comm<Message<M::State>> {
        &self.comm
    }

    pub fn layout(&self) -> &RankLayout {
        &self.layout
    }

    pub fn replicas(&self) -> &[M::State] {
        &self.replicas
    }

    pub fn replica_mut(&mut self, c: usize) -> &mut M::State {
        &mut self.replicas[c]
    }

    /// Number of accepted exchanges this rank has participated in.
    pub fn exchanges(&self) -> usize {
        self.exchanges
    }

    /// Advance every locally owned replica by the configured step count at
    /// its own fixed temperature.
    pub fn advance_all(&mut self) -> TpResult<()> {
        let rank = self.comm.rank();
        for c in 0..self.replicas.len() {
            let temp = self.ladder.temp(self.layout.global_of(rank, c));
            self.model
                .advance(&mut self.replicas[c], self.steps_per_iter, temp, &mut self.rng)?;
        }
        Ok(())
    }

    /// Execute the exchange phase of iteration `iter`.
    pub fn exchange(&mut self, iter: usize) -> TpResult<()> {
        self.exchange_with_coin(iter, None)
    }

    /// Exchange phase with an optionally forced acceptance draw. `Some(0.0)`
    /// always accepts, `Some(1.0)` never does; tests use both.
    pub fn exchange_with_coin(&mut self, iter: usize, forced: Option<f64>) -> TpResult<()> {
        let (g1, g2) = select_pair(iter, self.layout.total_chains);

        match classify(&self.layout, self.comm.rank(), g1, g2) {
            Role::Skip => Ok(()),
            Role::Local => self.local_swap(g1, g2, forced),
            Role::Initiator { peer } => self.remote_initiate(g1, g2, peer, forced),
            Role::Responder { peer } => self.remote_respond(g2, peer),
        }
    }

    fn coin(&mut self, forced: Option<f64>) -> f64 {
        forced.unwrap_or_else(|| self.rng.f64())
    }

    /// Both replicas live on this rank: decide locally and swap the two
    /// state buffers (a handle swap, no deep copy).
    fn local_swap(&mut self, g1: usize, g2: usize, forced: Option<f64>) -> TpResult<()> {
        let (c1, c2) = (self.layout.local_of(g1), self.layout.local_of(g2));
        let (t1, t2) = (self.ladder.temp(g1), self.ladder.temp(g2));

        let original =
            self.model.weight(&self.replicas[c1], t1) + self.model.weight(&self.replicas[c2], t2);
        let proposed =
            self.model.weight(&self.replicas[c1], t2) + self.model.weight(&self.replicas[c2], t1);

        if self.coin(forced) < (proposed - original).exp() {
            self.replicas.swap(c1, c2);
            self.exchanges += 1;
            debug!(g1, g2, "local exchange accepted");
        }
        Ok(())
    }

    /// Initiator half of the cross-rank handshake: receive the peer state,
    /// decide, send the flag, and on acceptance ship our pre-exchange state
    /// back while installing theirs.
    fn remote_initiate(
        &mut self,
        g1: usize,
        g2: usize,
        peer: usize,
        forced: Option<f64>,
    ) -> TpResult<()> {
        let c1 = self.layout.local_of(g1);
        let (t1, t2) = (self.ladder.temp(g1), self.ladder.temp(g2));

        let w_mine_t1 = self.model.weight(&self.replicas[c1], t1);
        let w_mine_t2 = self.model.weight(&self.replicas[c1], t2);

        let other = self.comm.recv(peer)?.expect_state()?;
        let w_other_t2 = self.model.weight(&other, t2);
        let w_other_t1 = self.model.weight(&other, t1);

        let original = w_mine_t1 + w_other_t2;
        let proposed = w_mine_t2 + w_other_t1;
        let accept = self.coin(forced) < (proposed - original).exp();

        self.comm.send(peer, Message::AcceptFlag(accept))?;

        if accept {
            let mine = std::mem::replace(&mut self.replicas[c1], other);
            self.comm.send(peer, Message::StateTransfer(mine))?;
            self.exchanges += 1;
            debug!(g1, g2, peer, "remote exchange accepted");
        }
        Ok(())
    }

    /// Responder half: ship our state, await the verdict, and on acceptance
    /// install the initiator's pre-exchange state.
    fn remote_respond(&mut self, g2: usize, peer: usize) -> TpResult<()> {
        let c2 = self.layout.local_of(g2);

        self.comm
            .send(peer, Message::StateTransfer(self.replicas[c2].clone()))?;

        if self.comm.recv(peer)?.expect_flag()? {
            self.replicas[c2] = self.comm.recv(peer)?.expect_state()?;
            self.exchanges += 1;
            debug!(g2, peer, "remote exchange accepted (responder)");
        }
        Ok(())
    }
}

/// Result of one rank's decipher run. After the final broadcast every rank
/// holds the same key.
#[derive(Debug, Clone)]
pub struct DecipherOutcome {
    /// Best cipher key found by global replica 0.
    pub key: Vec<u16>,
    /// Unit-temperature log-target of `key` on the tracking rank; ranks that
    /// never owned global replica 0 report 0.0.
    pub best_value: f64,
    /// Accepted exchanges this rank took part in.
    pub exchanges: usize,
}

/// Per-rank run loop of the cipher-key search.
///
/// Each outer iteration advances every local chain, runs the exchange
/// phase, and on the rank owning global replica 0 tracks the best state
/// seen at unit temperature. The best state is broadcast at the end so all
/// ranks return an identical result.
pub fn run_decipher(
    model: &CipherModel,
    comm: Comm<Message<Vec<u16>>>,
    layout: RankLayout,
    ladder: &Ladder,
    iterations: usize,
    steps_per_iter: usize,
    seed: Option<u64>,
) -> TpResult<DecipherOutcome> {
    let root = layout.owner_of(0);
    let mut pool = TemperedPool::new(model, comm, layout, ladder, steps_per_iter, seed);

    let mut best_value = 0.0;
    let mut best_state: Option<Vec<u16>> = None;

    for iter in 0..iterations {
        pool.advance_all()?;
        pool.exchange(iter)?;

        if pool.rank() == root {
            let value = model.log_target(&pool.replicas()[0], 1.0);
            if value > best_value {
                best_value = value;
                best_state = Some(pool.replicas()[0].clone());
            }
            debug!(iter, value, best_value, "iteration complete");
        }
    }

    // Rank `root` may never have improved on the initial 0.0 bound; fall
    // back to its current replica 0 so the broadcast always carries a key.
    let local_best = if pool.rank() == root {
        Some(best_state.unwrap_or_else(|| pool.replicas()[0].clone()))
    } else {
        None
    };

    let key = pool
        .comm()
        .broadcast(root, local_best.map(Message::StateTransfer))?
        .expect_state()?;

    Ok(DecipherOutcome {
        key,
        best_value,
        exchanges: pool.exchanges(),
    })
}

/// Per-rank run loop of the Ising sampler.
///
/// Returns the `iterations x S` table of interaction energies, one row per
/// outer iteration and one column per locally owned chain, recorded right
/// after the kernel stage of each iteration.
pub fn run_ising(
    model: &IsingModel,
    comm: Comm<Message<crate::kernel::Lattice>>,
    layout: RankLayout,
    ladder: &Ladder,
    iterations: usize,
    steps_per_iter: usize,
    seed: Option<u64>,
) -> TpResult<Vec<Vec<f64>>> {
    let mut pool = TemperedPool::new(model, comm, layout, ladder, steps_per_iter, seed);

    // Align iteration start across ranks.
    pool.comm().barrier();

    let mut energies = Vec::with_capacity(iterations);
    for iter in 0..iterations {
        pool.advance_all()?;
        energies.push(
            pool.replicas()
                .iter()
                .map(|lat| lat.interaction_sum())
                .collect::<Vec<f64>>(),
        );
        pool.exchange(iter)?;
    }

    debug!(exchanges = pool.exchanges(), "ising run complete");
    Ok(energies)
}
