//! Rank-to-rank messaging for the worker cluster.
//!
//! Worker ranks are threads connected by one FIFO channel per ordered rank
//! pair, so a blocking `recv` names its source exactly like a point-to-point
//! receive. There is no timeout: a mismatched send/receive sequence blocks
//! forever, which is the accepted fatal condition for protocol violations.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier};

use crate::{TemperError, TpResult};

/// Per-rank communication endpoint over typed messages `M`.
pub struct Comm<M> {
    rank: usize,
    size: usize,
    txs: Vec<Sender<M>>,
    rxs: Vec<Receiver<M>>,
    barrier: Arc<Barrier>,
}

impl<M: Send> Comm<M> {
    /// Build a fully connected mesh of `size` endpoints.
    pub fn mesh(size: usize) -> Vec<Comm<M>> {
        assert!(size >= 1, "cluster needs at least one rank");

        let barrier = Arc::new(Barrier::new(size));
        let mut senders: Vec<Vec<Sender<M>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut receivers: Vec<Vec<Receiver<M>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();

        for src in 0..size {
            for dst in 0..size {
                let (tx, rx) = channel();
                senders[src].push(tx);
                receivers[dst].push(rx);
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (txs, rxs))| Comm {
                rank,
                size,
                txs,
                rxs,
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Send one message to `dst`. Never blocks.
    pub fn send(&self, dst: usize, msg: M) -> TpResult<()> {
        self.txs[dst]
            .send(msg)
            .map_err(|_| TemperError::Protocol(format!("rank {dst} hung up")))
    }

    /// Blocking receive of the next message sent by `src`.
    pub fn recv(&self, src: usize) -> TpResult<M> {
        self.rxs[src]
            .recv()
            .map_err(|_| TemperError::Protocol(format!("rank {src} hung up")))
    }

    /// Wait until every rank reaches this point.
    pub fn barrier(&self) {
        self.barrier.wait();
    }
}

impl<M: Send + Clone> Comm<M> {
    /// One-to-all broadcast: `root` supplies the value, every rank returns it.
    pub fn broadcast(&self, root: usize, value: Option<M>) -> TpResult<M> {
        if self.rank == root {
            let value = value
                .ok_or_else(|| TemperError::Protocol("broadcast root has no value".into()))?;
            for dst in 0..self.size {
                if dst != self.rank {
                    self.send(dst, value.clone())?;
                }
            }
            Ok(value)
        } else {
            self.recv(root)
        }
    }
}

/// Launches one thread per rank and joins them in rank order.
pub struct Cluster;

impl Cluster {
    pub fn launch<M, T, F>(ranks: usize, f: F) -> TpResult<Vec<T>>
    where
        M: Send,
        T: Send,
        F: Fn(Comm<M>) -> TpResult<T> + Send + Sync,
    {
        let comms = Comm::mesh(ranks);

        std::thread::scope(|s| {
            let f = &f;
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| s.spawn(move || f(comm)))
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(rank, h)| {
                    h.join()
                        .map_err(|_| TemperError::Protocol(format!("rank {rank} panicked")))?
                })
                .collect()
        })
    }
}
