//! Exchange-coordination vocabulary: the deterministic pair-selection
//! schedule, the ownership classification, and the typed messages of the
//! cross-rank swap handshake.

use crate::pool::RankLayout;
use crate::{TemperError, TpResult};

/// Wire alphabet of the two-phase swap handshake. The protocol carries
/// full replica states and single accept flags, nothing else.
#[derive(Debug, Clone)]
pub enum Message<S> {
    StateTransfer(S),
    AcceptFlag(bool),
}

impl<S> Message<S> {
    pub fn expect_state(self) -> TpResult<S> {
        match self {
            Message::StateTransfer(state) => Ok(state),
            Message::AcceptFlag(_) => Err(TemperError::Protocol(
                "expected StateTransfer, received AcceptFlag".into(),
            )),
        }
    }

    pub fn expect_flag(self) -> TpResult<bool> {
        match self {
            Message::AcceptFlag(flag) => Ok(flag),
            Message::StateTransfer(_) => Err(TemperError::Protocol(
                "expected AcceptFlag, received StateTransfer".into(),
            )),
        }
    }
}

/// Global indices of the two replicas attempting an exchange at `iter`.
///
/// Replica 0 participates in every attempt. The partner walks the pool as
/// `iter % total`, stepping onto replica 1 whenever the walk lands on 0,
/// except that a single-replica pool deterministically self-exchanges
/// (a guaranteed no-op).
pub fn select_pair(iter: usize, total: usize) -> (usize, usize) {
    let second = if total == 1 {
        0
    } else if iter % total == 0 {
        1
    } else {
        iter % total
    };
    (0, second)
}

/// What part the current rank plays in one exchange attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Neither selected replica is owned here.
    Skip,
    /// Both replicas owned here; swap is rank-local.
    Local,
    /// This rank owns replica `g1` and drives the handshake with `peer`.
    Initiator { peer: usize },
    /// This rank owns replica `g2` and answers the initiator at `peer`.
    Responder { peer: usize },
}

/// Classify the current rank for the pair `(g1, g2)` under `layout`.
pub fn classify(layout: &RankLayout, rank: usize, g1: usize, g2: usize) -> Role {
    let r1 = layout.owner_of(g1);
    let r2 = layout.owner_of(g2);

    if r1 != rank && r2 != rank {
        Role::Skip
    } else if r1 == r2 {
        Role::Local
    } else if rank == r1 {
        Role::Initiator { peer: r2 }
    } else {
        Role::Responder { peer: r1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 4, (0, 1))]
    #[case(1, 4, (0, 1))]
    #[case(2, 4, (0, 2))]
    #[case(3, 4, (0, 3))]
    #[case(4, 4, (0, 1))]
    #[case(7, 4, (0, 3))]
    fn schedule_walks_the_pool(#[case] iter: usize, #[case] total: usize, #[case] want: (usize, usize)) {
        assert_eq!(select_pair(iter, total), want);
    }

    #[test]
    fn single_replica_pool_self_exchanges() {
        for iter in 0..10 {
            assert_eq!(select_pair(iter, 1), (0, 0));
        }
    }

    #[test]
    fn classification_covers_all_roles() {
        // 4 chains over 2 ranks: rank 0 owns {0,1}, rank 1 owns {2,3}.
        let layout = RankLayout::new(4, 2);

        assert_eq!(classify(&layout, 0, 0, 1), Role::Local);
        assert_eq!(classify(&layout, 1, 0, 1), Role::Skip);
        assert_eq!(classify(&layout, 0, 0, 2), Role::Initiator { peer: 1 });
        assert_eq!(classify(&layout, 1, 0, 2), Role::Responder { peer: 0 });
    }

    #[test]
    fn mismatched_message_is_a_protocol_error() {
        let msg: Message<Vec<u16>> = Message::AcceptFlag(true);
        assert!(msg.expect_state().is_err());

        let msg: Message<Vec<u16>> = Message::StateTransfer(vec![1, 2]);
        assert!(msg.expect_flag().is_err());
    }
}
