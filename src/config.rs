use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::pool::{Ladder, RankLayout};
use crate::{TemperError, TpResult};

/// Shape of the temperature ladder.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LadderShape {
    /// Chain 0 at unit temperature, every other chain flat at `low_temp`.
    Flat,
    /// Linear descent from 1.0 down to `low_temp`.
    Linear,
}

/// Parameters of one tempered-pool run, shared by both variants.
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct PoolParams {
    /// Outer iterations (kernel stage + exchange attempt each).
    #[arg(long, default_value_t = 150)]
    pub iterations: usize,

    /// Total logical chains in the pool.
    #[arg(long, default_value_t = 4)]
    pub chains: usize,

    /// Kernel steps per chain per iteration.
    #[arg(long, default_value_t = 250)]
    pub steps: usize,

    /// Worker ranks the pool is partitioned across.
    #[arg(long, default_value_t = 4)]
    pub ranks: usize,

    /// Temperature of the coldest non-head chain.
    #[arg(long, default_value_t = 0.1)]
    pub low_temp: f64,

    #[arg(long, value_enum, default_value_t = LadderShape::Flat)]
    pub ladder: LadderShape,

    /// Base RNG seed; each rank derives its own as `seed + rank`.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Default for PoolParams {
    fn default() -> Self {
        PoolParams {
            iterations: 150,
            chains: 4,
            steps: 250,
            ranks: 4,
            low_temp: 0.1,
            ladder: LadderShape::Flat,
            seed: None,
        }
    }
}

impl PoolParams {
    pub fn validate(&self) -> TpResult<()> {
        if self.chains == 0 || self.ranks == 0 {
            return Err(TemperError::Config(
                "chains and ranks must both be at least 1".into(),
            ));
        }
        if self.chains < self.ranks {
            return Err(TemperError::Config(format!(
                "{} chains cannot be spread over {} ranks (every rank needs one)",
                self.chains, self.ranks
            )));
        }
        // Ownership lookup divides by the per-rank base count, so a
        // remainder split would route exchanges to a rank past the last one.
        if self.chains % self.ranks != 0 {
            return Err(TemperError::Config(format!(
                "{} chains do not divide evenly over {} ranks",
                self.chains, self.ranks
            )));
        }
        if self.iterations == 0 || self.steps == 0 {
            return Err(TemperError::Config(
                "iterations and steps must both be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn layout(&self) -> RankLayout {
        RankLayout::new(self.chains, self.ranks)
    }

    pub fn build_ladder(&self) -> Ladder {
        match self.ladder {
            LadderShape::Flat => Ladder::flat(self.chains, self.low_temp),
            LadderShape::Linear => Ladder::linear(self.chains, self.low_temp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_validate() {
        assert!(PoolParams::default().validate().is_ok());
    }

    #[test]
    fn more_ranks_than_chains_is_rejected() {
        let params = PoolParams {
            chains: 2,
            ranks: 4,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(TemperError::Config(_))));
    }

    #[test]
    fn remainder_split_is_rejected() {
        // 5 chains over 2 ranks would put chain 4 on a rank that does not
        // exist as far as the exchange schedule is concerned.
        let params = PoolParams {
            chains: 5,
            ranks: 2,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(TemperError::Config(_))));

        let even = PoolParams {
            chains: 6,
            ranks: 2,
            ..Default::default()
        };
        assert!(even.validate().is_ok());
    }

    #[test]
    fn ladder_matches_shape() {
        let flat = PoolParams::default().build_ladder();
        assert_eq!(flat.temp(0), 1.0);
        assert_eq!(flat.temp(3), 0.1);

        let linear = PoolParams {
            ladder: LadderShape::Linear,
            ..Default::default()
        }
        .build_ladder();
        assert!(linear.temp(1) > linear.temp(2));
    }
}
