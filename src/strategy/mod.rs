//! Strategy engine: heuristic prediction and wager sizing/settlement.

pub mod predictor;
pub mod wager;

pub use predictor::{Predictor, PredictorConfig};
pub use wager::{StakeRejection, StakeTier, WagerConfig, WagerEngine};
