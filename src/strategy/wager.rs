//! Wager engine.
//!
//! Turns a prediction into a simulated stake and later settles it:
//!
//! ```text
//! stake = min(bankroll × base_fraction × tier_multiplier(confidence), absolute_cap)
//! ```
//!
//! rounded to cents. A wager is only produced when the (adjusted)
//! confidence clears the placement threshold and the stake lies within
//! `[minimum_stake, bankroll]`. Settlement is one-shot: an open wager
//! becomes won or lost, never back.

use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::types::{Color, EngineError, Outcome, Prediction, Wager, WagerStatus};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Stake multiplier applied at or above a confidence level.
#[derive(Debug, Clone, Deserialize)]
pub struct StakeTier {
    pub min_confidence: f64,
    pub multiplier: Decimal,
}

/// Wager sizing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WagerConfig {
    /// Adjusted confidence must exceed this to place a wager.
    pub placement_threshold: f64,
    /// Fraction of bankroll staked before the tier multiplier.
    pub base_fraction: Decimal,
    /// Confidence tiers; the highest tier whose `min_confidence` is met
    /// applies, otherwise the multiplier is 1.
    pub tiers: Vec<StakeTier>,
    /// Hard ceiling on any single stake.
    pub absolute_cap: Decimal,
    pub minimum_stake: Decimal,
    /// Gross return per unit staked on a win (2.0 = even money).
    pub payout_multiplier: Decimal,
    /// Factor applied to confidence before the threshold check.
    pub confidence_adjustment: f64,
}

impl Default for WagerConfig {
    fn default() -> Self {
        Self {
            placement_threshold: 0.70,
            base_fraction: dec!(0.05),
            tiers: vec![
                StakeTier { min_confidence: 0.90, multiplier: dec!(2.0) },
                StakeTier { min_confidence: 0.80, multiplier: dec!(1.5) },
            ],
            absolute_cap: dec!(50),
            minimum_stake: dec!(1),
            payout_multiplier: dec!(2.0),
            confidence_adjustment: 1.0,
        }
    }
}

/// Why no wager was placed.
#[derive(Debug, Clone, PartialEq)]
pub enum StakeRejection {
    BelowThreshold { confidence: f64, threshold: f64 },
    BelowMinimum { stake: Decimal, minimum: Decimal },
    InsufficientBankroll { stake: Decimal, bankroll: Decimal },
}

impl fmt::Display for StakeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StakeRejection::BelowThreshold { confidence, threshold } => {
                write!(f, "confidence {confidence:.2} not above threshold {threshold:.2}")
            }
            StakeRejection::BelowMinimum { stake, minimum } => {
                write!(f, "stake {stake:.2} below minimum {minimum:.2}")
            }
            StakeRejection::InsufficientBankroll { stake, bankroll } => {
                write!(f, "stake {stake:.2} exceeds bankroll {bankroll:.2}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Wager engine
// ---------------------------------------------------------------------------

pub struct WagerEngine {
    config: WagerConfig,
}

impl WagerEngine {
    pub fn new(config: WagerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WagerConfig {
        &self.config
    }

    /// Confidence after the configured adjustment factor.
    pub fn adjusted_confidence(&self, confidence: f64) -> f64 {
        confidence * self.config.confidence_adjustment
    }

    /// Stake multiplier for a confidence level.
    pub fn tier_multiplier(&self, confidence: f64) -> Decimal {
        self.config
            .tiers
            .iter()
            .filter(|t| confidence >= t.min_confidence)
            .max_by(|a, b| a.min_confidence.total_cmp(&b.min_confidence))
            .map(|t| t.multiplier)
            .unwrap_or(Decimal::ONE)
    }

    /// Size a stake for `confidence` against `bankroll`.
    pub fn size_stake(&self, confidence: f64, bankroll: Decimal) -> Result<Decimal, StakeRejection> {
        let adjusted = self.adjusted_confidence(confidence);
        if adjusted <= self.config.placement_threshold {
            return Err(StakeRejection::BelowThreshold {
                confidence: adjusted,
                threshold: self.config.placement_threshold,
            });
        }

        let raw = bankroll * self.config.base_fraction * self.tier_multiplier(confidence);
        let stake = raw.min(self.config.absolute_cap).round_dp(2);

        if stake < self.config.minimum_stake {
            return Err(StakeRejection::BelowMinimum {
                stake,
                minimum: self.config.minimum_stake,
            });
        }
        if stake > bankroll {
            return Err(StakeRejection::InsufficientBankroll { stake, bankroll });
        }
        Ok(stake)
    }

    /// Open a wager on `prediction` if sizing allows, `None` otherwise.
    ///
    /// The returned wager is `Open`; the caller deducts the stake and logs
    /// it in one step via `SessionState::open_wager`.
    pub fn maybe_place_wager(&self, prediction: &Prediction, bankroll: Decimal) -> Option<Wager> {
        match self.size_stake(prediction.confidence, bankroll) {
            Ok(stake) => Some(Wager {
                id: Uuid::new_v4(),
                prediction_id: prediction.id,
                placed_at: Utc::now(),
                stake,
                side: prediction.side,
                confidence: prediction.confidence,
                status: WagerStatus::Open,
                payout: Decimal::ZERO,
                settled_at: None,
                outcome: None,
            }),
            Err(reason) => {
                debug!(
                    prediction_id = %prediction.id,
                    confidence = prediction.confidence,
                    reason = %reason,
                    "No wager placed"
                );
                None
            }
        }
    }

    /// Settle an open wager against the observed outcome.
    ///
    /// Won when the colors match (zero never matches). On a win the payout
    /// is `stake × (multiplier − 1)`; on a loss it is `−stake`. Settling a
    /// wager twice fails with `AlreadySettled` and leaves it untouched.
    /// The bankroll credit is applied by `SessionState::apply_settlement`.
    pub fn settle(&self, wager: &mut Wager, observed: &Outcome) -> Result<(), EngineError> {
        if !wager.is_open() {
            return Err(EngineError::AlreadySettled(wager.id));
        }

        let won = wager.side.matches(observed.color);
        wager.status = if won { WagerStatus::Won } else { WagerStatus::Lost };
        wager.payout = if won {
            wager.stake * (self.config.payout_multiplier - Decimal::ONE)
        } else {
            -wager.stake
        };
        wager.settled_at = Some(Utc::now());
        wager.outcome = Some(observed.color);

        debug!(
            wager_id = %wager.id,
            side = %wager.side,
            observed = %observed.color,
            zero = observed.color == Color::Zero,
            payout = %wager.payout,
            "Wager settled"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
