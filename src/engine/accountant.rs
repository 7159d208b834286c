//! Accountant: cycle reports, session statistics and bankroll reconciliation.
//!
//! Nothing here mutates state. The engine applies money movements through
//! `SessionState`; the accountant only reads the logs back and checks that
//! they add up.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::types::{Color, Outcome, Prediction, SessionState, Wager, WagerStatus};

/// Predictions considered for method usage.
pub const METHOD_USAGE_WINDOW: usize = 20;

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// What one completed cycle did.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub timestamp: DateTime<Utc>,
    /// Raw records returned by the feed.
    pub records_received: usize,
    /// Records that survived normalization.
    pub outcomes_parsed: usize,
    /// Outcomes not previously in history.
    pub new_outcomes: usize,
    pub prediction: Prediction,
    pub placed: Option<Wager>,
    pub settled: Vec<Wager>,
    pub bankroll_before: Decimal,
    pub bankroll_after: Decimal,
}

impl CycleReport {
    /// Net profit realised by the wagers settled this cycle.
    pub fn settled_profit(&self) -> Decimal {
        self.settled.iter().map(|w| w.payout).sum()
    }
}

// ---------------------------------------------------------------------------
// Session summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColorDistribution {
    pub zero: usize,
    pub red: usize,
    pub black: usize,
}

impl ColorDistribution {
    pub fn from_history(history: &[Outcome]) -> Self {
        let mut dist = Self::default();
        for o in history {
            match o.color {
                Color::Zero => dist.zero += 1,
                Color::Red => dist.red += 1,
                Color::Black => dist.black += 1,
            }
        }
        dist
    }

    pub fn total(&self) -> usize {
        self.zero + self.red + self.black
    }

    /// Share of `color` in percent; 0.0 on empty history.
    pub fn percent(&self, color: Color) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let count = match color {
            Color::Zero => self.zero,
            Color::Red => self.red,
            Color::Black => self.black,
        };
        count as f64 / total as f64 * 100.0
    }
}

/// Read-only statistics over the whole session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub auto_mode: bool,
    pub bankroll: Decimal,
    pub starting_bankroll: Decimal,
    pub net_profit: Decimal,
    pub cycles: u64,
    pub history_len: usize,
    pub predictions_made: usize,
    pub predictions_resolved: usize,
    pub predictions_correct: usize,
    pub predictions_pending: usize,
    /// Percent of resolved predictions that were correct.
    pub prediction_accuracy: f64,
    pub wagers_placed: usize,
    pub wagers_won: u64,
    pub wagers_lost: u64,
    pub wagers_open: usize,
    /// Percent of settled wagers that won.
    pub win_rate: f64,
    pub current_win_streak: u32,
    pub current_loss_streak: u32,
    pub best_win_streak: u32,
    /// Method label → count, over the most recent predictions.
    pub method_usage: BTreeMap<String, usize>,
    pub color_distribution: ColorDistribution,
    pub open_wager: Option<Wager>,
    pub last_prediction: Option<Prediction>,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

/// Bankroll recomputed from the wager log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reconciliation {
    pub expected: Decimal,
    pub actual: Decimal,
    pub drift: Decimal,
}

impl Reconciliation {
    pub fn is_balanced(&self) -> bool {
        self.drift.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Accountant
// ---------------------------------------------------------------------------

pub struct Accountant;

impl Accountant {
    pub fn summarize(state: &SessionState) -> SessionSummary {
        let resolved = state.predictions.iter().filter(|p| p.resolved.is_some()).count();
        let correct = state
            .predictions
            .iter()
            .filter(|p| p.resolved == Some(true))
            .count();
        let accuracy = if resolved == 0 {
            0.0
        } else {
            correct as f64 / resolved as f64 * 100.0
        };

        let mut method_usage = BTreeMap::new();
        for p in state.predictions.iter().rev().take(METHOD_USAGE_WINDOW) {
            *method_usage.entry(p.method.label().to_string()).or_insert(0) += 1;
        }

        SessionSummary {
            auto_mode: state.auto_mode,
            bankroll: state.bankroll,
            starting_bankroll: state.starting_bankroll,
            net_profit: state.total_profit,
            cycles: state.cycle_count,
            history_len: state.history.len(),
            predictions_made: state.predictions.len(),
            predictions_resolved: resolved,
            predictions_correct: correct,
            predictions_pending: state.pending_predictions().count(),
            prediction_accuracy: accuracy,
            wagers_placed: state.wagers.len(),
            wagers_won: state.wins,
            wagers_lost: state.losses,
            wagers_open: state.open_wagers().count(),
            win_rate: state.win_rate(),
            current_win_streak: state.current_win_streak,
            current_loss_streak: state.current_loss_streak,
            best_win_streak: state.best_win_streak,
            method_usage,
            color_distribution: ColorDistribution::from_history(&state.history),
            open_wager: state.open_wagers().last().cloned(),
            last_prediction: state.last_prediction().cloned(),
            last_cycle_at: state.last_cycle_at,
        }
    }

    /// Recompute the bankroll from the wager log:
    /// starting − Σ stakes + Σ credits of won wagers.
    pub fn reconcile(state: &SessionState) -> Reconciliation {
        let staked: Decimal = state.wagers.iter().map(|w| w.stake).sum();
        let credited: Decimal = state
            .wagers
            .iter()
            .filter(|w| w.status == WagerStatus::Won)
            .map(|w| w.credit())
            .sum();
        let expected = state.starting_bankroll - staked + credited;
        let drift = state.bankroll - expected;

        if drift.is_zero() {
            debug!(bankroll = format!("{:.2}", state.bankroll), "Bankroll reconciled");
        } else {
            warn!(
                expected = format!("{:.2}", expected),
                actual = format!("{:.2}", state.bankroll),
                drift = %drift,
                "Bankroll drift detected"
            );
        }

        Reconciliation {
            expected,
            actual: state.bankroll,
            drift,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Method, Side};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn wager(prediction_id: Uuid, stake: Decimal) -> Wager {
        Wager {
            id: Uuid::new_v4(),
            prediction_id,
            placed_at: Utc::now(),
            stake,
            side: Side::Red,
            confidence: 0.9,
            status: WagerStatus::Open,
            payout: Decimal::ZERO,
            settled_at: None,
            outcome: None,
        }
    }

    fn settle(state: &mut SessionState, idx: usize, won: bool) {
        let w = &mut state.wagers[idx];
        w.status = if won { WagerStatus::Won } else { WagerStatus::Lost };
        w.payout = if won { w.stake * dec!(0.95) } else { -w.stake };
        let w = w.clone();
        state.apply_settlement(&w);
    }

    #[test]
    fn test_reconcile_fresh_state() {
        let state = SessionState::new(dec!(1000));
        let r = Accountant::reconcile(&state);
        assert_eq!(r.expected, dec!(1000));
        assert!(r.is_balanced());
    }

    #[test]
    fn test_reconcile_after_settlements() {
        let mut state = SessionState::new(dec!(100));
        assert!(state.open_wager(wager(Uuid::new_v4(), dec!(30))));
        settle(&mut state, 0, true);
        assert_eq!(state.bankroll, dec!(128.5));

        assert!(state.open_wager(wager(Uuid::new_v4(), dec!(6.43))));
        settle(&mut state, 1, false);
        assert!(state.open_wager(wager(Uuid::new_v4(), dec!(5))));

        let r = Accountant::reconcile(&state);
        assert_eq!(r.actual, dec!(117.07));
        assert_eq!(r.expected, dec!(117.07));
        assert!(r.is_balanced());
    }

    #[test]
    fn test_reconcile_reports_drift() {
        let mut state = SessionState::new(dec!(100));
        state.bankroll = dec!(99.99);
        let r = Accountant::reconcile(&state);
        assert_eq!(r.drift, dec!(-0.01));
        assert!(!r.is_balanced());
    }

    #[test]
    fn test_summary_counts() {
        let mut state = SessionState::new(dec!(100));
        let mut right = Prediction::new(Side::Red, 0.85, Method::StrongStreak);
        right.resolve(Color::Red);
        let mut wrong = Prediction::new(Side::Black, 0.6, Method::Frequency);
        wrong.resolve(Color::Zero);
        let pending = Prediction::new(Side::Red, 0.75, Method::MediumStreak);
        let pending_id = pending.id;
        state.predictions.extend([right, wrong, pending]);
        assert!(state.open_wager(wager(pending_id, dec!(5))));

        state.history = vec![
            Outcome::new(Color::Red, Some(1), Utc::now()),
            Outcome::new(Color::Red, Some(4), Utc::now()),
            Outcome::new(Color::Black, Some(9), Utc::now()),
            Outcome::new(Color::Zero, Some(0), Utc::now()),
        ];

        let s = Accountant::summarize(&state);
        assert_eq!(s.predictions_made, 3);
        assert_eq!(s.predictions_resolved, 2);
        assert_eq!(s.predictions_correct, 1);
        assert_eq!(s.predictions_pending, 1);
        assert_eq!(s.prediction_accuracy, 50.0);
        assert_eq!(s.wagers_open, 1);
        assert_eq!(s.open_wager.as_ref().map(|w| w.stake), Some(dec!(5)));
        assert_eq!(s.method_usage.get("frequency"), Some(&1));
        assert_eq!(s.color_distribution, ColorDistribution { zero: 1, red: 2, black: 1 });
        assert_eq!(s.color_distribution.percent(Color::Red), 50.0);
        assert_eq!(s.last_prediction.map(|p| p.method), Some(Method::MediumStreak));
    }

    #[test]
    fn test_method_usage_window() {
        let mut state = SessionState::new(dec!(100));
        for _ in 0..30 {
            state.predictions.push(Prediction::new(Side::Red, 0.5, Method::InsufficientData));
        }
        for _ in 0..5 {
            state.predictions.push(Prediction::new(Side::Red, 0.55, Method::LastReversal));
        }
        let s = Accountant::summarize(&state);
        assert_eq!(s.method_usage.values().sum::<usize>(), METHOD_USAGE_WINDOW);
        assert_eq!(s.method_usage.get("last-reversal"), Some(&5));
        assert_eq!(s.method_usage.get("insufficient-data"), Some(&15));
    }

    #[test]
    fn test_empty_distribution() {
        let d = ColorDistribution::from_history(&[]);
        assert_eq!(d.total(), 0);
        assert_eq!(d.percent(Color::Black), 0.0);
    }

    #[test]
    fn test_settled_profit() {
        let mut won = wager(Uuid::new_v4(), dec!(10));
        won.status = WagerStatus::Won;
        won.payout = dec!(10);
        let mut lost = wager(Uuid::new_v4(), dec!(4));
        lost.status = WagerStatus::Lost;
        lost.payout = dec!(-4);
        let report = CycleReport {
            cycle_number: 1,
            timestamp: Utc::now(),
            records_received: 1,
            outcomes_parsed: 1,
            new_outcomes: 1,
            prediction: Prediction::new(Side::Red, 0.5, Method::InsufficientData),
            placed: None,
            settled: vec![won, lost],
            bankroll_before: dec!(100),
            bankroll_after: dec!(110),
        };
        assert_eq!(report.settled_profit(), dec!(6));
    }
}
