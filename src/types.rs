//! Shared types for the REDBLACK engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that feed, strategy, storage
//! and engine modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// Observed color of one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    Zero,
    Red,
    Black,
}

impl Color {
    /// Decode the feed's integer color code (0 = zero, 1 = red, 2 = black).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Color::Zero),
            1 => Some(Color::Red),
            2 => Some(Color::Black),
            _ => None,
        }
    }

    /// Integer code as used by the feed.
    pub fn code(&self) -> u8 {
        match self {
            Color::Zero => 0,
            Color::Red => 1,
            Color::Black => 2,
        }
    }

    /// Color implied by a wheel number: 0 is zero, 1–7 red, 8 and up black.
    pub fn from_number(number: u8) -> Self {
        match number {
            0 => Color::Zero,
            1..=7 => Color::Red,
            _ => Color::Black,
        }
    }

    /// The bettable side for this color, `None` for zero.
    pub fn side(&self) -> Option<Side> {
        match self {
            Color::Zero => None,
            Color::Red => Some(Side::Red),
            Color::Black => Some(Side::Black),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Zero => write!(f, "ZERO"),
            Color::Red => write!(f, "RED"),
            Color::Black => write!(f, "BLACK"),
        }
    }
}

/// A color that can be predicted and wagered on. Zero is never predicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Red,
    Black,
}

impl Side {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Red => Side::Black,
            Side::Black => Side::Red,
        }
    }

    /// Whether an observed color matches this side. Zero never matches.
    pub fn matches(&self, color: Color) -> bool {
        color.side() == Some(*self)
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::Red => Color::Red,
            Side::Black => Color::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Color::from(*self).fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// One observed game result, as produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Source record id, when the feed supplies one.
    #[serde(default)]
    pub id: Option<String>,
    pub color: Color,
    /// Wheel number (0 for zero, else 1–14). Absent when the feed only
    /// reported a color.
    pub number: Option<u8>,
    pub timestamp: DateTime<Utc>,
    /// True when `timestamp` was assigned at ingestion rather than
    /// supplied by the feed.
    #[serde(default)]
    pub ingested: bool,
}

impl Outcome {
    pub fn new(color: Color, number: Option<u8>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            color,
            number,
            timestamp,
            ingested: false,
        }
    }

    /// Stable identity key: the source id, else the source timestamp.
    /// `None` for records that carry neither.
    pub fn key(&self) -> Option<String> {
        match &self.id {
            Some(id) => Some(id.clone()),
            None if !self.ingested => Some(self.timestamp.to_rfc3339()),
            None => None,
        }
    }

    /// Whether two records describe the same game result value.
    pub fn same_result(&self, other: &Outcome) -> bool {
        self.color == other.color && self.number == other.number
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number {
            Some(n) => write!(f, "{} {n} @ {}", self.color, self.timestamp.format("%H:%M:%S")),
            None => write!(f, "{} @ {}", self.color, self.timestamp.format("%H:%M:%S")),
        }
    }
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// Which heuristic rule produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    InsufficientData,
    LongStreak,
    StrongStreak,
    MediumStreak,
    WeightedTrend,
    Alternation,
    ClusterShift,
    Frequency,
    PairReversal,
    LastReversal,
}

impl Method {
    pub fn label(&self) -> &'static str {
        match self {
            Method::InsufficientData => "insufficient-data",
            Method::LongStreak => "long-streak",
            Method::StrongStreak => "strong-streak",
            Method::MediumStreak => "medium-streak",
            Method::WeightedTrend => "weighted-trend",
            Method::Alternation => "alternation",
            Method::ClusterShift => "cluster-shift",
            Method::Frequency => "frequency",
            Method::PairReversal => "pair-reversal",
            Method::LastReversal => "last-reversal",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One forecast for the next outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    /// Heuristic score in [0, 1]; not a calibrated probability.
    pub confidence: f64,
    pub method: Method,
    /// `None` until the next real outcome is observed.
    pub resolved: Option<bool>,
    pub actual: Option<Color>,
    /// Wager opened on the back of this prediction, if any.
    pub wager_id: Option<Uuid>,
}

impl Prediction {
    pub fn new(side: Side, confidence: f64, method: Method) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            side,
            confidence: confidence.clamp(0.0, 1.0),
            method,
            resolved: None,
            actual: None,
            wager_id: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.resolved.is_none()
    }

    /// Record the realized outcome. Returns false if already resolved.
    pub fn resolve(&mut self, observed: Color) -> bool {
        if self.resolved.is_some() {
            return false;
        }
        self.resolved = Some(self.side.matches(observed));
        self.actual = Some(observed);
        true
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.0}% via {})",
            self.side,
            self.confidence * 100.0,
            self.method
        )
    }
}

// ---------------------------------------------------------------------------
// Wager
// ---------------------------------------------------------------------------

/// Wager lifecycle. `Open` transitions exactly once to `Won` or `Lost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WagerStatus {
    Open,
    Won,
    Lost,
}

impl fmt::Display for WagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WagerStatus::Open => write!(f, "OPEN"),
            WagerStatus::Won => write!(f, "WON"),
            WagerStatus::Lost => write!(f, "LOST"),
        }
    }
}

/// One simulated bet tied to a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wager {
    pub id: Uuid,
    pub prediction_id: Uuid,
    pub placed_at: DateTime<Utc>,
    pub stake: Decimal,
    pub side: Side,
    pub confidence: f64,
    pub status: WagerStatus,
    /// Net result: `stake × (multiplier − 1)` when won, `−stake` when lost,
    /// zero while open.
    pub payout: Decimal,
    pub settled_at: Option<DateTime<Utc>>,
    pub outcome: Option<Color>,
}

impl Wager {
    pub fn is_open(&self) -> bool {
        self.status == WagerStatus::Open
    }

    /// Amount returned to the bankroll at settlement (stake + profit when
    /// won, nothing otherwise).
    pub fn credit(&self) -> Decimal {
        match self.status {
            WagerStatus::Won => self.stake + self.payout,
            _ => Decimal::ZERO,
        }
    }
}

impl fmt::Display for Wager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:.2} on {} ({:.0}%) payout {:+.2}",
            self.status,
            self.stake,
            self.side,
            self.confidence * 100.0,
            self.payout,
        )
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// The aggregate root: everything persisted between process runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Observed outcomes, most recent first.
    pub history: Vec<Outcome>,
    /// Insertion-ordered prediction log.
    pub predictions: Vec<Prediction>,
    /// Insertion-ordered wager log.
    pub wagers: Vec<Wager>,
    pub bankroll: Decimal,
    pub starting_bankroll: Decimal,
    pub total_profit: Decimal,
    pub cycle_count: u64,
    pub wins: u64,
    pub losses: u64,
    pub current_win_streak: u32,
    pub current_loss_streak: u32,
    pub best_win_streak: u32,
    pub auto_mode: bool,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | bankroll={:.2} | profit={:+.2} | cycles={} | wagers={} (W{}/L{}) | history={}",
            if self.auto_mode { "AUTO" } else { "MANUAL" },
            self.bankroll,
            self.total_profit,
            self.cycle_count,
            self.wagers.len(),
            self.wins,
            self.losses,
            self.history.len(),
        )
    }
}

impl SessionState {
    /// Fresh state with the given starting bankroll, manual mode.
    pub fn new(starting_bankroll: Decimal) -> Self {
        Self {
            history: Vec::new(),
            predictions: Vec::new(),
            wagers: Vec::new(),
            bankroll: starting_bankroll,
            starting_bankroll,
            total_profit: Decimal::ZERO,
            cycle_count: 0,
            wins: 0,
            losses: 0,
            current_win_streak: 0,
            current_loss_streak: 0,
            best_win_streak: 0,
            auto_mode: false,
            last_cycle_at: None,
            started_at: Utc::now(),
        }
    }

    /// Clear history, logs, bankroll and counters. The auto/manual mode
    /// flag survives.
    pub fn reset(&mut self, starting_bankroll: Decimal) {
        let auto_mode = self.auto_mode;
        *self = Self::new(starting_bankroll);
        self.auto_mode = auto_mode;
    }

    /// Open a wager: deduct the stake and append to the log in one step.
    ///
    /// Refuses (returns false, state untouched) when the stake is not
    /// covered by the bankroll or the wager is not open.
    pub fn open_wager(&mut self, wager: Wager) -> bool {
        if !wager.is_open() || wager.stake <= Decimal::ZERO || wager.stake > self.bankroll {
            return false;
        }
        self.bankroll -= wager.stake;
        if let Some(p) = self
            .predictions
            .iter_mut()
            .find(|p| p.id == wager.prediction_id)
        {
            p.wager_id = Some(wager.id);
        }
        self.wagers.push(wager);
        true
    }

    /// Apply a freshly settled wager to bankroll, profit and streak counters.
    pub fn apply_settlement(&mut self, wager: &Wager) {
        self.bankroll += wager.credit();
        self.total_profit += wager.payout;
        match wager.status {
            WagerStatus::Won => {
                self.wins += 1;
                self.current_win_streak += 1;
                self.current_loss_streak = 0;
                self.best_win_streak = self.best_win_streak.max(self.current_win_streak);
            }
            WagerStatus::Lost => {
                self.losses += 1;
                self.current_loss_streak += 1;
                self.current_win_streak = 0;
            }
            WagerStatus::Open => {}
        }
    }

    pub fn open_wagers(&self) -> impl Iterator<Item = &Wager> {
        self.wagers.iter().filter(|w| w.is_open())
    }

    pub fn pending_predictions(&self) -> impl Iterator<Item = &Prediction> {
        self.predictions.iter().filter(|p| p.is_pending())
    }

    pub fn last_prediction(&self) -> Option<&Prediction> {
        self.predictions.last()
    }

    /// Wager win rate as a percentage. Returns 0.0 if nothing settled.
    pub fn win_rate(&self) -> f64 {
        let settled = self.wins + self.losses;
        if settled == 0 {
            0.0
        } else {
            (self.wins as f64 / settled as f64) * 100.0
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Engine-level failures surfaced to callers of a cycle.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("Wager {0} is already settled")]
    AlreadySettled(Uuid),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
