//! Heuristic predictor.
//!
//! Derives the next color from the recent-outcome window through an
//! ordered rule cascade. The first rule that fires wins:
//!
//! 1. long streak (5+)        → opposite, 0.90–0.92
//! 2. strong streak (4)       → opposite, 0.85
//! 3. medium streak (3)       → opposite, 0.75
//! 4. weighted recency trend  → opposite of the dominant color, ≤ 0.82
//! 5. alternation (6+)        → opposite of the last color, 0.65–0.72
//! 6. cluster shift           → color the shift favours, 0.65–0.70
//! 7. global frequency        → more frequent color, 0.50–0.85
//! 8. final reversal          → opposite of the last color, 0.55 / 0.58
//!
//! The cascade is deterministic. Randomness is only used for the
//! insufficient-data fallback and when the final rule has no non-zero
//! color to reverse, and is drawn from the caller's RNG.

use rand::Rng;
use serde::Deserialize;
use tracing::debug;

use crate::types::{Color, Method, Outcome, Prediction, Side};

const LONG_STREAK: usize = 5;
const STRONG_STREAK: usize = 4;
const MEDIUM_STREAK: usize = 3;

const LONG_STREAK_CONFIDENCE: f64 = 0.90;
const LONG_STREAK_MAX: f64 = 0.92;
const STRONG_STREAK_CONFIDENCE: f64 = 0.85;
const MEDIUM_STREAK_CONFIDENCE: f64 = 0.75;

const TREND_POSITIONS: usize = 10;
const TREND_BASE_CONFIDENCE: f64 = 0.60;

const ALTERNATION_CONFIDENCE: f64 = 0.65;
const ALTERNATION_MAX: f64 = 0.72;

const CLUSTER_CONFIDENCE: f64 = 0.65;
const CLUSTER_MAX: f64 = 0.70;

const FREQUENCY_FLOOR: f64 = 0.50;

const PAIR_REVERSAL_CONFIDENCE: f64 = 0.58;
const LAST_REVERSAL_CONFIDENCE: f64 = 0.55;
const FALLBACK_CONFIDENCE: f64 = 0.50;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Predictor tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Outcomes examined by the window rules (most recent first).
    pub window_size: usize,
    /// Non-zero outcomes required before any rule is evaluated.
    pub min_history: usize,
    /// Weighted-sum ratio above which the trend rule fires.
    pub trend_ratio: f64,
    pub trend_cap: f64,
    /// Minimum length of a perfect alternation.
    pub alternation_min: usize,
    /// Red-count differential between window halves that must be exceeded.
    pub cluster_threshold: usize,
    pub frequency_cap: f64,
    /// Confidence gained per unit of frequency divergence.
    pub frequency_gain: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            window_size: 15,
            min_history: 3,
            trend_ratio: 1.35,
            trend_cap: 0.82,
            alternation_min: 6,
            cluster_threshold: 3,
            frequency_cap: 0.85,
            frequency_gain: 1.5,
        }
    }
}

/// Weight of window position `i` (most recent = 0) for the trend rule.
/// Strictly decreasing over the first ten positions: 2.0, 1.8, … 0.2.
pub fn recency_weight(i: usize) -> f64 {
    (2.0 - 0.2 * i as f64).max(0.2)
}

// ---------------------------------------------------------------------------
// Predictor
// ---------------------------------------------------------------------------

pub struct Predictor {
    config: PredictorConfig,
}

impl Predictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Predict the next color from `history` (most recent first).
    ///
    /// The window rules look at the first `window_size` outcomes; the
    /// frequency rule looks at the whole history.
    pub fn predict<R: Rng + ?Sized>(&self, history: &[Outcome], rng: &mut R) -> Prediction {
        let window: Vec<Color> = history
            .iter()
            .take(self.config.window_size)
            .map(|o| o.color)
            .collect();

        let non_zero = window.iter().filter(|c| **c != Color::Zero).count();
        if non_zero < self.config.min_history {
            debug!(non_zero, "Not enough history, falling back to a coin flip");
            return Prediction::new(random_side(rng), FALLBACK_CONFIDENCE, Method::InsufficientData);
        }

        let (side, confidence, method) = self
            .streak(&window)
            .or_else(|| self.weighted_trend(&window))
            .or_else(|| self.alternation(&window))
            .or_else(|| self.cluster_shift(&window))
            .or_else(|| self.frequency(history))
            .unwrap_or_else(|| self.reversal(&window, rng));

        debug!(%side, confidence, %method, window = window.len(), "Prediction made");
        Prediction::new(side, confidence, method)
    }

    /// Rules 1–3: a run of identical colors at the head of the window.
    fn streak(&self, window: &[Color]) -> Option<(Side, f64, Method)> {
        let (side, len) = head_run(window)?;
        let opposite = side.opposite();
        if len >= LONG_STREAK {
            let bonus = 0.01 * (len - LONG_STREAK) as f64;
            Some((
                opposite,
                (LONG_STREAK_CONFIDENCE + bonus).min(LONG_STREAK_MAX),
                Method::LongStreak,
            ))
        } else if len >= STRONG_STREAK {
            Some((opposite, STRONG_STREAK_CONFIDENCE, Method::StrongStreak))
        } else if len >= MEDIUM_STREAK {
            Some((opposite, MEDIUM_STREAK_CONFIDENCE, Method::MediumStreak))
        } else {
            None
        }
    }

    /// Rule 4: recency-weighted color sums over the first ten positions.
    fn weighted_trend(&self, window: &[Color]) -> Option<(Side, f64, Method)> {
        let mut red = 0.0;
        let mut black = 0.0;
        for (i, color) in window.iter().take(TREND_POSITIONS).enumerate() {
            match color {
                Color::Red => red += recency_weight(i),
                Color::Black => black += recency_weight(i),
                Color::Zero => {}
            }
        }

        let (dominant, high, low) = if red > black {
            (Side::Red, red, black)
        } else {
            (Side::Black, black, red)
        };
        if high <= low * self.config.trend_ratio {
            return None;
        }

        // Imbalance in (0, 1]: 1 when the other color is absent.
        let imbalance = (high - low) / (high + low);
        let confidence = (TREND_BASE_CONFIDENCE + 0.3 * imbalance).min(self.config.trend_cap);
        Some((dominant.opposite(), confidence, Method::WeightedTrend))
    }

    /// Rule 5: a perfect red/black alternation at the head of the window.
    fn alternation(&self, window: &[Color]) -> Option<(Side, f64, Method)> {
        let first = window.first()?.side()?;
        let mut len = 1;
        for pair in window.windows(2) {
            match (pair[0].side(), pair[1].side()) {
                (Some(a), Some(b)) if a != b => len += 1,
                _ => break,
            }
        }
        if len < self.config.alternation_min {
            return None;
        }
        let bonus = 0.01 * (len - self.config.alternation_min) as f64;
        Some((
            first.opposite(),
            (ALTERNATION_CONFIDENCE + bonus).min(ALTERNATION_MAX),
            Method::Alternation,
        ))
    }

    /// Rule 6: red count moved sharply between the older and newer half.
    fn cluster_shift(&self, window: &[Color]) -> Option<(Side, f64, Method)> {
        let half = window.len() / 2;
        if half == 0 {
            return None;
        }
        let reds = |part: &[Color]| part.iter().filter(|c| **c == Color::Red).count() as i64;
        let recent = reds(&window[..half]);
        let older = reds(&window[half..half * 2]);
        let shift = recent - older;

        if shift.unsigned_abs() as usize <= self.config.cluster_threshold {
            return None;
        }
        let side = if shift > 0 { Side::Red } else { Side::Black };
        let excess = shift.unsigned_abs() as usize - self.config.cluster_threshold - 1;
        Some((
            side,
            (CLUSTER_CONFIDENCE + 0.01 * excess as f64).min(CLUSTER_MAX),
            Method::ClusterShift,
        ))
    }

    /// Rule 7: the more frequent color across the full history.
    fn frequency(&self, history: &[Outcome]) -> Option<(Side, f64, Method)> {
        let total = history.len() as f64;
        let count = |c: Color| history.iter().filter(|o| o.color == c).count() as f64;
        let red = count(Color::Red) / total;
        let black = count(Color::Black) / total;

        if red == black {
            return None;
        }
        let (side, divergence) = if red > black {
            (Side::Red, red - black)
        } else {
            (Side::Black, black - red)
        };
        let confidence = (FREQUENCY_FLOOR + divergence * self.config.frequency_gain)
            .clamp(FREQUENCY_FLOOR, self.config.frequency_cap);
        Some((side, confidence, Method::Frequency))
    }

    /// Rule 8: reverse the most recent color.
    fn reversal<R: Rng + ?Sized>(&self, window: &[Color], rng: &mut R) -> (Side, f64, Method) {
        let last = window.first().and_then(|c| c.side());
        let previous = window.get(1).and_then(|c| c.side());
        match (last, previous) {
            (Some(a), Some(b)) if a == b => (a.opposite(), PAIR_REVERSAL_CONFIDENCE, Method::PairReversal),
            (Some(a), _) => (a.opposite(), LAST_REVERSAL_CONFIDENCE, Method::LastReversal),
            (None, _) => (random_side(rng), LAST_REVERSAL_CONFIDENCE, Method::LastReversal),
        }
    }
}

/// Leading run of one non-zero color: (side, length).
fn head_run(window: &[Color]) -> Option<(Side, usize)> {
    let side = window.first()?.side()?;
    let len = window.iter().take_while(|c| c.side() == Some(side)).count();
    Some((side, len))
}

fn random_side<R: Rng + ?Sized>(rng: &mut R) -> Side {
    if rng.random_bool(0.5) {
        Side::Red
    } else {
        Side::Black
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
