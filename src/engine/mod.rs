//! Core engine: the fetch → normalize → predict → settle → wager → flush cycle.
//!
//! The engine owns the session state and every collaborator it needs,
//! all injected at construction. A cycle runs start to finish without
//! interleaving: the only await point is the feed fetch, which happens
//! before any state is touched, so a cancelled or failed fetch leaves the
//! session exactly as it was.

pub mod accountant;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::feed::normalizer::normalize_batch;
use crate::feed::OutcomeFeed;
use crate::storage::SessionStore;
use crate::strategy::{Predictor, WagerEngine};
use crate::types::{EngineError, Outcome, SessionState, Wager};
use accountant::CycleReport;

/// Engine tuning that is not owned by a strategy component.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_history: usize,
    pub cycle_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_history: 200,
            cycle_interval: Duration::from_secs(30),
        }
    }
}

pub struct Engine {
    feed: Box<dyn OutcomeFeed>,
    predictor: Predictor,
    wagers: WagerEngine,
    store: SessionStore,
    state: SessionState,
    rng: StdRng,
    config: EngineConfig,
    /// Start of the most recent cycle attempt, successful or not.
    last_attempt_at: Option<DateTime<Utc>>,
}

impl Engine {
    /// Build an engine around an already-loaded session, seeding the RNG
    /// from OS entropy.
    pub fn new(
        feed: Box<dyn OutcomeFeed>,
        predictor: Predictor,
        wagers: WagerEngine,
        store: SessionStore,
        state: SessionState,
        config: EngineConfig,
    ) -> Self {
        Self::with_rng(feed, predictor, wagers, store, state, config, StdRng::from_os_rng())
    }

    /// Same as `new` with an explicit RNG (tests pin it with a seed).
    pub fn with_rng(
        feed: Box<dyn OutcomeFeed>,
        predictor: Predictor,
        wagers: WagerEngine,
        store: SessionStore,
        state: SessionState,
        config: EngineConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            feed,
            predictor,
            wagers,
            store,
            state,
            rng,
            config,
            last_attempt_at: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Run one full cycle.
    ///
    /// Fails with `FeedUnavailable` (and changes nothing) when the feed
    /// errors or none of its records can be normalized.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, EngineError> {
        self.last_attempt_at = Some(Utc::now());
        let raw = self
            .feed
            .fetch_recent()
            .await
            .map_err(|e| EngineError::FeedUnavailable(format!("{e:#}")))?;

        let batch = normalize_batch(&raw);
        if batch.is_empty() {
            warn!(received = raw.len(), "No usable records in feed batch");
            return Err(EngineError::FeedUnavailable(format!(
                "none of {} records could be normalized",
                raw.len()
            )));
        }

        // No await below this point: the rest of the cycle is applied as
        // one step.
        let bankroll_before = self.state.bankroll;
        let new_outcomes = merge_history(&mut self.state.history, &batch, self.config.max_history);

        let mut prediction = self.predictor.predict(&self.state.history, &mut self.rng);

        let settled = match new_outcomes.last() {
            Some(next) => self.settle_pending(next),
            None => Vec::new(),
        };

        let placed = self
            .wagers
            .maybe_place_wager(&prediction, self.state.bankroll);
        // The prediction must be logged first so the wager can link to it.
        self.state.predictions.push(prediction.clone());
        let placed = placed.filter(|w| self.state.open_wager(w.clone()));
        if let Some(w) = &placed {
            prediction.wager_id = Some(w.id);
        }

        self.state.cycle_count += 1;
        self.state.last_cycle_at = Some(Utc::now());

        let report = CycleReport {
            cycle_number: self.state.cycle_count,
            timestamp: Utc::now(),
            records_received: raw.len(),
            outcomes_parsed: batch.len(),
            new_outcomes: new_outcomes.len(),
            prediction,
            placed,
            settled,
            bankroll_before,
            bankroll_after: self.state.bankroll,
        };

        info!(
            cycle = report.cycle_number,
            new = report.new_outcomes,
            prediction = %report.prediction,
            staked = report.placed.as_ref().map(|w| w.stake.to_string()).unwrap_or_default(),
            settled = report.settled.len(),
            settled_profit = %report.settled_profit(),
            bankroll = %self.state.bankroll,
            "Cycle complete"
        );

        self.flush();
        Ok(report)
    }

    /// Resolve pending predictions and settle open wagers against the
    /// outcome that followed them.
    fn settle_pending(&mut self, next: &Outcome) -> Vec<Wager> {
        for p in self.state.predictions.iter_mut().filter(|p| p.is_pending()) {
            p.resolve(next.color);
        }

        let mut settled = Vec::new();
        for i in 0..self.state.wagers.len() {
            if !self.state.wagers[i].is_open() {
                continue;
            }
            let mut wager = self.state.wagers[i].clone();
            match self.wagers.settle(&mut wager, next) {
                Ok(()) => {
                    self.state.apply_settlement(&wager);
                    self.state.wagers[i] = wager.clone();
                    settled.push(wager);
                }
                Err(e) => {
                    error!(error = %e, "Settlement contract violated");
                    debug_assert!(false, "{e}");
                }
            }
        }
        settled
    }

    /// Whether an automatic cycle should run at `now`.
    ///
    /// Spacing is measured from the later of the last completed cycle and
    /// the last attempt, so a failing feed is polled no faster than
    /// `cycle_interval`.
    pub fn auto_cycle_due(&self, now: DateTime<Utc>) -> bool {
        if !self.state.auto_mode {
            return false;
        }
        match self.state.last_cycle_at.max(self.last_attempt_at) {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .map(|elapsed| elapsed >= self.config.cycle_interval)
                .unwrap_or(false),
        }
    }

    /// Flip automatic mode and persist. Returns the new mode.
    pub fn toggle_auto_mode(&mut self) -> bool {
        self.state.auto_mode = !self.state.auto_mode;
        info!(auto_mode = self.state.auto_mode, "Mode toggled");
        self.flush();
        self.state.auto_mode
    }

    /// Wipe history, logs, bankroll and counters. The mode flag is kept
    /// unless `clear_auto_mode` is set.
    pub fn reset_system(&mut self, clear_auto_mode: bool) -> &SessionState {
        self.state.reset(self.store.starting_bankroll());
        if clear_auto_mode {
            self.state.auto_mode = false;
        }
        info!(bankroll = %self.state.bankroll, auto_mode = self.state.auto_mode, "System reset");
        self.flush();
        &self.state
    }

    /// Persist the current state. Failures are logged, never propagated.
    pub fn flush(&self) -> bool {
        match self.store.save(&self.state) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to save session");
                false
            }
        }
    }
}

/// Merge a feed batch (most recent first) into `history`, skipping
/// records already present. Returns the new outcomes, most recent first.
///
/// Records with a key (source id or source timestamp) are new up to the
/// first one already in history; everything after it is older than what
/// is known, including records `max_history` has since dropped.
/// Unkeyed records are aligned by the longest overlap between the batch
/// tail and the history head.
pub fn merge_history(history: &mut Vec<Outcome>, batch: &[Outcome], max_history: usize) -> Vec<Outcome> {
    let fresh: Vec<Outcome> = if history.is_empty() {
        batch.to_vec()
    } else if batch.iter().all(|o| o.key().is_some()) {
        batch
            .iter()
            .take_while(|o| !history.iter().any(|h| h.key() == o.key()))
            .cloned()
            .collect()
    } else {
        let overlap = (0..batch.len()).find(|&start| {
            let tail = &batch[start..];
            let len = tail.len().min(history.len());
            tail[..len]
                .iter()
                .zip(&history[..len])
                .all(|(a, b)| a.same_result(b))
        });
        batch[..overlap.unwrap_or(batch.len())].to_vec()
    };

    if !fresh.is_empty() {
        debug!(count = fresh.len(), "New outcomes observed");
        history.splice(0..0, fresh.iter().cloned());
        history.truncate(max_history);
    }
    fresh
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
