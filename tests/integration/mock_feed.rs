//! Mock outcome feed for integration testing.
//!
//! Provides a deterministic `OutcomeFeed` that serves the most recent
//! games from an in-memory table. Games are pushed explicitly or spun
//! from a seeded RNG; clones share the same table so a test can keep a
//! handle after boxing the feed into an engine.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use redblack::feed::{OutcomeFeed, RawRecord};
use redblack::types::Color;

#[derive(Clone)]
pub struct MockFeed {
    /// Games served so far, most recent first.
    games: Arc<Mutex<Vec<Value>>>,
    next_id: Arc<Mutex<u64>>,
    batch_size: usize,
    rng: Arc<Mutex<StdRng>>,
    /// If set, every fetch fails with this message.
    force_error: Arc<Mutex<Option<String>>>,
    fetches: Arc<Mutex<usize>>,
}

impl MockFeed {
    pub fn new(seed: u64) -> Self {
        Self {
            games: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1)),
            batch_size: 20,
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
            force_error: Arc::new(Mutex::new(None)),
            fetches: Arc::new(Mutex::new(0)),
        }
    }

    /// Record a game with an explicit wheel number.
    pub fn push(&self, number: u8) {
        let color = Color::from_number(number);
        let mut id = self.next_id.lock().unwrap();
        self.games.lock().unwrap().insert(
            0,
            json!({
                "id": format!("g{}", *id),
                "color": color.code(),
                "roll": number,
                "created_at": format!("2026-01-01T00:{:02}:{:02}Z", (*id / 60) % 60, *id % 60),
            }),
        );
        *id += 1;
    }

    /// Push several games, oldest first.
    pub fn push_all(&self, numbers: &[u8]) {
        for n in numbers {
            self.push(*n);
        }
    }

    /// Record a uniformly random game (0–14) and return its color.
    pub fn spin(&self) -> Color {
        let number = self.rng.lock().unwrap().random_range(0..=14u8);
        self.push(number);
        Color::from_number(number)
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl OutcomeFeed for MockFeed {
    async fn fetch_recent(&self) -> Result<Vec<RawRecord>> {
        *self.fetches.lock().unwrap() += 1;
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        let games = self.games.lock().unwrap();
        Ok(games.iter().take(self.batch_size).cloned().collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
