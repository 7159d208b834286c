//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The `[predictor]` and `[wager]` sections are optional and fall back
//! to the defaults defined next to the code that uses them.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::strategy::predictor::PredictorConfig;
use crate::strategy::wager::WagerConfig;

/// Default config file location, overridable via `REDBLACK_CONFIG`.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub session: SessionConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub wager: WagerConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub name: String,
    pub state_file: String,
    pub starting_bankroll: Decimal,
    /// Outcomes kept in history; older ones are dropped. Records the feed
    /// still returns after they were dropped are not taken back in.
    pub max_history: usize,
    /// Minimum spacing between automatic cycles.
    pub cycle_interval_secs: u64,
    /// How often the binary checks whether an automatic cycle is due.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl SessionConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "REDBLACK-001".to_string(),
            state_file: "redblack_state.json".to_string(),
            starting_bankroll: dec!(1000),
            max_history: 200,
            cycle_interval_secs: 30,
            tick_secs: default_tick_secs(),
            currency: default_currency(),
        }
    }
}

fn default_tick_secs() -> u64 {
    5
}

fn default_currency() -> String {
    "R$".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "https://blaze.bet.br/api/singleplayer-originals/originals/roulette_games/recent/1"
                .to_string(),
            timeout_secs: 10,
            user_agent: "REDBLACK/0.1.0 (outcome-feed)".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if config.session.max_history == 0 {
            anyhow::bail!("session.max_history must be at least 1");
        }
        Ok(config)
    }

    /// Config path from `REDBLACK_CONFIG`, else the default.
    pub fn path_from_env() -> String {
        std::env::var("REDBLACK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        // Requires config.toml in the working directory (the crate root
        // under `cargo test`).
        let result = AppConfig::load("config.toml");
        if let Ok(cfg) = result {
            assert_eq!(cfg.session.name, "REDBLACK-001");
            assert_eq!(cfg.session.cycle_interval_secs, 30);
            assert!(cfg.session.starting_bankroll > Decimal::ZERO);
            assert!(cfg.wager.placement_threshold > 0.5);
            assert_eq!(cfg.wager.tiers.len(), 2);
        }
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = AppConfig::parse(
            r#"
            [session]
            name = "t"
            state_file = "t.json"
            starting_bankroll = 500.0
            max_history = 100
            cycle_interval_secs = 45
            "#,
        )
        .unwrap();
        assert_eq!(cfg.session.starting_bankroll, dec!(500));
        assert_eq!(cfg.session.tick_secs, 5);
        assert_eq!(cfg.session.cycle_interval(), Duration::from_secs(45));
        assert_eq!(cfg.predictor.window_size, 15);
        assert_eq!(cfg.wager.absolute_cap, dec!(50));
        assert!(!cfg.dashboard.enabled);
        assert_eq!(cfg.feed.timeout_secs, 10);
    }

    #[test]
    fn test_partial_wager_section() {
        let cfg = AppConfig::parse(
            r#"
            [session]
            name = "t"
            state_file = "t.json"
            starting_bankroll = 100
            max_history = 100
            cycle_interval_secs = 30

            [wager]
            placement_threshold = 0.6
            payout_multiplier = 1.95
            "#,
        )
        .unwrap();
        assert_eq!(cfg.wager.placement_threshold, 0.6);
        assert_eq!(cfg.wager.payout_multiplier, dec!(1.95));
        assert_eq!(cfg.wager.minimum_stake, dec!(1));
        assert_eq!(cfg.session.starting_bankroll, dec!(100));
    }

    #[test]
    fn test_zero_max_history_is_error() {
        let err = AppConfig::parse(
            r#"
            [session]
            name = "t"
            state_file = "t.json"
            starting_bankroll = 100
            max_history = 0
            cycle_interval_secs = 30
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_history"));
    }

    #[test]
    fn test_missing_session_is_error() {
        assert!(AppConfig::parse("[dashboard]\nenabled = true\nport = 1\n").is_err());
    }
}
