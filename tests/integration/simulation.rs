//! Multi-cycle simulation harness.
//!
//! Drives the full fetch → predict → settle → wager loop against the
//! mock feed and checks the bankroll against the wager log after every
//! cycle.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::path::PathBuf;

use redblack::engine::accountant::Accountant;
use redblack::engine::{Engine, EngineConfig};
use redblack::storage::SessionStore;
use redblack::strategy::{Predictor, PredictorConfig, WagerConfig, WagerEngine};
use redblack::types::{Color, EngineError, Method, Side, WagerStatus};

use crate::mock_feed::MockFeed;

fn temp_path() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("redblack_sim_{}.json", uuid::Uuid::new_v4()));
    p
}

fn build_engine(feed: &MockFeed, path: &PathBuf, bankroll: Decimal, wager: WagerConfig) -> Engine {
    let store = SessionStore::new(path.clone(), bankroll);
    let state = store.load();
    Engine::with_rng(
        Box::new(feed.clone()),
        Predictor::new(PredictorConfig::default()),
        WagerEngine::new(wager),
        store,
        state,
        EngineConfig {
            max_history: 50,
            ..EngineConfig::default()
        },
        StdRng::seed_from_u64(99),
    )
}

#[tokio::test]
async fn test_long_run_reconciles_every_cycle() {
    let feed = MockFeed::new(2026);
    let path = temp_path();
    let mut engine = build_engine(&feed, &path, dec!(1000), WagerConfig::default());

    for cycle in 0..300u32 {
        // Some cycles see no new game, some see several.
        for _ in 0..(cycle % 3) {
            feed.spin();
        }
        if cycle == 0 {
            feed.spin();
        }

        engine.run_cycle().await.expect("feed has games");

        let state = engine.state();
        let r = Accountant::reconcile(state);
        assert!(r.is_balanced(), "cycle {cycle}: drift {}", r.drift);
        assert!(state.bankroll >= Decimal::ZERO);
        assert!(state.history.len() <= 50);
    }

    let state = engine.state();
    assert_eq!(state.cycle_count, 300);
    assert_eq!(state.predictions.len(), 300);

    // Every wager belongs to exactly one prediction, and links back.
    let mut seen = HashSet::new();
    for w in &state.wagers {
        assert!(seen.insert(w.prediction_id), "two wagers on one prediction");
        let p = state
            .predictions
            .iter()
            .find(|p| p.id == w.prediction_id)
            .expect("wager prediction exists");
        assert_eq!(p.wager_id, Some(w.id));
        assert!(w.stake <= dec!(50));
        assert!(w.stake >= dec!(1));
        match w.status {
            WagerStatus::Open => assert!(w.outcome.is_none()),
            WagerStatus::Won => assert_eq!(w.payout, w.stake),
            WagerStatus::Lost => assert_eq!(w.payout, -w.stake),
        }
    }

    let settled = state.wagers.iter().filter(|w| !w.is_open()).count() as u64;
    assert_eq!(state.wins + state.losses, settled);
    let profit: Decimal = state.wagers.iter().map(|w| w.payout).sum();
    assert_eq!(state.total_profit, profit);

    // No prediction ever names zero.
    assert!(state
        .predictions
        .iter()
        .all(|p| matches!(p.side, Side::Red | Side::Black)));

    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn test_feed_failure_leaves_state_untouched() {
    let feed = MockFeed::new(1);
    let path = temp_path();
    let mut engine = build_engine(&feed, &path, dec!(1000), WagerConfig::default());

    feed.push_all(&[3, 9, 10, 11, 12]);
    engine.run_cycle().await.unwrap();

    let before_mem = serde_json::to_string(engine.state()).unwrap();
    let before_disk = std::fs::read_to_string(&path).unwrap();

    feed.set_error("upstream timeout");
    feed.push(4);
    let err = engine.run_cycle().await.unwrap_err();
    assert!(matches!(err, EngineError::FeedUnavailable(_)));
    assert_eq!(feed.fetch_count(), 2);

    assert_eq!(serde_json::to_string(engine.state()).unwrap(), before_mem);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before_disk);

    // Recovery picks up the game that arrived during the outage.
    feed.clear_error();
    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.new_outcomes, 1);
    assert_eq!(engine.state().cycle_count, 2);

    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn test_empty_feed_is_unavailable() {
    let feed = MockFeed::new(1);
    let path = temp_path();
    let mut engine = build_engine(&feed, &path, dec!(1000), WagerConfig::default());

    let err = engine.run_cycle().await.unwrap_err();
    assert!(matches!(err, EngineError::FeedUnavailable(_)));
    assert_eq!(engine.state().cycle_count, 0);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_worked_example_win() {
    // Five blacks then a red arrives: long-streak call on red at 0.90,
    // stake 100 × 0.15 × 2.0 = 30, win pays 30 × 0.95.
    let feed = MockFeed::new(1);
    let path = temp_path();
    let wager = WagerConfig {
        base_fraction: dec!(0.15),
        payout_multiplier: dec!(1.95),
        ..WagerConfig::default()
    };
    let mut engine = build_engine(&feed, &path, dec!(100), wager);

    feed.push_all(&[4, 8, 9, 10, 11, 12]);
    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.prediction.method, Method::LongStreak);
    assert_eq!(report.prediction.side, Side::Red);
    let placed = report.placed.expect("wager placed");
    assert_eq!(placed.stake, dec!(30));
    assert_eq!(engine.state().bankroll, dec!(70));

    feed.push(5);
    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.settled.len(), 1);
    let settled = &report.settled[0];
    assert_eq!(settled.id, placed.id);
    assert_eq!(settled.status, WagerStatus::Won);
    assert_eq!(settled.payout, dec!(28.5));
    assert_eq!(settled.outcome, Some(Color::Red));

    let state = engine.state();
    let open: Decimal = state.open_wagers().map(|w| w.stake).sum();
    assert_eq!(state.bankroll + open, dec!(128.5));
    assert_eq!(state.total_profit, dec!(28.5));
    assert_eq!(state.wins, 1);
    assert_eq!(state.predictions[0].resolved, Some(true));

    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn test_zero_loses_open_wager() {
    let feed = MockFeed::new(1);
    let path = temp_path();
    let mut engine = build_engine(&feed, &path, dec!(1000), WagerConfig::default());

    feed.push_all(&[4, 8, 9, 10, 11]);
    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.prediction.side, Side::Red);
    assert!(report.placed.is_some());

    feed.push(0);
    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.settled[0].status, WagerStatus::Lost);
    assert_eq!(report.settled[0].outcome, Some(Color::Zero));
    assert_eq!(engine.state().predictions[0].resolved, Some(false));
    assert_eq!(engine.state().losses, 1);
    assert_eq!(engine.state().current_loss_streak, 1);
    assert!(Accountant::reconcile(engine.state()).is_balanced());

    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn test_restart_resumes_session() {
    let feed = MockFeed::new(5);
    let path = temp_path();

    let (cycles, bankroll, predictions) = {
        let mut engine = build_engine(&feed, &path, dec!(1000), WagerConfig::default());
        for _ in 0..10 {
            feed.spin();
            engine.run_cycle().await.unwrap();
        }
        let s = engine.state();
        (s.cycle_count, s.bankroll, s.predictions.len())
    };

    let mut engine = build_engine(&feed, &path, dec!(1000), WagerConfig::default());
    assert_eq!(engine.state().cycle_count, cycles);
    assert_eq!(engine.state().bankroll, bankroll);
    assert_eq!(engine.state().predictions.len(), predictions);

    // Nothing new since the restart: the history is not double-counted.
    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.new_outcomes, 0);
    assert!(Accountant::reconcile(engine.state()).is_balanced());

    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn test_reset_restores_starting_state() {
    let feed = MockFeed::new(8);
    let path = temp_path();
    let mut engine = build_engine(&feed, &path, dec!(1000), WagerConfig::default());

    engine.toggle_auto_mode();
    for _ in 0..20 {
        feed.spin();
        engine.run_cycle().await.unwrap();
    }

    engine.reset_system(false);
    let state = engine.state();
    assert_eq!(state.bankroll, dec!(1000));
    assert_eq!(state.total_profit, Decimal::ZERO);
    assert_eq!(state.cycle_count, 0);
    assert!(state.history.is_empty());
    assert!(state.predictions.is_empty());
    assert!(state.wagers.is_empty());
    assert!(state.auto_mode);

    // The reset is persisted.
    let saved = SessionStore::new(path.clone(), dec!(1000)).try_load().unwrap().unwrap();
    assert_eq!(saved.cycle_count, 0);
    assert!(saved.auto_mode);

    // The next cycle rebuilds history from the feed.
    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.new_outcomes, 20);

    std::fs::remove_file(&path).ok();
}
