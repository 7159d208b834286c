//! REDBLACK: roulette outcome predictor and bankroll simulator.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the session from disk (or starts fresh), and polls for due
//! automatic cycles until Ctrl+C, flushing the session on the way out.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use redblack::config::AppConfig;
use redblack::dashboard::{self, DashboardState};
use redblack::engine::accountant::Accountant;
use redblack::engine::{Engine, EngineConfig};
use redblack::feed::http::HttpFeed;
use redblack::feed::OutcomeFeed;
use redblack::storage::SessionStore;
use redblack::strategy::{Predictor, WagerEngine};

const BANNER: &str = r#"
 ____  _____ ____  ____  _        _    ____ _  __
|  _ \| ____|  _ \| __ )| |      / \  / ___| |/ /
| |_) |  _| | | | |  _ \| |     / _ \| |   | ' /
|  _ <| |___| |_| | |_) | |___ / ___ \ |___| . \
|_| \_\_____|____/|____/|_____/_/   \_\____|_|\_\

  Roulette outcome predictor and bankroll simulator
  v0.1.0 (simulated money only)
"#;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load(&AppConfig::path_from_env())?;

    init_logging();

    println!("{BANNER}");
    info!(
        session = %cfg.session.name,
        cycle_interval_secs = cfg.session.cycle_interval_secs,
        starting_bankroll = %cfg.session.starting_bankroll,
        currency = %cfg.session.currency,
        "REDBLACK starting up"
    );

    // -- Restore or create state -----------------------------------------

    let store = SessionStore::new(&cfg.session.state_file, cfg.session.starting_bankroll);
    let state = store.load();

    // -- Initialise components -------------------------------------------

    let feed = HttpFeed::new(&cfg.feed)?;
    info!(feed = feed.name(), url = %cfg.feed.url, "Outcome feed ready");

    let engine = Engine::new(
        Box::new(feed),
        Predictor::new(cfg.predictor.clone()),
        WagerEngine::new(cfg.wager.clone()),
        store,
        state,
        EngineConfig {
            max_history: cfg.session.max_history,
            cycle_interval: cfg.session.cycle_interval(),
        },
    );
    let shared = Arc::new(DashboardState::new(engine));

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(shared.clone(), cfg.dashboard.port);
    }

    // -- Main loop -------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.session.tick_secs.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    {
        let engine = shared.engine.lock().await;
        info!(
            auto_mode = engine.state().auto_mode,
            tick_secs = cfg.session.tick_secs,
            "Entering main loop. Press Ctrl+C to stop."
        );
    }

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let mut engine = shared.engine.lock().await;
                if !engine.auto_cycle_due(Utc::now()) {
                    continue;
                }
                if let Err(e) = engine.run_cycle().await {
                    warn!(error = %e, "Cycle failed, continuing to next");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    let engine = shared.engine.lock().await;
    engine.flush();
    let summary = Accountant::summarize(engine.state());
    let reconciliation = Accountant::reconcile(engine.state());
    info!(
        bankroll = format!("{} {:.2}", cfg.session.currency, summary.bankroll),
        profit = format!("{} {:+.2}", cfg.session.currency, summary.net_profit),
        cycles = summary.cycles,
        wagers = summary.wagers_placed,
        win_rate = format!("{:.1}%", summary.win_rate),
        accuracy = format!("{:.1}%", summary.prediction_accuracy),
        drift = %reconciliation.drift,
        "REDBLACK shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("redblack=info"));

    if std::env::var("REDBLACK_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
