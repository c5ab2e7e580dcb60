#![deny(warnings)]

//! Headless driver for the health dashboard.
//!
//! Mounts the dashboard against the configured server (or the built-in demo
//! store with `--demo`), pumps background jobs until the initial fetches
//! settle and logs what a renderer would show. `--ask <text>` also sends one
//! chat message and logs the transcript.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use healthwatch::chat::ChatSession;
use healthwatch::config;
use healthwatch::dashboard::{DashboardController, ViewMode};
use healthwatch::gateway::{HealthBackend, HttpGateway, InMemoryBackend};
use healthwatch::jobs::ThreadSpawner;
use healthwatch::logging;
use healthwatch::model::FeedId;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const SETTLE_TIMEOUT: Duration = Duration::from_secs(20);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let demo = args.iter().any(|arg| arg == "--demo");
    let question = args
        .iter()
        .position(|arg| arg == "--ask")
        .and_then(|idx| args.get(idx + 1))
        .cloned();

    let cfg = config::load_or_default()?;
    let backend: Arc<dyn HealthBackend> = if demo {
        tracing::info!("Using the in-memory demo store");
        Arc::new(InMemoryBackend::demo())
    } else {
        tracing::info!("Using server at {}", cfg.server.base_url);
        Arc::new(HttpGateway::new(&cfg.server)?)
    };
    let spawner = Arc::new(ThreadSpawner);

    let mut dashboard =
        DashboardController::new(Arc::clone(&backend), spawner.clone(), cfg.dashboard.clone());
    dashboard.mount();
    pump(&mut dashboard);
    for feed in FeedId::ALL {
        dashboard.set_mode(feed, ViewMode::Full);
    }
    pump(&mut dashboard);
    log_snapshot(&dashboard);

    if let Some(question) = question {
        let mut chat = ChatSession::new(backend, spawner);
        chat.load_history();
        chat.submit(&question)?;
        let deadline = Instant::now() + SETTLE_TIMEOUT;
        while chat.is_pending() && Instant::now() < deadline {
            chat.poll_background_jobs();
            thread::sleep(POLL_INTERVAL);
        }
        chat.poll_background_jobs();
        if let Some(err) = chat.last_error() {
            tracing::warn!("Chat failed: {err}");
        }
        for turn in chat.transcript().entries() {
            tracing::info!("{:?}: {}", turn.speaker, turn.text);
        }
    }
    Ok(())
}

/// Apply completions until nothing is outstanding or the timeout passes.
fn pump(dashboard: &mut DashboardController) {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    loop {
        dashboard.poll_background_jobs();
        dashboard.tick(Instant::now());
        if dashboard.is_idle() {
            break;
        }
        if Instant::now() >= deadline {
            tracing::warn!("Gave up waiting for the dashboard to settle");
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn log_snapshot(dashboard: &DashboardController) {
    for feed in FeedId::ALL {
        let cache = dashboard.cache(feed);
        tracing::info!(
            "{}: {} summary items",
            dashboard.feed_heading(feed),
            cache.summary_items().len()
        );
        if let Some((first, last, total)) = dashboard.page_range(feed) {
            tracing::info!("  Showing {first} to {last} of {total}");
        }
    }
    let alerts = dashboard.alerts();
    for alert in alerts.items() {
        tracing::info!("Alert [{:?}] {}: {}", alert.severity, alert.title, alert.message);
    }
    for notification in dashboard.notifications().iter() {
        tracing::info!("Notice [{:?}] {}", notification.tone, notification.text);
    }
}
