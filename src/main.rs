//! Spoofr
//!
//! Mimics Pwnagotchi units (Wi-Fi SSID) and Flipper Zeros (Bluetooth name)
//! reported by the detector, logs every spoof with GPS data, and puts the
//! original identity back when nothing is left to mimic or on shutdown.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          SPOOFR                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌──────────────────────┐  │
//! │  │ Poll loop  │   │ Display    │   │ Control API (Axum)   │  │
//! │  │ (interval) │   │ refresh    │   │ /spoofr, /health     │  │
//! │  └─────┬──────┘   └─────┬──────┘   └──────────┬───────────┘  │
//! │        └────────────────┼─────────────────────┘              │
//! │                         ▼                                    │
//! │                  ┌─────────────┐                             │
//! │                  │ SpoofEngine │── JSONL transition log      │
//! │                  └──────┬──────┘                             │
//! │       ┌─────────────────┼──────────────────┐                 │
//! │       ▼                 ▼                  ▼                 │
//! │  Detector file    SystemDriver         gpsd (optional)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod driver;
mod engine;
mod error;
mod handlers;
mod models;
mod presenter;
mod recorder;
mod sources;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, routing::get};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use driver::SystemDriver;
use engine::{PollOutcome, SpoofEngine};
use presenter::StatusWidget;
use recorder::TransitionLog;
use sources::{DetectorFile, GpsdProvider, LocationProvider, NoLocation};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "spoofr=debug,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if !config.enabled {
        tracing::info!("Spoofr is disabled (SPOOFR_ENABLED=false)");
        return Ok(());
    }

    tracing::info!("Spoofr v{} starting...", env!("CARGO_PKG_VERSION"));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let engine = Arc::new(build_engine(&config));

    let poller = tokio::spawn(poll_loop(
        engine.clone(),
        Duration::from_secs(config.check_interval_secs),
    ));
    let display = tokio::spawn(display_loop(
        engine.clone(),
        config.widget(),
        Duration::from_secs(config.display_refresh_secs),
    ));

    let app = create_router(AppState { engine: engine.clone() });
    tracing::info!("Control endpoint listening on http://{}/spoofr", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    poller.abort();
    display.abort();

    // Waits for any in-flight poll; afterwards nothing can re-apply a spoof
    match tokio::task::spawn_blocking(move || engine.shutdown()).await? {
        Ok(true) => tracing::info!("Original identity restored"),
        Ok(false) => tracing::info!("Nothing to restore"),
        Err(e) => tracing::error!("Failed to restore original identity: {}", e),
    }

    served.context("Control endpoint failed")
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SpoofEngine>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route(
            "/spoofr",
            get(handlers::spoofr::status).post(handlers::spoofr::control),
        )
        .route("/spoofr/dashboard", get(handlers::dashboard::page))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

fn build_engine(config: &Config) -> SpoofEngine {
    let driver = Arc::new(SystemDriver::new(
        &config.wifi_interface,
        &config.bluetooth_interface,
        &config.hostapd_conf,
        &config.hostapd_service,
        config.use_sudo,
    ));
    let candidates = Arc::new(DetectorFile::new(&config.candidates_file));
    let location = connect_location(config);
    let log = TransitionLog::open(&config.log_file);

    let engine = SpoofEngine::initialize(config.engine_settings(), driver, candidates, location, log);

    if !engine.original().is_complete() {
        tracing::warn!("Original identity only partly known; unknown fields will not be restored");
    }

    let settings = engine.settings();
    tracing::info!(
        interval = ?settings.poll_interval,
        hold = ?settings.hold_duration,
        targets = ?settings.targets,
        randomize_mac = settings.randomize_mac,
        "Engine ready"
    );

    engine
}

fn connect_location(config: &Config) -> Arc<dyn LocationProvider> {
    if !config.gps_enabled {
        tracing::info!("GPS disabled");
        return Arc::new(NoLocation);
    }

    match GpsdProvider::connect(&config.gpsd_host, config.gpsd_port) {
        Ok(provider) => {
            tracing::info!("GPSD connected at {}:{}", config.gpsd_host, config.gpsd_port);
            Arc::new(provider)
        }
        Err(e) => {
            tracing::error!("Failed to connect to GPSD: {}", e);
            Arc::new(NoLocation)
        }
    }
}

/// Poll the detector forever. Sleeping after each poll keeps consecutive
/// polls at least `period` apart, so the engine never rate-limits them.
async fn poll_loop(engine: Arc<SpoofEngine>, period: Duration) {
    loop {
        let worker = engine.clone();
        match tokio::task::spawn_blocking(move || worker.tick()).await {
            Ok(PollOutcome::Applied(record)) => tracing::info!(identity = %record, "Now spoofing"),
            Ok(PollOutcome::ApplyFailed(record)) => tracing::warn!(identity = %record, "Spoof attempt failed"),
            Ok(outcome) => tracing::debug!(?outcome, "Poll finished"),
            Err(e) => tracing::error!("Poll task failed: {}", e),
        }

        tokio::time::sleep(period).await;
    }
}

/// Stand-in for the screen: emits the status text whenever it changes
async fn display_loop(engine: Arc<SpoofEngine>, widget: StatusWidget, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    let mut shown = String::new();

    loop {
        ticker.tick().await;

        let text = engine.status_text();
        if text != shown {
            tracing::info!(
                target: "spoofr::display",
                x = widget.position.0,
                y = widget.position.1,
                font = %widget.font,
                "{}",
                text.replace('\n', " | ")
            );
            shown = text;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, reverting...");
}
