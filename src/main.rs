// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::trace::TraceLayer;

use crate::application::feed_controller::FeedController;
use crate::application::target_store::TargetStore;
use crate::domain::synthetic::SyntheticGenerator;
use crate::infrastructure::config::{load_settings, resolve_initial_target, TargetSource};
use crate::infrastructure::file_target_store::FileTargetStore;
use crate::infrastructure::websocket_transport::WebSocketTransport;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    connect, health_check, mode, mode_events, start_demo, stop, telemetry,
};

#[derive(Parser, Debug)]
#[command(name = "turbine-telemetry")]
#[command(about = "Live turbine telemetry feed with synthetic fallback")]
#[command(version)]
struct CliArgs {
    /// Live feed to connect to at startup; takes priority over the saved URL
    #[arg(long, env = "TURBINE_FEED_URL")]
    feed_url: Option<String>,

    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    bind: Option<String>,

    /// Settings file, extension optional
    #[arg(long, default_value = "config/dashboard")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    // Load configuration
    let settings = load_settings(&args.config)?;

    // Create adapters (infrastructure layer)
    let store = Arc::new(FileTargetStore::new(&settings.feed.state_file));
    let transport = Arc::new(WebSocketTransport::new());

    let saved = store.load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring saved feed target");
        None
    });

    // Create controller (application layer)
    let feed = FeedController::new(
        settings.feed_options(),
        transport,
        store.clone(),
        settings
            .feed
            .synthetic_seed
            .map(SyntheticGenerator::seeded)
            .unwrap_or_default(),
    );

    // An explicit URL counts as user-entered and is remembered; saved and
    // build-default targets are only connected to.
    let initial = resolve_initial_target(
        args.feed_url.as_deref(),
        saved.as_deref(),
        settings.feed.default_url.as_deref(),
    );
    match initial {
        Some(target) if target.source == TargetSource::Explicit => feed.enter_target(&target.url),
        Some(target) => {
            tracing::info!(url = %target.url, source = ?target.source, "using startup feed target");
            feed.configure_target(&target.url);
            feed.connect(&target.url);
        }
        None => feed.connect(""),
    }

    let state = Arc::new(AppState { feed });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/telemetry", get(telemetry))
        .route("/api/mode", get(mode))
        .route("/api/mode/events", get(mode_events))
        .route("/api/connect", post(connect))
        .route("/api/demo", post(start_demo))
        .route("/api/stop", post(stop))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Start server
    let bind = args.bind.unwrap_or(settings.server.bind);
    let addr: SocketAddr = bind.parse()?;
    tracing::info!("Starting turbine-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    state.feed.dispose();
    Ok(())
}
