//! DAO ledger sequencer entry point.
//!
//! Rebuilds the ledger from its SQLite journal, settles any payouts left
//! in the outbox by an earlier run, starts the single-writer sequencer task
//! and exposes a small Axum REST API for submissions and queries.

mod api;
mod config;
mod custody;
mod db;
mod errors;
mod sequencer;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use custody::OutboxCustody;
use sequencer::{Sequencer, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // ─── Ledger ───────────────────────────────────────────
    let clock = Arc::new(SystemClock);
    let ledger = sequencer::bootstrap(&pool, &config, clock.as_ref()).await?;

    let custody = OutboxCustody::new(pool.clone());
    let settled = custody::settle_pending(&pool, &custody, None).await?;
    if settled > 0 {
        info!("Settled {settled} payouts left over from a previous run");
    }

    let handle = Sequencer::new(pool.clone(), ledger, custody, clock).spawn(config.queue_depth);

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState {
        pool,
        sequencer: handle,
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/ledger", get(api::get_ledger))
        .route("/investors/:address", get(api::get_investor))
        .route("/proposals", get(api::get_proposals))
        .route("/proposals/:id", get(api::get_proposal))
        .route("/proposals/:id/votes/:address", get(api::get_vote))
        .route("/proposals/:id/events", get(api::get_proposal_events))
        .route("/events", get(api::get_all_events))
        .route("/operations", post(api::submit_operation))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
