//! Worksheet Studio · Assessment Generation Backend
//!
//! - Axum HTTP API for intent queues, generation, archive, rendering and practice
//! - Optional Gemini integration (OpenAI-compatible protocol, via environment variables)
//! - Shared documents and logos served from `{DATA_DIR}/files` under `/files`
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   GEMINI_API_KEY     : enables generation if present (falls back to API_KEY)
//!   GEMINI_BASE_URL    : default "https://generativelanguage.googleapis.com/v1beta/openai"
//!   GEMINI_MODEL       : default "gemini-2.5-flash"
//!   DATA_DIR           : durable storage root (default "./data")
//!   PUBLIC_BASE_URL    : prefix for shared links (default "http://localhost:{PORT}")
//!   STUDIO_CONFIG_PATH : path to TOML config (prompts + timing knobs)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod storage;
mod seeds;
mod intents;
mod archive;
mod branding;
mod backend;
mod gemini;
mod curriculum;
mod generator;
mod objects;
mod renderer;
mod practice;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Read port from env or default to 3000.
  let port = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()).unwrap_or(3000);
  let addr = SocketAddr::from(([0, 0, 0, 0], port));

  // Build shared application state (storage, branding, backend client, prompts).
  let state = Arc::new(AppState::from_env(port)?);

  // Periodic credential re-check; the first tick fires immediately.
  let every = Duration::from_secs(state.config.credential_recheck_secs.max(1));
  let checker = state.clone();
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    loop {
      ticker.tick().await;
      checker.refresh_credentials().await;
    }
  });

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "worksheet_studio_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!(target: "worksheet_studio_backend", "Shutdown signal received");
    })
    .await?;
  Ok(())
}
