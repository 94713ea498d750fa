//! Leaf disease diagnosis service.
//!
//! # Flow
//!
//! - `POST /analyze` takes a multipart upload with an `image` field
//! - The image is base64-encoded and sent to the inference API with a fixed prompt and a
//!   strict JSON schema (`disease_name`, `treatment`, `reason`, `decision`)
//! - The answer is checked against that shape, stored in MongoDB with the image attached, and
//!   pushed to every WebSocket subscriber as a `result` event
//! - `GET /history` returns every stored record as Extended JSON
//!
//! Persist and broadcast are not atomic: if the process dies between the two, the record shows
//! up in history but no subscriber ever hears about it.
//!
//! # Setup
//!
//! ```sh
//! export OPENAI_API_KEY=...
//! cargo run
//! ```
//!
//! Optional: `SECRET_KEY`, `PORT`, `BODY_LIMIT_MB`, `OPENAI_MODEL`, `OPENAI_BASE_URL`, `MONGODB_URI`,
//! `MONGODB_DATABASE`, `MONGODB_COLLECTION`, `RUST_LOG`.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tokio::signal::{self, ctrl_c};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod config;
pub mod error;
pub mod hub;
pub mod inference;
pub mod model;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;

use config::Config;
use error::StartupError;
use routes::{analyze_handler, health_check, history_handler, ws_handler};
use state::AppState;

pub fn app(state: Arc<AppState>, body_limit_bytes: Option<usize>) -> Router {
    let body_limit = match body_limit_bytes {
        Some(bytes) => DefaultBodyLimit::max(bytes),
        None => DefaultBodyLimit::disable(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/analyze", post(analyze_handler))
        .route("/history", get(history_handler))
        .route("/ws", get(ws_handler))
        .layer(body_limit)
        .with_state(state)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_server() -> Result<(), StartupError> {
    let config = Config::from_env()?;

    info!("Initializing state...");
    let state = AppState::connect(&config).await?;

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on http://{address}");

    axum::Server::try_bind(&address)?
        .serve(app(state, config.body_limit_bytes).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
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
}
