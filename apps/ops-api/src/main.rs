//! Tabula ops platform API server.
//!
//! Wires the comp-leave ledger over Postgres, serves it with axum behind the
//! platform JWT middleware, and runs the in-app expiry scheduler.

mod config;
mod logging;
mod openapi;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use config::Config;
use openapi::ApiDoc;
use tabula_api_leave::{leave_router, LeaveState};
use tabula_auth::JwtSecret;
use tabula_comp_leave::{NoopBalanceCache, SystemClock};
use tabula_db::DbPool;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;

#[tokio::main]
async fn main() {
    // Fail fast on broken configuration.
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.log_filter);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.http_addr,
        "Starting tabula ops API"
    );

    let pool = match DbPool::connect(&config.database_url).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = tabula_db::run_migrations(&pool).await {
        tracing::error!("Failed to run migrations: {e}");
        std::process::exit(1);
    }

    let state = LeaveState::new(
        pool.inner().clone(),
        Arc::new(SystemClock),
        Arc::new(NoopBalanceCache),
    );

    if config.expiry_job_enabled {
        let job = (*state.expiry_job).clone().with_poll_interval(
            std::time::Duration::from_secs(config.expiry_job_poll_interval_secs),
        );
        info!(
            interval_secs = config.expiry_job_poll_interval_secs,
            "Starting comp-leave expiry scheduler"
        );
        tokio::spawn(job.run_loop());
    } else {
        info!("Comp-leave expiry scheduler disabled");
    }

    let secret = JwtSecret::new(config.auth_token_secret.as_bytes());
    let app = Router::new()
        .route("/health", get(health))
        .route("/docs/openapi.json", get(openapi_spec))
        .merge(leave_router(state, secret))
        .layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(config.http_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {e}", config.http_addr);
            std::process::exit(1);
        }
    };
    info!(addr = %config.http_addr, "Listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Graceful shutdown on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
