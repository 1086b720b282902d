//! # Finboard Web Server
//!
//! The JSON HTTP API over accounts, account values and net worth.
//!
//! Handlers talk to an injected `AccountStore`, so the router can be driven
//! against any store. `run_server` wires it to PostgreSQL.

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use configuration::{ServerSettings, Settings};
use database::{AccountStore, DbRepository};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    /// Default bucket width of `GET /api/networth`.
    pub rollup_interval: chrono::Duration,
}

impl AppState {
    pub fn new(store: Arc<dyn AccountStore>, rollup_interval: chrono::Duration) -> Self {
        Self {
            store,
            rollup_interval,
        }
    }
}

/// Builds the application router with its middleware stack.
pub fn app_router(state: AppState, server: &ServerSettings) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    let api = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route(
            "/accounts",
            get(handlers::get_accounts)
                .post(handlers::upsert_account)
                .delete(handlers::delete_account),
        )
        .route(
            "/accounts/value",
            get(handlers::get_account_values).post(handlers::create_account_value),
        )
        .route(
            "/accounts/value/current",
            get(handlers::get_current_account_value),
        )
        .route("/networth", get(handlers::get_net_worth_over_time))
        .route("/networth/current", get(handlers::get_current_net_worth));

    let mut app = Router::new()
        .nest("/api", api)
        .with_state(Arc::new(state));

    // Anything the API does not claim is served from the frontend build.
    if let Some(dir) = &server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(server.body_limit_bytes))
}

/// Connects to the database, applies migrations and serves the API until
/// Ctrl-C. The pool is closed on the way out.
pub async fn run_server(settings: &Settings) -> anyhow::Result<()> {
    let pool = database::connect(
        &settings.database.connection_url(),
        settings.database.max_connections,
        settings.database.acquire_timeout(),
    )
    .await?;
    database::run_migrations(&pool).await?;

    let rollup_interval = settings.rollup.chrono_interval()?;
    let store: Arc<dyn AccountStore> = Arc::new(DbRepository::new(pool.clone()));
    let app = app_router(AppState::new(store, rollup_interval), &settings.server);

    let addr = settings.server.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Web server started and listening.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Web server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal.");
    }
}
