mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod storage;
#[cfg(test)]
mod testing;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::models::ProviderType;
use crate::storage::StorageManager;

/// Path the local provider's files are served under
const LOCAL_UPLOADS_ROUTE: &str = "/uploads";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub storage: Arc<StorageManager>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipvault=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting clipvault...");

    // Load configuration
    let config = Config::load()?;
    let config = Arc::new(config);
    tracing::info!("Configuration loaded");

    // Initialize database
    let db = Database::new(&config.database.path).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    // Initialize storage manager
    let storage = Arc::new(StorageManager::from_config(&config)?);

    let state = AppState {
        db,
        config: config.clone(),
        storage,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.server.max_upload_mb.saturating_mul(1024 * 1024);

    // Every API route needs the caller identity
    let api_routes = Router::new()
        .route("/videos", post(handlers::video::publish_video))
        .route(
            "/videos/:id",
            get(handlers::video::get_video)
                .patch(handlers::video::update_video)
                .delete(handlers::video::delete_video),
        )
        .route("/videos/:id/thumbnail", put(handlers::video::update_thumbnail))
        .route("/videos/:id/publish", patch(handlers::video::toggle_publish))
        .layer(axum::middleware::from_fn(
            middleware::auth::owner_middleware,
        ));

    let mut app = Router::new().nest("/api/v1", api_routes);

    if state.config.storage.provider == ProviderType::Local {
        app = app.nest_service(
            LOCAL_UPLOADS_ROUTE,
            ServeDir::new(&state.config.storage.local_path),
        );
    }

    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
