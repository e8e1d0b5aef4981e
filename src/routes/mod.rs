// Admin HTTP routes for the seeder

mod http;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::seed::SeedService;
use crate::store::SeedStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: Arc<SeedService>,
    pub(crate) store: Arc<SeedStore>,
}

pub fn app(service: Arc<SeedService>, store: Arc<SeedStore>) -> Router {
    let state = AppState { service, store };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/seed/status", get(http::status_handler)) // GET /api/seed/status
        .route("/api/seed/start", post(http::start_handler)) // POST /api/seed/start
        .route("/api/seed/symbols", post(http::add_symbols_handler)) // POST /api/seed/symbols
        .route("/api/seed/run", post(http::run_handler)) // POST /api/seed/run
        .route("/api/seed/pause", post(http::pause_handler)) // POST /api/seed/pause
        .route("/api/seed/resume", post(http::resume_handler)) // POST /api/seed/resume
        .route("/api/seed/settings", put(http::settings_handler)) // PUT /api/seed/settings
        .route("/api/seed/audit", get(http::audit_handler)) // GET /api/seed/audit?limit=
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
