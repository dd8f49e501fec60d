//! nahuel-api library - academic catalog HTTP service
//!
//! Read endpoints over institutions, academic units, careers and titles,
//! plus the two write workflows (title update, resolution get-or-create).

use axum::Router;
use nahuel_common::CodeResolution;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod filters;
pub mod hierarchy;
pub mod lenient;
pub mod services;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Policy for codes that match no catalog row
    pub code_resolution: CodeResolution,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, code_resolution: CodeResolution) -> Self {
        Self {
            db,
            code_resolution,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let catalog = Router::new()
        .route("/api/titles", get(api::list_titles))
        .route("/api/title", post(api::update_title))
        .route("/api/institutions", get(api::list_institutions))
        .route("/api/academicUnits", get(api::list_academic_units))
        .route("/api/careerTypes", get(api::list_career_types))
        .route("/api/titleTypes", get(api::list_title_types))
        .route("/api/titleModes", get(api::list_title_modes))
        .route("/api/careers", get(api::list_careers))
        .route("/api/resolutionTypes", get(api::list_resolution_types))
        .route(
            "/api/academicUnitsHierarchy",
            get(api::academic_units_hierarchy),
        )
        .route("/api/resolutions", get(api::list_resolutions))
        .route("/api/resolution", post(api::create_resolution));

    Router::new()
        .merge(catalog)
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
