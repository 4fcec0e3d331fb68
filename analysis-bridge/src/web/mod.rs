//! Web server module for the analysis webhooks.
//!
//! Routes:
//! - `POST /api/webhook/analysis-complete`: signed result callback
//! - `POST /api/policies/:id/analyze`: dispatch a policy on request
//! - `POST /api/policies/auto-analyze`: dispatch from a database hook
//! - status and health endpoints

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    analysis_complete, analysis_complete_health, analysis_service_health,
    analysis_service_status, analyze_policy, auto_analyze, health, policy_analysis_status,
    AppState, ErrorResponse, HealthResponse,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/webhook/analysis-complete",
            post(analysis_complete).get(analysis_complete_health),
        )
        .route("/api/policies/auto-analyze", post(auto_analyze))
        .route(
            "/api/policies/:id/analyze",
            post(analyze_policy).get(policy_analysis_status),
        )
        .route("/api/analysis/health", get(analysis_service_health))
        .route(
            "/api/analysis/:analysis_id/status",
            get(analysis_service_status),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
