//! HTTP handlers for the analysis webhooks and the policy dispatch routes.
//!
//! The callback handler verifies the signature over the raw body before it
//! parses anything, so a forged or altered result never reaches the store.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::analysis::{AnalysisClient, AnalysisResult, AnalysisStatus};
use crate::error::DispatchError;
use crate::policy::{auto_dispatch_policy, dispatch_policy, now_rfc3339, DispatchOutcome, PolicyStore};
use crate::signature::{check_signature_header, constant_time_eq, SignatureCheck, SIGNATURE_HEADER};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: PolicyStore,
    pub client: AnalysisClient,
}

impl AppState {
    pub fn new(config: Config, store: PolicyStore, client: AnalysisClient) -> Self {
        Self {
            config: Arc::new(config),
            store,
            client,
        }
    }
}

/// Error body shared by every route.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            details,
        }),
    )
        .into_response()
}

// =============================================================================
// Health Check
// =============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Analysis Callback
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub success: bool,
    pub message: &'static str,
    pub policy_id: String,
}

#[derive(Serialize)]
pub struct CallbackHealthResponse {
    pub status: &'static str,
    pub endpoint: &'static str,
    pub timestamp: String,
}

/// Receive a signed analysis result from the analysis service.
pub async fn analysis_complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match check_signature_header(&body, header, &state.config.webhook_secret) {
        SignatureCheck::Valid => {}
        SignatureCheck::Skipped => {
            warn!("webhook_secret_not_configured");
        }
        SignatureCheck::Missing => {
            warn!(body_length = body.len(), "analysis_callback_signature_missing");
            return error_response(StatusCode::UNAUTHORIZED, "Missing webhook signature", None);
        }
        SignatureCheck::Invalid => {
            warn!(body_length = body.len(), "analysis_callback_signature_invalid");
            return error_response(StatusCode::UNAUTHORIZED, "Invalid signature", None);
        }
    }

    let result: AnalysisResult = match serde_json::from_slice(&body) {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "analysis_callback_parse_failed");
            return error_response(
                StatusCode::BAD_REQUEST,
                "Invalid analysis result payload",
                Some(e.to_string()),
            );
        }
    };

    info!(
        policy_id = %result.policy_id,
        analysis_id = %result.analysis_id,
        status = result.status.as_str(),
        overall_score = ?result.overall_score,
        "analysis_callback_received"
    );

    if state
        .store
        .apply_analysis_result(&result, &now_rfc3339())
        .await
        .is_none()
    {
        warn!(policy_id = %result.policy_id, "analysis_callback_policy_not_found");
        return error_response(StatusCode::NOT_FOUND, "Policy not found", None);
    }

    info!(policy_id = %result.policy_id, "analysis_callback_saved");

    (
        StatusCode::OK,
        Json(CallbackResponse {
            success: true,
            message: "Analysis results received and saved",
            policy_id: result.policy_id,
        }),
    )
        .into_response()
}

pub async fn analysis_complete_health() -> Json<CallbackHealthResponse> {
    Json(CallbackHealthResponse {
        status: "ok",
        endpoint: "analysis-complete-callback",
        timestamp: now_rfc3339(),
    })
}

// =============================================================================
// Policy Dispatch
// =============================================================================

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis_id: String,
    pub message: String,
    pub estimated_time_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct PolicyAnalysisStatusResponse {
    pub policy_id: String,
    pub analysis_id: Option<String>,
    pub analysis_status: Option<AnalysisStatus>,
    pub analysis_score: Option<f64>,
    pub analysis_recommendation: Option<String>,
    pub analysis_started_at: Option<String>,
    pub analysis_completed_at: Option<String>,
    pub analysis_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AutoAnalyzeResponse {
    pub success: bool,
    pub analysis_id: String,
    pub policy_id: String,
}

#[derive(Debug, Serialize)]
pub struct SkippedResponse {
    pub skipped: bool,
    pub reason: String,
}

/// Start an analysis for a policy on user request.
pub async fn analyze_policy(
    State(state): State<AppState>,
    Path(policy_id): Path<String>,
) -> Response {
    let outcome = dispatch_policy(&state.store, &state.client, &state.config, &policy_id).await;

    match outcome {
        Ok(response) => (
            StatusCode::OK,
            Json(AnalyzeResponse {
                success: true,
                analysis_id: response.analysis_id,
                message: response.message,
                estimated_time_seconds: response.estimated_time_seconds,
            }),
        )
            .into_response(),
        Err(e @ DispatchError::PolicyNotFound) => {
            error_response(StatusCode::NOT_FOUND, &e.to_string(), None)
        }
        Err(e @ (DispatchError::NoFile | DispatchError::InvalidStoragePath(_))) => {
            error_response(StatusCode::BAD_REQUEST, &e.to_string(), None)
        }
        Err(e @ DispatchError::AlreadyInProgress) => {
            error_response(StatusCode::CONFLICT, &e.to_string(), None)
        }
        Err(e) => {
            error!(policy_id = %policy_id, error = %e, "analyze_policy_failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to start analysis",
                Some(e.to_string()),
            )
        }
    }
}

/// Report the analysis columns stored on a policy.
pub async fn policy_analysis_status(
    State(state): State<AppState>,
    Path(policy_id): Path<String>,
) -> Response {
    let Some(policy) = state.store.get(&policy_id).await else {
        return error_response(StatusCode::NOT_FOUND, "Policy not found", None);
    };

    Json(PolicyAnalysisStatusResponse {
        policy_id,
        analysis_id: policy.analysis_id,
        analysis_status: policy.analysis_status,
        analysis_score: policy.analysis_score,
        analysis_recommendation: policy.analysis_recommendation,
        analysis_started_at: policy.analysis_started_at,
        analysis_completed_at: policy.analysis_completed_at,
        analysis_error: policy.analysis_error,
    })
    .into_response()
}

/// Database insert hook: analyze new cyber policies that carry a file.
///
/// Authenticated with the service role key as a bearer token.
pub async fn auto_analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
        .unwrap_or("");

    let key = &state.config.service_role_key;
    if !key.is_configured() || !constant_time_eq(key.expose_secret().as_bytes(), token.as_bytes()) {
        warn!(has_token = !token.is_empty(), "auto_analyze_unauthorized");
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized", None);
    }

    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "auto_analyze_parse_failed");
            return error_response(
                StatusCode::BAD_REQUEST,
                "Invalid webhook payload",
                Some(e.to_string()),
            );
        }
    };

    // Database webhooks send { type, table, record, schema, old_record }
    let record = event.get("record").unwrap_or(&event);
    let Some(policy_id) = record.get("id").and_then(|v| v.as_str()).map(str::to_string) else {
        return error_response(StatusCode::BAD_REQUEST, "No policy ID in webhook payload", None);
    };

    let outcome =
        auto_dispatch_policy(&state.store, &state.client, &state.config, &policy_id).await;

    match outcome {
        Ok(DispatchOutcome::Dispatched(response)) => (
            StatusCode::OK,
            Json(AutoAnalyzeResponse {
                success: true,
                analysis_id: response.analysis_id,
                policy_id,
            }),
        )
            .into_response(),
        Ok(DispatchOutcome::Skipped { reason }) => (
            StatusCode::OK,
            Json(SkippedResponse {
                skipped: true,
                reason,
            }),
        )
            .into_response(),
        Err(e @ DispatchError::PolicyNotFound) => {
            warn!(policy_id = %policy_id, "auto_analyze_policy_not_found");
            error_response(StatusCode::NOT_FOUND, &e.to_string(), None)
        }
        Err(e) => {
            error!(policy_id = %policy_id, error = %e, "auto_analyze_failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Auto-analyze failed",
                Some(e.to_string()),
            )
        }
    }
}

// =============================================================================
// Analysis Service Passthrough
// =============================================================================

#[derive(Serialize)]
pub struct ConnectionResponse {
    pub connected: bool,
    pub analysis_api_url: String,
}

/// Ask the analysis service for the state of one of its jobs.
pub async fn analysis_service_status(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
) -> Response {
    match state.client.get_analysis_status(&analysis_id).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => {
            warn!(analysis_id = %analysis_id, error = %e, "analysis_service_status_failed");
            error_response(
                StatusCode::BAD_GATEWAY,
                "Failed to get analysis status",
                Some(e.to_string()),
            )
        }
    }
}

pub async fn analysis_service_health(State(state): State<AppState>) -> Json<ConnectionResponse> {
    let connected = state.client.test_connection().await;
    info!(connected = connected, "analysis_service_health_checked");
    Json(ConnectionResponse {
        connected,
        analysis_api_url: state.client.base_url().to_string(),
    })
}
