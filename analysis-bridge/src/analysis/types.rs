//! Wire types exchanged with the policy analysis service.
//!
//! - Outbound: `PolicyUploadedEvent` posted to `/webhook/policy-uploaded`
//! - Inbound: `AnalysisResult` posted back to our callback URL

use serde::{Deserialize, Serialize};

/// Event type sent with every dispatch.
pub const POLICY_UPLOADED_EVENT: &str = "policy.uploaded";

/// Lifecycle of a policy analysis as tracked on the policy record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Processing,
    Analyzing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    /// Processing or analyzing.
    pub fn is_in_progress(self) -> bool {
        matches!(self, AnalysisStatus::Processing | AnalysisStatus::Analyzing)
    }
}

// =============================================================================
// Dispatch (outbound)
// =============================================================================

/// Policy details sent to the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchPayload {
    pub policy_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub client_id: String,
    pub client_name: String,
    pub client_industry: String,
    /// Where the analysis service downloads the policy PDF from
    pub file_url: String,
    pub file_name: String,
    pub file_size: u64,
    pub uploaded_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewal: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    pub callback_url: String,
}

/// Body of the dispatch request: the event type followed by the payload fields.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyUploadedEvent<'a> {
    pub event_type: &'static str,
    #[serde(flatten)]
    pub payload: &'a DispatchPayload,
}

impl<'a> PolicyUploadedEvent<'a> {
    pub fn new(payload: &'a DispatchPayload) -> Self {
        Self {
            event_type: POLICY_UPLOADED_EVENT,
            payload,
        }
    }
}

/// Acknowledgement returned by the analysis service for a dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub success: bool,
    pub analysis_id: String,
    pub message: String,
    pub estimated_time_seconds: u64,
}

// =============================================================================
// Callback (inbound)
// =============================================================================

/// Analysis result posted back by the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: String,
    pub policy_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_name: String,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub report_path: Option<String>,
    #[serde(default)]
    pub report_storage_path: Option<String>,
    #[serde(default)]
    pub analysis_data: Option<serde_json::Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub completed_at: String,
    #[serde(default)]
    pub processing_time_seconds: Option<f64>,
}
