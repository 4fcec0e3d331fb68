//! Sending a stored policy to the analysis service.
//!
//! ```text
//! checks → mark processing → signed dispatch → mark analyzing (or failed)
//! ```

use chrono::{SecondsFormat, Utc};
use tracing::{error, info};
use url::Url;

use super::record::PolicyRecord;
use super::store::PolicyStore;
use crate::analysis::{AnalysisClient, AnalysisStatus, DispatchPayload, DispatchResponse};
use crate::config::Config;
use crate::error::DispatchError;

const DEFAULT_CLIENT_NAME: &str = "Unknown Company";
const DEFAULT_INDUSTRY: &str = "Other/General";
const DEFAULT_FILE_NAME: &str = "policy.pdf";
const DEFAULT_UPLOADED_BY: &str = "tenant";

/// What asked for the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchTrigger {
    /// A user pressed "analyze"; unmet preconditions are errors.
    Manual,
    /// A database insert hook; unmet preconditions are skips.
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Dispatched(DispatchResponse),
    Skipped { reason: String },
}

/// Current time as stored on policy records.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Append a storage path to the public storage base URL.
///
/// Each path segment is percent-encoded on its own, so `#`, `?` and `%` in
/// object names stay part of the path. `.` and `..` segments are refused.
pub fn file_url_for(storage_public_url: &str, storage_path: &str) -> Result<Url, DispatchError> {
    let segments: Vec<&str> = storage_path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(DispatchError::NoFile);
    }
    if segments.iter().any(|s| matches!(*s, "." | "..")) {
        return Err(DispatchError::InvalidStoragePath(storage_path.to_string()));
    }

    let mut url = Url::parse(storage_public_url)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Build the dispatch payload for a policy that has a file.
pub fn build_dispatch_payload(
    policy: &PolicyRecord,
    config: &Config,
    trigger: DispatchTrigger,
) -> Result<DispatchPayload, DispatchError> {
    let storage_path = policy
        .storage_path
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or(DispatchError::NoFile)?;

    let file_url = file_url_for(&config.storage_public_url, storage_path)?;

    let policy_type = match trigger {
        DispatchTrigger::Auto => "cyber",
        DispatchTrigger::Manual if policy.is_cyber() => "cyber",
        DispatchTrigger::Manual => "general",
    };

    let company = policy.company.as_ref();

    Ok(DispatchPayload {
        policy_id: policy.id.clone(),
        tenant_id: policy.tenant_id.clone(),
        client_id: policy.company_id.clone(),
        client_name: company
            .map(|c| c.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
        client_industry: company
            .and_then(|c| c.industry.clone())
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| DEFAULT_INDUSTRY.to_string()),
        file_url: file_url.to_string(),
        file_name: policy
            .file_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
        file_size: policy.file_size.unwrap_or(0),
        uploaded_by: policy
            .uploaded_by_type
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOADED_BY.to_string()),
        policy_type: Some(policy_type.to_string()),
        renewal: Some(false),
        priority: Some("normal".to_string()),
        callback_url: config.callback_url(),
    })
}

/// Reason an automatic trigger should not dispatch, if any.
fn auto_skip_reason(policy: &PolicyRecord) -> Option<String> {
    if !policy.has_file() {
        return Some("No file attached".to_string());
    }
    if !policy.is_cyber() {
        return Some("Not a cyber liability policy".to_string());
    }
    match policy.analysis_status {
        Some(status) if status.is_in_progress() || status == AnalysisStatus::Completed => {
            Some(format!("Analysis already {}", status.as_str()))
        }
        _ => None,
    }
}

/// Dispatch a policy on user request. Unmet preconditions are errors.
pub async fn dispatch_policy(
    store: &PolicyStore,
    client: &AnalysisClient,
    config: &Config,
    policy_id: &str,
) -> Result<DispatchResponse, DispatchError> {
    let policy = store
        .get(policy_id)
        .await
        .ok_or(DispatchError::PolicyNotFound)?;

    if !policy.has_file() {
        return Err(DispatchError::NoFile);
    }
    if policy.is_analysis_in_progress() {
        return Err(DispatchError::AlreadyInProgress);
    }

    send_for_analysis(store, client, config, &policy, DispatchTrigger::Manual).await
}

/// Dispatch a newly inserted policy if it qualifies for automatic analysis.
pub async fn auto_dispatch_policy(
    store: &PolicyStore,
    client: &AnalysisClient,
    config: &Config,
    policy_id: &str,
) -> Result<DispatchOutcome, DispatchError> {
    let policy = store
        .get(policy_id)
        .await
        .ok_or(DispatchError::PolicyNotFound)?;

    if let Some(reason) = auto_skip_reason(&policy) {
        info!(policy_id = %policy_id, reason = %reason, "analysis_dispatch_skipped");
        return Ok(DispatchOutcome::Skipped { reason });
    }

    send_for_analysis(store, client, config, &policy, DispatchTrigger::Auto)
        .await
        .map(DispatchOutcome::Dispatched)
}

async fn send_for_analysis(
    store: &PolicyStore,
    client: &AnalysisClient,
    config: &Config,
    policy: &PolicyRecord,
    trigger: DispatchTrigger,
) -> Result<DispatchResponse, DispatchError> {
    let policy_id = policy.id.as_str();

    let payload = match build_dispatch_payload(policy, config, trigger) {
        Ok(payload) => payload,
        Err(e) => {
            store.mark_failed(policy_id, &e.to_string()).await;
            return Err(e);
        }
    };

    store.mark_processing(policy_id, &now_rfc3339()).await;

    match client.dispatch_policy_analysis(&payload).await {
        Ok(response) => {
            store.mark_analyzing(policy_id, &response.analysis_id).await;
            info!(
                policy_id = %policy_id,
                analysis_id = %response.analysis_id,
                trigger = ?trigger,
                "analysis_dispatch_complete"
            );
            Ok(response)
        }
        Err(e) => {
            error!(policy_id = %policy_id, error = %e, trigger = ?trigger, "analysis_dispatch_failed");
            store.mark_failed(policy_id, &e.to_string()).await;
            Err(e.into())
        }
    }
}
