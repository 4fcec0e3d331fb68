//! HTTP client for the policy analysis service.
//!
//! Dispatch bodies are serialized once and the signature is computed over
//! those exact bytes, so the receiver can verify what it got off the wire.

use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client};
use tracing::{error, info, warn};
use url::Url;

use super::types::{DispatchPayload, DispatchResponse, PolicyUploadedEvent};
use crate::error::AnalysisApiError;
use crate::signature::{sign_bytes, signature_header_value, WebhookSecret, SIGNATURE_HEADER};

/// Client for the analysis service, cheap to clone and share across handlers.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http: Client,
    base_url: String,
    secret: WebhookSecret,
    timeout: Duration,
}

impl AnalysisClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        secret: WebhookSecret,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            secret,
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, AnalysisApiError> {
        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        Ok(Url::parse(&base)?.join(path)?)
    }

    /// Send a policy to the analysis service.
    pub async fn dispatch_policy_analysis(
        &self,
        payload: &DispatchPayload,
    ) -> Result<DispatchResponse, AnalysisApiError> {
        let url = self.endpoint("webhook/policy-uploaded")?;
        let body = serde_json::to_vec(&PolicyUploadedEvent::new(payload))?;
        let signature = sign_bytes(&body, &self.secret);

        info!(
            policy_id = %payload.policy_id,
            url = %url,
            body_length = body.len(),
            signed_with_secret = self.secret.is_configured(),
            "analysis_dispatch_starting"
        );

        let response = self
            .http
            .post(url)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature_header_value(&signature))
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(policy_id = %payload.policy_id, error = %e, "analysis_dispatch_request_failed");
                AnalysisApiError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                policy_id = %payload.policy_id,
                status_code = status.as_u16(),
                "analysis_dispatch_rejected"
            );
            return Err(AnalysisApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let dispatched: DispatchResponse = response.json().await?;

        info!(
            policy_id = %payload.policy_id,
            analysis_id = %dispatched.analysis_id,
            estimated_time_seconds = dispatched.estimated_time_seconds,
            "analysis_dispatched"
        );

        Ok(dispatched)
    }

    /// Fetch the service's view of an analysis job.
    pub async fn get_analysis_status(
        &self,
        analysis_id: &str,
    ) -> Result<serde_json::Value, AnalysisApiError> {
        let url = self.endpoint(&format!("analysis/{analysis_id}/status"))?;

        let response = self.http.get(url).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(analysis_id = %analysis_id, status_code = status.as_u16(), "analysis_status_failed");
            return Err(AnalysisApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    /// Whether the analysis service answers its health check.
    pub async fn test_connection(&self) -> bool {
        let url = match self.endpoint("health") {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "analysis_health_url_invalid");
                return false;
            }
        };

        match self.http.get(url).timeout(self.timeout).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!(error = %e, "analysis_health_unreachable");
                false
            }
        }
    }
}
