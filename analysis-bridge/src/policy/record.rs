//! Insurance policy record and the analysis columns the webhooks maintain.

use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisResult, AnalysisStatus};

/// Line of coverage that qualifies a policy for automatic analysis.
pub const CYBER_LIABILITY: &str = "Cyber Liability";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
}

/// An insurance policy as stored by the CRM.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub company_id: String,
    #[serde(default)]
    pub company: Option<Company>,
    /// Object path of the uploaded policy document
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub uploaded_by_type: Option<String>,
    #[serde(default)]
    pub line_of_coverage: Option<String>,

    #[serde(default)]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub analysis_status: Option<AnalysisStatus>,
    #[serde(default)]
    pub analysis_score: Option<f64>,
    #[serde(default)]
    pub analysis_recommendation: Option<String>,
    #[serde(default)]
    pub analysis_data: Option<serde_json::Value>,
    #[serde(default)]
    pub analysis_error: Option<String>,
    #[serde(default)]
    pub report_storage_path: Option<String>,
    #[serde(default)]
    pub analysis_started_at: Option<String>,
    #[serde(default)]
    pub analysis_completed_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl PolicyRecord {
    pub fn is_cyber(&self) -> bool {
        self.line_of_coverage.as_deref() == Some(CYBER_LIABILITY)
    }

    pub fn has_file(&self) -> bool {
        self.storage_path
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn is_analysis_in_progress(&self) -> bool {
        self.analysis_status
            .map(AnalysisStatus::is_in_progress)
            .unwrap_or(false)
    }

    /// Copy a callback result onto the analysis columns.
    ///
    /// Score, recommendation and data are only taken from completed results;
    /// the error message only from failed ones.
    pub fn apply_analysis_result(&mut self, result: &AnalysisResult, now: &str) {
        self.analysis_id = Some(result.analysis_id.clone());
        self.analysis_status = Some(result.status);
        self.analysis_completed_at = Some(result.completed_at.clone());
        self.updated_at = Some(now.to_string());

        match result.status {
            AnalysisStatus::Completed => {
                self.analysis_score = result.overall_score;
                self.analysis_recommendation = result.recommendation.clone();
                self.analysis_data = result.analysis_data.clone();
                if let Some(path) = &result.report_storage_path {
                    self.report_storage_path = Some(path.clone());
                }
            }
            AnalysisStatus::Failed => {
                self.analysis_error = result.error_message.clone();
            }
            AnalysisStatus::Processing | AnalysisStatus::Analyzing => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(status: AnalysisStatus) -> AnalysisResult {
        AnalysisResult {
            analysis_id: "analysis_1".into(),
            policy_id: "policy-1".into(),
            client_id: "company-1".into(),
            client_name: "Acme".into(),
            status,
            overall_score: Some(81.0),
            recommendation: Some("Renew".into()),
            report_path: None,
            report_storage_path: Some("reports/policy-1.pdf".into()),
            analysis_data: Some(json!({"gaps": []})),
            error_message: Some("PDF unreadable".into()),
            completed_at: "2026-02-16T00:00:00Z".into(),
            processing_time_seconds: Some(42.0),
        }
    }

    #[test]
    fn test_apply_completed_result() {
        let mut record = PolicyRecord {
            id: "policy-1".into(),
            ..PolicyRecord::default()
        };
        record.apply_analysis_result(&result(AnalysisStatus::Completed), "now");

        assert_eq!(record.analysis_status, Some(AnalysisStatus::Completed));
        assert_eq!(record.analysis_score, Some(81.0));
        assert_eq!(record.analysis_recommendation.as_deref(), Some("Renew"));
        assert_eq!(record.report_storage_path.as_deref(), Some("reports/policy-1.pdf"));
        assert!(record.analysis_error.is_none());
        assert_eq!(record.updated_at.as_deref(), Some("now"));
    }

    #[test]
    fn test_apply_failed_result() {
        let mut record = PolicyRecord {
            id: "policy-1".into(),
            ..PolicyRecord::default()
        };
        record.apply_analysis_result(&result(AnalysisStatus::Failed), "now");

        assert_eq!(record.analysis_status, Some(AnalysisStatus::Failed));
        assert_eq!(record.analysis_error.as_deref(), Some("PDF unreadable"));
        assert!(record.analysis_score.is_none());
        assert!(record.report_storage_path.is_none());
    }

    #[test]
    fn test_flags() {
        let record = PolicyRecord {
            id: "policy-1".into(),
            storage_path: Some("  ".into()),
            line_of_coverage: Some(CYBER_LIABILITY.into()),
            analysis_status: Some(AnalysisStatus::Analyzing),
            ..PolicyRecord::default()
        };
        assert!(record.is_cyber());
        assert!(!record.has_file());
        assert!(record.is_analysis_in_progress());
    }
}
