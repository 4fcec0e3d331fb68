//! In-memory policy store shared by the HTTP handlers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::record::PolicyRecord;
use crate::analysis::{AnalysisResult, AnalysisStatus};
use crate::error::StoreError;

/// Cloneable handle over the policy table.
#[derive(Clone, Default)]
pub struct PolicyStore {
    policies: Arc<RwLock<HashMap<String, PolicyRecord>>>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON array of policy records.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await?;
        let records: Vec<PolicyRecord> = serde_json::from_slice(&raw)?;

        let store = Self::new();
        let count = records.len();
        for record in records {
            store.insert(record).await;
        }

        info!(path = %path.display(), policy_count = count, "policy_store_seeded");
        Ok(store)
    }

    pub async fn insert(&self, record: PolicyRecord) {
        self.policies.write().await.insert(record.id.clone(), record);
    }

    pub async fn get(&self, id: &str) -> Option<PolicyRecord> {
        self.policies.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<PolicyRecord> {
        self.policies.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.policies.read().await.len()
    }

    /// Mutate a record in place and return the updated copy.
    pub async fn update<F>(&self, id: &str, f: F) -> Option<PolicyRecord>
    where
        F: FnOnce(&mut PolicyRecord),
    {
        let mut policies = self.policies.write().await;
        let record = policies.get_mut(id)?;
        f(record);
        Some(record.clone())
    }

    pub async fn apply_analysis_result(
        &self,
        result: &AnalysisResult,
        now: &str,
    ) -> Option<PolicyRecord> {
        self.update(&result.policy_id, |record| {
            record.apply_analysis_result(result, now)
        })
        .await
    }

    pub async fn mark_processing(&self, id: &str, now: &str) -> Option<PolicyRecord> {
        self.update(id, |record| {
            record.analysis_status = Some(AnalysisStatus::Processing);
            record.analysis_started_at = Some(now.to_string());
            record.updated_at = Some(now.to_string());
        })
        .await
    }

    /// Record an accepted dispatch.
    ///
    /// Only a `processing` record moves to `analyzing`; a result callback
    /// that landed while the dispatch was in flight is left alone.
    pub async fn mark_analyzing(&self, id: &str, analysis_id: &str) -> Option<PolicyRecord> {
        self.update(id, |record| {
            if record.analysis_status == Some(AnalysisStatus::Processing) {
                record.analysis_id = Some(analysis_id.to_string());
                record.analysis_status = Some(AnalysisStatus::Analyzing);
            } else if record.analysis_id.is_none() {
                record.analysis_id = Some(analysis_id.to_string());
            }
        })
        .await
    }

    pub async fn mark_failed(&self, id: &str, error: &str) -> Option<PolicyRecord> {
        self.update(id, |record| {
            record.analysis_status = Some(AnalysisStatus::Failed);
            record.analysis_error = Some(error.to_string());
        })
        .await
    }
}
