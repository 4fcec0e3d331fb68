//! Outbound side of the analysis exchange.
//!
//! ```text
//! Policy → DispatchPayload → signed POST /webhook/policy-uploaded → analysis service
//! analysis service → signed POST /api/webhook/analysis-complete → AnalysisResult
//! ```

pub mod client;
pub mod types;

pub use client::AnalysisClient;
pub use types::{
    AnalysisResult, AnalysisStatus, DispatchPayload, DispatchResponse, PolicyUploadedEvent,
    POLICY_UPLOADED_EVENT,
};
