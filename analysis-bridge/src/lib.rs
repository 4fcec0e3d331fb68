//! Analysis bridge - signed webhook exchange with the policy analysis service.
//!
//! This library backs two binaries:
//! - `analysis-bridge`: web server dispatching policies and receiving results
//! - `bridge-sign`: signs or verifies a JSON payload for manual testing
//!
//! ## Architecture
//!
//! ```text
//! Policy → Dispatcher → analysis service → Callback Receiver → Policy store
//!              └──── HMAC-SHA256 signature on both legs ────┘
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod policy;
pub mod signature;
pub mod web;

// Re-export commonly used types
pub use analysis::{AnalysisClient, AnalysisResult, AnalysisStatus, DispatchPayload};
pub use config::Config;
pub use error::{AnalysisApiError, DispatchError, StoreError};
pub use policy::{PolicyRecord, PolicyStore};
pub use signature::{sign_bytes, sign_payload, verify_signature, WebhookSecret};
pub use web::{router, AppState};
