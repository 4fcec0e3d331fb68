//! Insurance policies and the analysis lifecycle tracked on them.

pub mod dispatch;
pub mod record;
pub mod store;

pub use dispatch::{
    auto_dispatch_policy, build_dispatch_payload, dispatch_policy, file_url_for, now_rfc3339,
    DispatchOutcome, DispatchTrigger,
};
pub use record::{Company, PolicyRecord, CYBER_LIABILITY};
pub use store::PolicyStore;
