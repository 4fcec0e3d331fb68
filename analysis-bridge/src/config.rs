//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup; nothing here is mutated afterwards.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::signature::WebhookSecret;

pub const DEFAULT_ANALYSIS_API_URL: &str = "https://policy-analysis-api-production.up.railway.app";
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";
pub const DEFAULT_STORAGE_PUBLIC_URL: &str =
    "http://localhost:54321/storage/v1/object/public/insurance-policies/";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Shared secret for signing dispatches and verifying callbacks
    pub webhook_secret: WebhookSecret,

    /// Base URL of the policy analysis service
    pub analysis_api_url: String,

    /// Public URL of this app, used to build the callback URL
    pub app_url: String,

    /// Bearer token expected on database-triggered auto-analysis
    pub service_role_key: WebhookSecret,

    /// Base URL that policy storage paths are resolved against
    pub storage_public_url: String,

    /// Outbound HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Optional JSON file of policy records to load at startup
    pub policy_seed_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_number("PORT", 3000),

            webhook_secret: WebhookSecret::new(env::var("WEBHOOK_SECRET").unwrap_or_default()),

            analysis_api_url: non_empty_var("ANALYSIS_API_URL")
                .or_else(|| non_empty_var("NEXT_PUBLIC_ANALYSIS_API_URL"))
                .unwrap_or_else(|| DEFAULT_ANALYSIS_API_URL.to_string()),

            app_url: resolve_app_url(
                non_empty_var("PRODUCTION_URL"),
                non_empty_var("NEXT_PUBLIC_APP_URL"),
                non_empty_var("VERCEL_URL"),
            ),

            service_role_key: WebhookSecret::new(
                env::var("SUPABASE_SERVICE_ROLE_KEY").unwrap_or_default(),
            ),

            storage_public_url: non_empty_var("STORAGE_PUBLIC_URL")
                .unwrap_or_else(|| DEFAULT_STORAGE_PUBLIC_URL.to_string()),

            request_timeout_ms: parse_number("REQUEST_TIMEOUT_MS", 30_000),

            policy_seed_path: non_empty_var("POLICY_SEED_PATH").map(PathBuf::from),
        }
    }

    /// URL the analysis service posts results back to.
    pub fn callback_url(&self) -> String {
        format!(
            "{}/api/webhook/analysis-complete",
            self.app_url.trim_end_matches('/')
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3000,
            webhook_secret: WebhookSecret::default(),
            analysis_api_url: DEFAULT_ANALYSIS_API_URL.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            service_role_key: WebhookSecret::default(),
            storage_public_url: DEFAULT_STORAGE_PUBLIC_URL.to_string(),
            request_timeout_ms: 30_000,
            policy_seed_path: None,
        }
    }
}

/// Explicit production URL, then the public app URL, then the deployment host.
fn resolve_app_url(
    production_url: Option<String>,
    public_app_url: Option<String>,
    vercel_host: Option<String>,
) -> String {
    production_url
        .or(public_app_url)
        .or_else(|| vercel_host.map(|host| format!("https://{host}")))
        .unwrap_or_else(|| DEFAULT_APP_URL.to_string())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid number, using default");
            default
        }
    }
}
