//! Bridge signing tool.
//!
//! Signs a JSON payload the way the dispatcher does, or checks a signature
//! the way the callback receiver does. Reads from a file or stdin.
//!
//! ```text
//! bridge-sign sign --file result.json
//! bridge-sign verify --file result.json --signature sha256=<hex>
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use analysis_bridge::signature::{
    check_signature_header, sign_bytes, signature_header_value, SignatureCheck, SIGNATURE_HEADER,
};
use analysis_bridge::WebhookSecret;

#[derive(Parser)]
#[command(name = "bridge-sign", about = "Sign or verify analysis webhook payloads")]
struct Cli {
    /// Shared webhook secret
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    secret: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the compact JSON body and its signature header
    Sign {
        /// Payload file (stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Sign the input bytes as-is instead of re-serializing the JSON
        #[arg(long)]
        raw: bool,
    },
    /// Check a signature against the exact input bytes
    Verify {
        #[arg(long)]
        file: Option<PathBuf>,

        /// Signature, with or without the sha256= prefix
        #[arg(long)]
        signature: String,
    },
}

fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>> {
    match file {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Body to send and the signature over exactly those bytes.
fn signed_body(input: Vec<u8>, raw: bool, secret: &WebhookSecret) -> Result<(Vec<u8>, String)> {
    let body = if raw {
        input
    } else {
        let value: serde_json::Value =
            serde_json::from_slice(&input).context("Input is not valid JSON")?;
        serde_json::to_vec(&value).context("Failed to serialize payload")?
    };
    let signature = sign_bytes(&body, secret);
    Ok((body, signature))
}

fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let secret = WebhookSecret::new(cli.secret);

    if !secret.is_configured() {
        warn!("signing_with_empty_secret");
    }

    match cli.command {
        Command::Sign { file, raw } => {
            let input = read_input(file.as_ref())?;

            let (body, signature) = signed_body(input, raw, &secret)?;

            info!(body_length = body.len(), raw = raw, "payload_signed");

            println!("{}", String::from_utf8_lossy(&body));
            println!("{}: {}", SIGNATURE_HEADER, signature_header_value(&signature));
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { file, signature } => {
            let input = read_input(file.as_ref())?;

            match check_signature_header(&input, Some(&signature), &secret) {
                SignatureCheck::Valid => {
                    println!("valid");
                    Ok(ExitCode::SUCCESS)
                }
                SignatureCheck::Skipped => {
                    println!("skipped: no secret configured");
                    Ok(ExitCode::FAILURE)
                }
                SignatureCheck::Missing | SignatureCheck::Invalid => {
                    println!("invalid");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
