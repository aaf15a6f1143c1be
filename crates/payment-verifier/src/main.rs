//! Payment verification CLI
//!
//! Commands:
//! - verify: Verify a payment described by a JSON request file
//! - ca-root: Show which CA root certificate the verifier would trust

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use threecities_common::VerificationInput;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payment_verifier::{Config, TrustRootResolver, VerificationClient};

#[derive(Parser)]
#[command(name = "verify-payment")]
#[command(about = "Verify a 3cities payment with the local verification service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a payment; exits 0 if verified, 1 otherwise
    Verify {
        /// JSON file with `terms` and `transfer` objects ("-" for stdin)
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Resolve the CA root certificate path
    CaRoot,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Verify { request } => {
            let json = read_request(&request)?;
            let input = VerificationInput::from_json(&json)
                .with_context(|| format!("Invalid request in {}", request.display()))?;

            let client = VerificationClient::new(&config);
            if client.verify_payment(&input.into_request()).await {
                println!("verified");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("not verified");
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::CaRoot => {
            let location = TrustRootResolver::from_config(&config).resolve().await?;
            println!("{} ({:?})", location.path.display(), location.source);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_request(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut json = String::new();
        std::io::stdin()
            .read_to_string(&mut json)
            .context("Failed to read request from stdin")?;
        return Ok(json);
    }

    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))
}
