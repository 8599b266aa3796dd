// src/main.rs

//! # DID Gatekeeper - Main Entry Point
//!
//! This module serves as the main entry point for the presentation gatekeeper.
//! It loads settings, wires the verification pipeline together and starts the
//! API server.
//!
//! ## Architecture Overview
//! 1. **Challenge Layer**: `ChallengeAuthority` issues and consumes single-use nonces
//! 2. **Verification Layer**: `PresentationVerifier` checks signature, disclosure proof and registry status
//! 3. **Registry Layer**: remote `HttpCredentialRegistry` or in-process `LocalCredentialRegistry`
//! 4. **Token Layer**: `TokenService` mints and checks capability tokens
//!
//! ## Commands
//! - `serve` (default): run the API server
//! - `enroll`: print a registry file entry for a seed-derived holder credential
//! - `present`: authenticate that credential against a running gatekeeper
//!
//! `RUST_LOG` sets the log filter (default: info).

use crate::contracts::{credential_registry, issuer_policy};
use crate::models::credential::DisclosedFields;
use crate::services::api_server::ApiServer;
use crate::services::challenge_authority::{ChallengeAuthority, InMemoryChallengeStore};
use crate::services::token_service::TokenService;
use crate::services::verifier::PresentationVerifier;
use crate::utils::settings::Settings;
use crate::wallet::agent_credential::AgentCredential;
use crate::wallet::gatekeeper_client::GatekeeperClient;
use crate::zkp::selective_disclosure::HashCommitment;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;

// Module declarations (organized by functional domain)
mod contracts; // Registry contract and issuer allow-lists
mod error; // Error taxonomy
mod models; // Data structures
mod services; // Pipeline services and API
mod utils; // Helper functions
mod wallet; // Holder-side keys, presentations and client
mod zkp; // Selective disclosure commitments

#[derive(Parser)]
#[command(name = "did-gatekeeper")]
#[command(about = "Trades signed credential presentations for capability tokens")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gatekeeper API server (default if no subcommand provided)
    Serve,
    /// Print the registry file entry for a holder credential
    Enroll {
        #[command(flatten)]
        holder: HolderArgs,

        /// Role the credential authorizes
        #[arg(long, default_value = "bank_client")]
        role: String,

        /// Comma-separated scopes granted with the role
        #[arg(long, value_delimiter = ',')]
        scopes: Vec<String>,
    },
    /// Authenticate a holder credential against a running gatekeeper
    Present {
        #[command(flatten)]
        holder: HolderArgs,

        /// Role to disclose
        #[arg(long, default_value = "bank_client")]
        role: String,

        /// Gatekeeper base URL
        #[arg(short, long, default_value = "http://127.0.0.1:8787")]
        gatekeeper: String,

        /// Challenge audience (gatekeeper default if omitted)
        #[arg(short, long)]
        audience: Option<String>,
    },
}

/// Identifies a holder credential. The pid and signing key derive from `seed`.
#[derive(Args)]
struct HolderArgs {
    /// Holder secret
    #[arg(long)]
    seed: String,

    /// Issuer DID
    #[arg(long, default_value = issuer_policy::BANK_OF_AMERICA)]
    issuer: String,

    #[arg(long, default_value = "FINANCIAL_ACCOUNT")]
    credential_type: String,

    /// Credential expiry, Unix milliseconds
    #[arg(long)]
    expires_at: Option<i64>,
}

impl HolderArgs {
    fn credential(&self) -> error::Result<AgentCredential> {
        AgentCredential::from_seed(
            self.seed.as_bytes(),
            &self.credential_type,
            &self.issuer,
            self.expires_at,
        )
    }
}

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment configuration
/// 2. Parse the command line
/// 3. Run the server or the requested holder command
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Enroll {
            holder,
            role,
            scopes,
        } => {
            let scopes: Vec<&str> = scopes
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect();
            let record = holder.credential()?.enrollment_record(&role, &scopes)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Present {
            holder,
            role,
            gatekeeper,
            audience,
        } => {
            let credential = holder.credential()?;
            if credential.is_expired() {
                log::warn!("credential expired; the registry will refuse it");
            }
            let mut disclosed = DisclosedFields::new();
            disclosed.insert("role".into(), serde_json::Value::String(role));

            let client = GatekeeperClient::new(&gatekeeper, Duration::from_secs(10))?;
            let granted = client
                .authenticate(&credential, disclosed, audience.as_deref(), &HashCommitment)
                .await
                .with_context(|| format!("authentication at {} failed", gatekeeper))?;
            println!("{}", serde_json::to_string_pretty(&granted)?);
            Ok(())
        }
    }
}

/// Loads settings, wires the pipeline and serves until shutdown.
///
/// # Environment Variables
/// - `GATEKEEPER_TOKEN_SECRET`: HS256 secret, at least 32 bytes (required)
/// - `GATEKEEPER_REGISTRY_URL`: (Optional) remote registry
/// - `GATEKEEPER_REGISTRY_FILE`: (Optional) enrollments for the local registry
/// - `GATEKEEPER_BIND_ADDR`: (Optional) listen address (default: 127.0.0.1:8787)
async fn serve() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    let addr = settings.socket_addr()?;

    let registry = credential_registry::from_settings(&settings)?;

    let challenges = Arc::new(ChallengeAuthority::new(
        Arc::new(InMemoryChallengeStore::new()),
        settings.default_audience.clone(),
        settings.challenge_ttl(),
    ));
    let _sweeper = challenges
        .clone()
        .spawn_sweeper(settings.challenge_sweep_interval());

    let verifier = PresentationVerifier::new(
        challenges.clone(),
        Arc::new(HashCommitment),
        registry,
        settings.registry_timeout(),
        settings.bind_proof_of_possession,
    );

    let api_server = ApiServer::new(challenges, verifier, TokenService::from_settings(&settings));

    log::info!("Available endpoints:");
    log::info!("- POST /challenge");
    log::info!("- POST /present");
    log::info!("- GET  /verify");
    log::info!("- GET  /health");

    api_server.run(addr).await?;
    Ok(())
}
