// src/utils/settings.rs
//! Runtime settings.
//!
//! Defaults are layered under `GATEKEEPER_*` environment variables (a `.env`
//! file is loaded first by `main`). For example `GATEKEEPER_TOKEN_SECRET`
//! sets `token_secret`.

use crate::error::{AuthError, Result};
use crate::models::credential::Policy;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "GATEKEEPER";

/// Shortest accepted HS256 secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Validated service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub default_audience: String,
    pub token_issuer: String,
    pub token_secret: String,
    pub token_ttl_secs: u64,
    pub challenge_ttl_secs: u64,
    pub challenge_sweep_secs: u64,
    #[serde(default)]
    pub registry_url: Option<String>,
    /// Enrollment and revocation file for the in-process registry
    #[serde(default)]
    pub registry_file: Option<String>,
    pub registry_timeout_ms: u64,
    pub bind_proof_of_possession: bool,
    /// Role granted by the in-process registry to unenrolled credentials
    #[serde(default)]
    pub local_default_role: Option<String>,
    /// Comma-separated scopes that go with `local_default_role`
    pub local_default_scopes: String,
}

impl Settings {
    /// Builder pre-loaded with every default. `token_secret` has none.
    pub fn builder() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("bind_addr", "127.0.0.1:8787")?
            .set_default("default_audience", "agenticdid.io")?
            .set_default("token_issuer", "https://agenticdid.io")?
            .set_default("token_ttl_secs", 120)?
            .set_default("challenge_ttl_secs", 60)?
            .set_default("challenge_sweep_secs", 5)?
            .set_default("registry_timeout_ms", 3000)?
            .set_default("bind_proof_of_possession", true)?
            .set_default("local_default_scopes", "")?)
    }

    /// Loads defaults overridden by the process environment.
    ///
    /// # Errors
    /// `AuthError::Config` when a value is missing, fails to parse, or fails
    /// validation.
    pub fn load() -> Result<Self> {
        let config = Self::builder()?
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Self::from_config(config)
    }

    /// Deserializes and validates an assembled `Config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.token_secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::Config(format!(
                "token_secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        if self.token_ttl_secs == 0 || self.challenge_ttl_secs == 0 {
            return Err(AuthError::Config("TTLs must be non-zero".into()));
        }
        if self.challenge_sweep_secs == 0 {
            return Err(AuthError::Config("challenge_sweep_secs must be non-zero".into()));
        }
        if self.registry_timeout_ms == 0 {
            return Err(AuthError::Config("registry_timeout_ms must be non-zero".into()));
        }
        if self.default_audience.trim().is_empty() {
            return Err(AuthError::Config("default_audience must not be empty".into()));
        }
        if self.registry_url.is_some() && self.registry_file.is_some() {
            return Err(AuthError::Config(
                "registry_url and registry_file are mutually exclusive".into(),
            ));
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|e| AuthError::Config(format!("bad bind_addr '{}': {}", self.bind_addr, e)))
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn challenge_ttl(&self) -> Duration {
        Duration::from_secs(self.challenge_ttl_secs)
    }

    pub fn challenge_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.challenge_sweep_secs)
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_millis(self.registry_timeout_ms)
    }

    /// Parsed `local_default_scopes`, blanks dropped.
    pub fn local_default_scopes(&self) -> Vec<String> {
        self.local_default_scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Fallback policy for unenrolled credentials, if a role is configured.
    pub fn local_default_policy(&self) -> Option<Policy> {
        self.local_default_role.clone().map(|role| Policy {
            role,
            scopes: self.local_default_scopes(),
        })
    }
}
