//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API location, the token endpoints, the login identifier
//! field and the last identifier used to sign in.
//!
//! Configuration is stored at `~/.config/finboard/config.json`. Every setting
//! can be overridden from the environment (see [`Config::apply_env`]).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "finboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// HTTP request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_API_BASE: &str = "http://localhost:8000";
const DEFAULT_API_PREFIX: &str = "/api/finance";
const DEFAULT_ACCOUNTS_PREFIX: &str = "/api/accounts";
const DEFAULT_TOKEN_OBTAIN_PATH: &str = "/api/token/";
const DEFAULT_TOKEN_REFRESH_PATH: &str = "/api/token/refresh/";

/// Which JSON field carries the login identifier in the token-obtain body.
///
/// This is a deployment choice: backends with an email-based user model
/// expect `email`, the stock user model expects `username`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierField {
    #[default]
    Username,
    Email,
}

impl IdentifierField {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierField::Username => "username",
            IdentifierField::Email => "email",
        }
    }
}

impl fmt::Display for IdentifierField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "username" => Ok(IdentifierField::Username),
            "email" => Ok(IdentifierField::Email),
            other => Err(anyhow::anyhow!(
                "Unknown identifier field '{}', expected 'username' or 'email'",
                other
            )),
        }
    }
}

/// Where the credential pair is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for TokenBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(TokenBackend::File),
            "keyring" => Ok(TokenBackend::Keyring),
            "memory" => Ok(TokenBackend::Memory),
            other => Err(anyhow::anyhow!(
                "Unknown token backend '{}', expected 'file', 'keyring' or 'memory'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub api_prefix: String,
    pub accounts_prefix: String,
    pub token_obtain_path: String,
    pub token_refresh_path: String,
    pub identifier_field: IdentifierField,
    pub token_backend: TokenBackend,
    pub request_timeout_secs: u64,
    pub last_identifier: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            accounts_prefix: DEFAULT_ACCOUNTS_PREFIX.to_string(),
            token_obtain_path: DEFAULT_TOKEN_OBTAIN_PATH.to_string(),
            token_refresh_path: DEFAULT_TOKEN_REFRESH_PATH.to_string(),
            identifier_field: IdentifierField::default(),
            token_backend: TokenBackend::default(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            last_identifier: None,
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Record the identifier of the last successful login in the file at
    /// `path`, leaving every other saved setting as it is on disk.
    ///
    /// Environment and command line overrides live only in the in-memory
    /// `Config` of one run and never reach the file through this call.
    pub fn remember_identifier(path: &Path, identifier: &str) -> Result<()> {
        let mut saved = Self::load_from(path)?;
        saved.last_identifier = Some(identifier.to_string());
        saved.save_to(path)
    }

    /// Override settings from `FINBOARD_*` environment variables.
    ///
    /// Unparseable values are logged and ignored so a typo in the
    /// environment never prevents startup.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("FINBOARD_API_BASE") {
            self.api_base = v;
        }
        if let Some(v) = lookup("FINBOARD_API_PREFIX") {
            self.api_prefix = v;
        }
        if let Some(v) = lookup("FINBOARD_ACCOUNTS_PREFIX") {
            self.accounts_prefix = v;
        }
        if let Some(v) = lookup("FINBOARD_JWT_OBTAIN") {
            self.token_obtain_path = v;
        }
        if let Some(v) = lookup("FINBOARD_JWT_REFRESH") {
            self.token_refresh_path = v;
        }
        if let Some(v) = lookup("FINBOARD_JWT_USERNAME_FIELD") {
            match v.parse() {
                Ok(field) => self.identifier_field = field,
                Err(e) => warn!(error = %e, "Ignoring FINBOARD_JWT_USERNAME_FIELD"),
            }
        }
        if let Some(v) = lookup("FINBOARD_TOKEN_BACKEND") {
            match v.parse() {
                Ok(backend) => self.token_backend = backend,
                Err(e) => warn!(error = %e, "Ignoring FINBOARD_TOKEN_BACKEND"),
            }
        }
        if let Some(v) = lookup("FINBOARD_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(e) => warn!(error = %e, value = %v, "Ignoring FINBOARD_TIMEOUT_SECS"),
            }
        }
    }

    /// The immutable subset of settings the API client and session need.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            api_base: self.api_base.trim_end_matches('/').to_string(),
            api_prefix: self.api_prefix.clone(),
            accounts_prefix: self.accounts_prefix.clone(),
            token_obtain_path: self.token_obtain_path.clone(),
            token_refresh_path: self.token_refresh_path.clone(),
            identifier_field: self.identifier_field,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Location of `config.json` in the user's config directory.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the persisted credential pair.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

/// Resolved API location and auth settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_base: String,
    pub api_prefix: String,
    pub accounts_prefix: String,
    pub token_obtain_path: String,
    pub token_refresh_path: String,
    pub identifier_field: IdentifierField,
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// Config pointing at `api_base` with default paths. Handy for tests
    /// and for tools that only know the server address.
    pub fn with_base(api_base: impl Into<String>) -> Self {
        Config {
            api_base: api_base.into(),
            ..Config::default()
        }
        .api_config()
    }

    pub fn identifier_field(mut self, field: IdentifierField) -> Self {
        self.identifier_field = field;
        self
    }

    pub fn obtain_url(&self) -> String {
        join_url(&self.api_base, &self.token_obtain_path)
    }

    pub fn refresh_url(&self) -> String {
        join_url(&self.api_base, &self.token_refresh_path)
    }

    /// URL of a finance resource path such as `transactions/` or `budgets/3/`.
    pub fn resource_url(&self, path: &str) -> String {
        join_url(&join_url(&self.api_base, &self.api_prefix), path)
    }

    pub fn accounts_url(&self, path: &str) -> String {
        join_url(&join_url(&self.api_base, &self.accounts_prefix), path)
    }
}

/// Join two URL fragments with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
