//! Durable storage for the access/refresh token pair.
//!
//! Every backend fails open: a storage error is logged and reported as
//! "no credentials", never returned to the caller.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Token file name in the data directory
const TOKEN_FILE: &str = "tokens.json";

/// Keychain service name
const SERVICE_NAME: &str = "finboard";

/// An access/refresh token pair.
///
/// Both halves are always present; a stored pair with either half missing
/// or empty is never handed out.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// A pair is usable only when both tokens are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.access.is_empty() && !self.refresh.is_empty()
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Persistent home of the credential pair.
pub trait TokenStore: Send + Sync {
    /// The stored pair, or `None` when logged out or storage is unreadable.
    fn get(&self) -> Option<CredentialPair>;

    fn set(&self, pair: &CredentialPair);

    /// Replace the access token, keeping the refresh token.
    /// Does nothing and returns `false` when no pair is stored.
    fn set_access(&self, access: &str) -> bool;

    fn clear(&self);
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    pair: Mutex<Option<CredentialPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            pair: Mutex::new(Some(pair)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<CredentialPair> {
        self.pair
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(CredentialPair::is_complete)
    }

    fn set(&self, pair: &CredentialPair) {
        *self.pair.lock().unwrap_or_else(PoisonError::into_inner) = Some(pair.clone());
    }

    fn set_access(&self, access: &str) -> bool {
        let mut guard = self.pair.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut().filter(|pair| pair.is_complete()) {
            Some(pair) => {
                pair.access = access.to_string();
                true
            }
            None => false,
        }
    }

    fn clear(&self) {
        *self.pair.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// ============================================================================
// JSON file
// ============================================================================

/// Stores the pair as `tokens.json` in the given directory.
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    fn load(&self) -> Result<Option<CredentialPair>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read token file")?;
        let pair: CredentialPair =
            serde_json::from_str(&contents).context("Failed to parse token file")?;
        Ok(Some(pair))
    }

    fn save(&self, pair: &CredentialPair) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create token directory")?;
        let path = self.token_path();
        let contents = serde_json::to_string_pretty(pair)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&path)
            .context("Failed to open token file")?;

        // `mode` only applies when the file is created
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .context("Failed to restrict token file permissions")?;
        }
        file.write_all(contents.as_bytes())
            .context("Failed to write token file")?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<CredentialPair> {
        match self.load() {
            Ok(pair) => pair.filter(CredentialPair::is_complete),
            Err(e) => {
                warn!(error = %e, "Token file unreadable, treating as logged out");
                None
            }
        }
    }

    fn set(&self, pair: &CredentialPair) {
        if let Err(e) = self.save(pair) {
            warn!(error = %e, "Failed to persist credentials");
        }
    }

    fn set_access(&self, access: &str) -> bool {
        match self.get() {
            Some(mut pair) => {
                pair.access = access.to_string();
                self.set(&pair);
                true
            }
            None => false,
        }
    }

    fn clear(&self) {
        if let Err(e) = self.remove() {
            warn!(error = %e, "Failed to clear credentials");
        }
    }
}

// ============================================================================
// OS keychain
// ============================================================================

/// Stores the pair as one JSON secret in the OS keychain.
pub struct KeyringTokenStore {
    account: String,
}

impl KeyringTokenStore {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }

    fn load(&self) -> Result<Option<CredentialPair>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                let pair = serde_json::from_str(&secret)
                    .context("Failed to parse credentials from keychain")?;
                Ok(Some(pair))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve credentials from keychain"),
        }
    }

    fn save(&self, pair: &CredentialPair) -> Result<()> {
        let secret = serde_json::to_string(pair)?;
        self.entry()?
            .set_password(&secret)
            .context("Failed to store credentials in keychain")
    }

    fn remove(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credentials from keychain"),
        }
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Option<CredentialPair> {
        match self.load() {
            Ok(pair) => pair.filter(CredentialPair::is_complete),
            Err(e) => {
                warn!(error = %e, "Keychain unavailable, treating as logged out");
                None
            }
        }
    }

    fn set(&self, pair: &CredentialPair) {
        if let Err(e) = self.save(pair) {
            warn!(error = %e, "Failed to persist credentials");
        }
    }

    fn set_access(&self, access: &str) -> bool {
        match self.get() {
            Some(mut pair) => {
                pair.access = access.to_string();
                self.set(&pair);
                true
            }
            None => {
                debug!("No stored pair, access token not persisted");
                false
            }
        }
    }

    fn clear(&self) {
        if let Err(e) = self.remove() {
            warn!(error = %e, "Failed to clear credentials");
        }
    }
}
