//! Authentication state for the finance API.
//!
//! This module provides:
//! - `TokenStore`: durable home of the access/refresh pair (file, keychain or memory)
//! - `Session`: the single authentication context shared by the client and router
//! - `SingleFlight`: the guard that keeps concurrent refreshes down to one request
//!
//! The session starts unhydrated; nothing should decide on authorization until
//! [`Session::hydrate`] has read the store.

pub mod refresh;
pub mod session;
pub mod tokens;

pub use refresh::SingleFlight;
pub use session::{Session, SessionState};
pub use tokens::{CredentialPair, FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
