//! REST client for the finance backend.
//!
//! This module provides the `ApiClient`, which wraps a shared `Session` and
//! turns every call into an authenticated request with transparent token
//! refresh, plus typed CRUD over each finance resource.
//!
//! The backend issues JWT pairs from its token endpoints; those two calls are
//! made by the session directly and never pass through the client.

pub mod accounts;
pub mod client;
pub mod error;
pub mod resources;

pub use client::{query_pairs, ApiClient, ApiRequest};
pub use error::{ApiError, AuthError, Outcome, RefreshError, ValidationErrors, NON_FIELD_ERRORS};
