//! Core library for finboard.
//!
//! This crate contains everything the front ends share:
//! - API client with transparent access-token refresh
//! - Session and token storage
//! - Route guard and navigation state
//! - Data models for the finance resources
//! - Configuration and formatting utilities

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod routing;
pub mod utils;

pub use api::{ApiClient, ApiError, AuthError, Outcome};
pub use auth::{Session, SessionState, TokenStore};
pub use config::{ApiConfig, Config, IdentifierField, TokenBackend};
pub use routing::{GuardDecision, Location, Route, RouteGuard, Router};
