use std::sync::Arc;

use anyhow::{Context, Result};
use futures::FutureExt;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::refresh::{request_access_token, SingleFlight};
use super::tokens::{CredentialPair, TokenStore};
use crate::api::{AuthError, RefreshError, ValidationErrors};
use crate::config::ApiConfig;

/// Snapshot of what the rest of the app may assume about the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    /// The token store has been read at least once.
    pub hydrated: bool,
    /// An access token is present.
    pub authenticated: bool,
}

#[derive(Debug, Deserialize)]
struct TokenPairResponse {
    access: String,
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    detail: String,
}

/// Process-wide authentication context.
///
/// Cloning is cheap and every clone observes the same state. The token store
/// is the durable backing; the watch channel carries the in-memory view that
/// the router and views react to.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: ApiConfig,
    http: Client,
    store: Arc<dyn TokenStore>,
    state: Arc<watch::Sender<SessionState>>,
    refresh: SingleFlight,
}

impl Session {
    /// Create a session with its own HTTP client using the configured timeout.
    pub fn new(config: ApiConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(config, store, http))
    }

    /// Create a session sharing an existing connection pool.
    pub fn with_client(config: ApiConfig, store: Arc<dyn TokenStore>, http: Client) -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(SessionInner {
                config,
                http,
                store,
                state: Arc::new(tx),
                refresh: SingleFlight::new(),
            }),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    pub fn http(&self) -> &Client {
        &self.inner.http
    }

    /// Load persisted credentials. The session counts as hydrated afterwards
    /// whether or not anything was found; later calls change nothing.
    pub fn hydrate(&self) -> SessionState {
        if self.is_hydrated() {
            return self.state();
        }
        let authenticated = self.inner.store.get().is_some();
        debug!(authenticated, "Session hydrated from token store");
        self.inner.state.send_modify(|s| {
            s.hydrated = true;
            s.authenticated = authenticated;
        });
        self.state()
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Receiver that wakes on every login, logout, refresh or expiry.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().authenticated
    }

    pub fn is_hydrated(&self) -> bool {
        self.state().hydrated
    }

    /// Current access token straight from the store.
    pub fn access_token(&self) -> Option<String> {
        self.inner.store.get().map(|pair| pair.access)
    }

    /// Exchange an identifier and password for a token pair.
    ///
    /// The identifier is sent under the configured field name. On success the
    /// pair is persisted and the new state is published before returning; on
    /// failure nothing changes.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<(), AuthError> {
        let field = self.inner.config.identifier_field;
        let mut body = serde_json::Map::new();
        body.insert(field.as_str().to_string(), identifier.into());
        body.insert("password".to_string(), password.into());

        let response = self
            .inner
            .http
            .post(self.inner.config.obtain_url())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Login rejected");
            return Err(login_failure(status, &text));
        }

        let tokens: TokenPairResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let pair = CredentialPair::new(tokens.access, tokens.refresh);
        if !pair.is_complete() {
            return Err(AuthError::InvalidResponse(
                "token pair is missing a token".to_string(),
            ));
        }

        self.inner.store.set(&pair);
        self.publish(true);
        info!(field = %field, "Login successful");
        Ok(())
    }

    /// Forget the credentials. Safe to call when already logged out.
    pub fn logout(&self) {
        self.inner.store.clear();
        self.publish(false);
        info!("Logged out");
    }

    /// Drop credentials after an unrecoverable refresh failure.
    pub(crate) fn expire(&self) {
        self.inner.store.clear();
        self.publish(false);
    }

    /// Mint a new access token, joining a refresh already in flight.
    ///
    /// Fails immediately without a network call when no refresh token is
    /// stored, and with [`RefreshError::Superseded`] when the stored pair
    /// was cleared or replaced before the new token arrived. The caller
    /// decides what to do with credentials on failure.
    pub async fn refresh_access_token(&self) -> Result<String, RefreshError> {
        let future = self.inner.refresh.join_or_start(|| {
            let store = Arc::clone(&self.inner.store);
            let state = Arc::clone(&self.inner.state);
            let http = self.inner.http.clone();
            let url = self.inner.config.refresh_url();
            async move {
                let pair = store.get().ok_or(RefreshError::NoRefreshToken)?;
                let access = request_access_token(&http, &url, &pair.refresh).await?;
                // A logout or a new login while the request was out wins
                let unchanged = store
                    .get()
                    .is_some_and(|current| current.refresh == pair.refresh);
                if !unchanged || !store.set_access(&access) {
                    warn!("Credentials changed during token refresh, discarding new token");
                    return Err(RefreshError::Superseded);
                }
                state.send_if_modified(|s| {
                    let changed = !s.authenticated;
                    s.authenticated = true;
                    changed
                });
                info!("Access token refreshed");
                Ok(access)
            }
            .boxed()
        });
        future.await
    }

    /// Whether a refresh is pending right now.
    pub fn refresh_in_flight(&self) -> bool {
        self.inner.refresh.in_flight()
    }

    fn publish(&self, authenticated: bool) {
        self.inner.state.send_if_modified(|s| {
            let changed = !s.hydrated || s.authenticated != authenticated;
            s.hydrated = true;
            s.authenticated = authenticated;
            changed
        });
    }
}

/// Turn a failed token-obtain response into a user-facing error.
fn login_failure(status: reqwest::StatusCode, body: &str) -> AuthError {
    match status.as_u16() {
        400 | 401 | 403 => {
            if let Ok(detail) = serde_json::from_str::<DetailResponse>(body) {
                return AuthError::Rejected(detail.detail);
            }
            let errors = ValidationErrors::from_body(body);
            if errors.is_empty() {
                AuthError::Rejected("Invalid credentials".to_string())
            } else {
                AuthError::Rejected(errors.to_string())
            }
        }
        code => AuthError::Endpoint {
            status: code,
            body: body.chars().take(200).collect(),
        },
    }
}
