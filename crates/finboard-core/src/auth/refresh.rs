//! Access token refresh.
//!
//! At most one refresh runs at a time. Callers that need a fresh token while
//! one is already being minted wait on the same request instead of sending
//! their own; the marker is dropped as soon as that request settles so the
//! next expiry starts a new one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::RefreshError;

pub type RefreshFuture = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

struct Flight {
    id: u64,
    future: RefreshFuture,
}

/// Pending refresh marker shared by every caller of one session.
#[derive(Default)]
pub struct SingleFlight {
    slot: Arc<Mutex<Option<Flight>>>,
    next_id: AtomicU64,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the refresh in flight, or start one with `start`.
    ///
    /// `start` is only invoked when nothing is pending. The returned future
    /// resolves to the same result for every caller that joined it.
    pub fn join_or_start<F>(&self, start: F) -> RefreshFuture
    where
        F: FnOnce() -> BoxFuture<'static, Result<String, RefreshError>>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(flight) = slot.as_ref() {
            debug!(flight = flight.id, "Joining in-flight token refresh");
            return flight.future.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let operation = start();
        let marker = Arc::clone(&self.slot);
        let future = async move {
            let result = operation.await;
            let mut slot = marker.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.as_ref().is_some_and(|f| f.id == id) {
                *slot = None;
            }
            result
        }
        .boxed()
        .shared();

        debug!(flight = id, "Starting token refresh");
        *slot = Some(Flight {
            id,
            future: future.clone(),
        });
        future
    }

    /// Whether a refresh is pending right now.
    pub fn in_flight(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// POST the refresh token and return the newly minted access token.
pub async fn request_access_token(
    http: &Client,
    url: &str,
    refresh: &str,
) -> Result<String, RefreshError> {
    let response = http
        .post(url)
        .json(&RefreshRequest { refresh })
        .send()
        .await
        .map_err(|e| RefreshError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RefreshError::Rejected(status.as_u16()));
    }

    let body: RefreshResponse = response
        .json()
        .await
        .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

    if body.access.is_empty() {
        return Err(RefreshError::InvalidResponse(
            "empty access token".to_string(),
        ));
    }
    Ok(body.access)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_concurrent_callers_share_one_operation() {
        let flight = SingleFlight::new();
        let started = Arc::new(AtomicUsize::new(0));

        let make = |started: Arc<AtomicUsize>| {
            move || {
                started.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, RefreshError>("fresh".to_string())
                }
                .boxed()
            }
        };

        let a = flight.join_or_start(make(Arc::clone(&started)));
        let b = flight.join_or_start(make(Arc::clone(&started)));
        let c = flight.join_or_start(make(Arc::clone(&started)));
        assert!(flight.in_flight());

        let (ra, rb, rc) = tokio::join!(a, b, c);
        assert_eq!(ra.unwrap(), "fresh");
        assert_eq!(rb.unwrap(), "fresh");
        assert_eq!(rc.unwrap(), "fresh");
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_marker_cleared_after_failure() {
        let flight = SingleFlight::new();

        let first = flight.join_or_start(|| async { Err(RefreshError::Rejected(401)) }.boxed());
        assert_eq!(first.await, Err(RefreshError::Rejected(401)));
        assert!(!flight.in_flight());

        // The next caller starts a brand new attempt
        let second = flight.join_or_start(|| async { Ok("again".to_string()) }.boxed());
        assert_eq!(second.await.unwrap(), "again");
        assert!(!flight.in_flight());
    }

    #[tokio::test]
    async fn test_request_access_token_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token/refresh/"))
            .and(body_json(serde_json::json!({"refresh": "r-1"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"access": "a-2"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/api/token/refresh/", server.uri());
        let token = request_access_token(&Client::new(), &url, "r-1")
            .await
            .unwrap();
        assert_eq!(token, "a-2");
    }

    #[tokio::test]
    async fn test_request_access_token_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token/refresh/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(
                serde_json::json!({"detail": "Token is invalid or expired"}),
            ))
            .mount(&server)
            .await;

        let url = format!("{}/api/token/refresh/", server.uri());
        let err = request_access_token(&Client::new(), &url, "stale")
            .await
            .unwrap_err();
        assert_eq!(err, RefreshError::Rejected(401));
    }

    #[tokio::test]
    async fn test_request_access_token_garbage_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let url = format!("{}/api/token/refresh/", server.uri());
        let err = request_access_token(&Client::new(), &url, "r")
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::InvalidResponse(_)));
    }
}
