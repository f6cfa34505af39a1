//! HTTP client for the finance REST API.
//!
//! Every call goes through [`ApiClient::execute`], which attaches the current
//! access token and recovers from an expired one: a 401 triggers one shared
//! refresh and a single resend. A 401 on the resend is final.

use reqwest::{Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::Session;

use super::{ApiError, RefreshError};

/// A request that can be sent again verbatim after a token refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("unserializable body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// Turn a filter struct into query pairs.
///
/// `None` fields are dropped, strings are passed through untouched and every
/// other scalar uses its JSON rendering.
pub fn query_pairs<Q: Serialize>(query: &Q) -> Vec<(String, String)> {
    match serde_json::to_value(query) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(s) => Some((key, s)),
                other => Some((key, other.to_string())),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// API client for the finance backend.
/// Clone is cheap - the session and the reqwest pool are shared.
#[derive(Clone)]
pub struct ApiClient {
    session: Session,
}

impl ApiClient {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// URL of a finance resource path such as `transactions/` or `budgets/3/`.
    pub fn resource_url(&self, path: &str) -> String {
        self.session.config().resource_url(path)
    }

    pub fn accounts_url(&self, path: &str) -> String {
        self.session.config().accounts_url(path)
    }

    async fn send_once(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<Response, reqwest::Error> {
        let mut builder = self
            .session
            .http()
            .request(request.method.clone(), &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder.send().await
    }

    /// Send `request`, refreshing the access token and resending once on 401.
    ///
    /// Returns the successful response, or the error for the first non-401
    /// failure. When the refresh itself fails the credentials are dropped and
    /// the caller gets [`ApiError::Unauthorized`].
    pub async fn execute(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let sent_with = self.session.access_token();
        debug!(method = %request.method, url = %request.url, "Sending request");
        let response = self.send_once(request, sent_with.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check_response(response).await;
        }

        // Another request may have refreshed while this one was on the wire.
        let token = match self.session.access_token() {
            Some(current) if sent_with.as_ref() != Some(&current) => {
                debug!(url = %request.url, "Retrying with token refreshed elsewhere");
                current
            }
            _ => match self.session.refresh_access_token().await {
                Ok(token) => token,
                // Logged out or logged in again meanwhile; leave that state alone
                Err(RefreshError::Superseded) => {
                    debug!(url = %request.url, "Refresh superseded, not retrying");
                    return Err(ApiError::Unauthorized);
                }
                Err(e) => {
                    warn!(error = %e, "Token refresh failed, clearing credentials");
                    self.session.expire();
                    return Err(ApiError::Unauthorized);
                }
            },
        };

        let response = self.send_once(request, Some(&token)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(url = %request.url, "Request rejected after token refresh");
            return Err(ApiError::Unauthorized);
        }
        Self::check_response(response).await
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Execute and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("{} {}: {}", request.method, request.url, e))
        })
    }

    /// Execute and ignore the body (DELETE answers 204).
    pub async fn send_empty(&self, request: &ApiRequest) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: Vec<(String, String)>,
    ) -> Result<T, ApiError> {
        self.send_json(&ApiRequest::get(url).query(query)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(&ApiRequest::post(url).json(body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(&ApiRequest::patch(url).json(body)?).await
    }

    pub async fn delete_at(&self, url: &str) -> Result<(), ApiError> {
        self.send_empty(&ApiRequest::delete(url)).await
    }
}
