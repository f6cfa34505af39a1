//! Account endpoints: sign-up and the current user's profile.

use tracing::info;

use crate::models::{Registration, User};

use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// Create an account. Does not log in; call `Session::login` afterwards.
    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let request = ApiRequest::post(self.accounts_url("register/")).json(registration)?;
        self.send_empty(&request).await?;
        info!(email = %registration.email, "Account registered");
        Ok(())
    }

    /// Profile of the authenticated user.
    pub async fn me(&self) -> Result<User, ApiError> {
        self.get(&self.accounts_url("me/"), Vec::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialPair, MemoryTokenStore, Session};
    use crate::config::ApiConfig;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, store: MemoryTokenStore) -> ApiClient {
        let session = Session::with_client(
            ApiConfig::with_base(server.uri()),
            Arc::new(store),
            reqwest::Client::new(),
        );
        ApiClient::new(session)
    }

    #[tokio::test]
    async fn test_me() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/accounts/me/"))
            .and(header("Authorization", "Bearer acc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1, "email": "a@b.com", "first_name": "Ada", "last_name": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(
            &server,
            MemoryTokenStore::with_pair(CredentialPair::new("acc", "ref")),
        );
        let user = client.me().await.unwrap();
        assert_eq!(user.display_name(), "Ada");
    }

    #[tokio::test]
    async fn test_register_password_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/accounts/register/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "password": ["Passwords do not match."]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, MemoryTokenStore::new());
        let registration = Registration {
            email: "a@b.com".into(),
            password: "correct horse".into(),
            password2: "battery staple".into(),
            first_name: String::new(),
            last_name: String::new(),
        };
        match client.register(&registration).await.unwrap_err() {
            ApiError::Validation(errors) => {
                assert_eq!(errors.field("password"), ["Passwords do not match."])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
