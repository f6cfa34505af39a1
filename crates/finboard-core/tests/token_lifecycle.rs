//! End-to-end token lifecycle against a mock backend: sign in, survive an
//! access token expiry, lose the refresh token, get sent back to login with
//! the requested location preserved, and return there after signing in again.

use std::sync::Arc;

use finboard_core::api::ApiClient;
use finboard_core::auth::{CredentialPair, FileTokenStore, Session, TokenStore};
use finboard_core::models::{BudgetQuery, CategoryQuery};
use finboard_core::{ApiConfig, GuardDecision, Location, Route, Router};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_login(server: &MockServer, access: &str, refresh: &str) {
    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .and(body_json(serde_json::json!({"username": "sam", "password": "pw"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access": access, "refresh": refresh})),
        )
        .up_to_n_times(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_session_lifecycle() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileTokenStore::new(dir.path().to_path_buf()));

    let session = Session::with_client(
        ApiConfig::with_base(server.uri()),
        store.clone(),
        reqwest::Client::new(),
    );
    let client = ApiClient::new(session.clone());
    let mut router = Router::new(session.clone());

    // Cold start with nothing persisted
    assert_eq!(router.navigate("/categories"), &GuardDecision::Pending);
    session.hydrate();
    assert_eq!(
        router.on_session_change(),
        &GuardDecision::Redirect {
            to: Route::Login,
            from: Location::parse("/categories"),
        }
    );

    // Sign in and land on the requested view
    mount_login(&server, "acc-1", "ref-1").await;
    session.login("sam", "pw").await.unwrap();
    assert_eq!(
        store.get(),
        Some(CredentialPair::new("acc-1", "ref-1"))
    );
    assert_eq!(
        router.after_login(),
        &GuardDecision::Render(Route::Categories)
    );

    // acc-1 has expired; the refresh mints acc-2 and the call succeeds
    Mock::given(method("GET"))
        .and(path("/api/finance/categories/"))
        .and(header("Authorization", "Bearer acc-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/finance/categories/"))
        .and(header("Authorization", "Bearer acc-2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"id": 1, "name": "Rent"}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .and(body_json(serde_json::json!({"refresh": "ref-1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"access": "acc-2"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let categories = client
        .list_categories(&CategoryQuery::default())
        .await
        .unwrap();
    assert_eq!(categories.len(), 1);
    // The refreshed token reached disk and the refresh token was kept
    let reopened = FileTokenStore::new(dir.path().to_path_buf());
    assert_eq!(
        reopened.get(),
        Some(CredentialPair::new("acc-2", "ref-1"))
    );

    // Now the refresh token is revoked too
    router.navigate("/budgets?period=M");
    Mock::given(method("GET"))
        .and(path("/api/finance/budgets/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"detail": "Token is blacklisted"})),
        )
        .mount(&server)
        .await;

    let err = client
        .list_budgets(&BudgetQuery::default())
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(reopened.get().is_none());
    assert!(!session.is_authenticated());
    assert_eq!(
        router.on_session_change(),
        &GuardDecision::Redirect {
            to: Route::Login,
            from: Location::parse("/budgets?period=M"),
        }
    );

    // Signing in again resumes where the user was
    mount_login(&server, "acc-3", "ref-3").await;
    session.login("sam", "pw").await.unwrap();
    assert_eq!(router.after_login(), &GuardDecision::Render(Route::Budgets));
    assert_eq!(router.current().to_string(), "/budgets?period=M");
}
