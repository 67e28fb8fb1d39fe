//! Session token lifecycle.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use bazaar_client::ApiError;
use bazaar_client::api::ProductQuery;
use bazaar_client::store::{Action, AuthState, MemoryStorage, Store};
use bazaar_client::validation::LoginForm;
use bazaar_core::UserRole;
use bazaar_integration_tests::{HitCounter, MockApi, fail, ok, page, product, user};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;

const TOKEN: &str = "token-abc";

fn authed(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn server(product_hits: &HitCounter) -> Router {
    let hits = product_hits.clone();
    Router::new()
        .route(
            "/auth/login",
            post(|| async {
                ok(json!({
                    "accessToken": TOKEN,
                    "user": user("u1", "dana@example.com", "seller"),
                }))
            }),
        )
        .route(
            "/users/me",
            get(|headers: HeaderMap| async move {
                if authed(&headers) {
                    ok(user("u1", "dana@example.com", "seller")).into_response()
                } else {
                    fail(StatusCode::UNAUTHORIZED, "Session expired", &[])
                }
            }),
        )
        .route(
            "/products",
            get(move || async move {
                hits.hit();
                page(&[product("p1", "Linen Shirt", 40, 3)], 1, 12)
            }),
        )
}

fn login_form() -> LoginForm {
    LoginForm {
        email: "dana@example.com".to_string(),
        password: "hunter22".to_string(),
    }
}

#[tokio::test]
async fn test_login_sets_bearer_token() {
    let api = MockApi::start(server(&HitCounter::default())).await;
    let client = api.client();

    let session = client.login(&login_form()).await.unwrap();
    assert_eq!(session.access_token, TOKEN);
    assert_eq!(session.user.role, UserRole::Seller);
    assert!(client.has_token().await);

    let me = client.me().await.unwrap();
    assert_eq!(me.email_display(), "dana@example.com");
}

#[tokio::test]
async fn test_login_clears_cached_queries() {
    let hits = HitCounter::default();
    let api = MockApi::start(server(&hits)).await;
    let client = api.client();
    let query = ProductQuery::default();

    client.products(&query).await.unwrap();
    client.login(&login_form()).await.unwrap();
    client.products(&query).await.unwrap();

    assert_eq!(hits.count(), 2);
}

#[tokio::test]
async fn test_rejected_token_is_cleared() {
    let api = MockApi::start(server(&HitCounter::default())).await;
    let client = api.client();
    client.set_token(SecretString::from("stale")).await;

    let err = client.me().await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert_eq!(err.toast_message(), "Session expired");
    assert!(!client.has_token().await);
}

#[tokio::test]
async fn test_logout_clears_token_and_cache() {
    let hits = HitCounter::default();
    let api = MockApi::start(server(&hits)).await;
    let client = api.client();

    client.login(&login_form()).await.unwrap();
    client.products(&ProductQuery::default()).await.unwrap();
    client.logout().await;

    assert!(!client.has_token().await);
    assert_eq!(client.cache().len().await, 0);
    assert!(matches!(
        client.me().await.unwrap_err(),
        ApiError::Unauthorized(_)
    ));
}

#[tokio::test]
async fn test_session_persists_through_store() {
    let api = MockApi::start(server(&HitCounter::default())).await;
    let client = api.client();
    let storage = Arc::new(MemoryStorage::default());

    let session = client.login(&login_form()).await.unwrap();
    let mut store = Store::load(storage.clone());
    store.dispatch(Action::LoggedIn(session));

    // A second process picks the token up from storage.
    let restored = Store::load(storage);
    let auth: &AuthState = &restored.state().auth;
    assert!(auth.is_logged_in());
    assert!(auth.is_seller());
    assert_eq!(auth.token().unwrap().expose_secret(), TOKEN);

    let fresh = api.client();
    fresh.set_token(auth.token().unwrap()).await;
    assert!(fresh.me().await.is_ok());
}
