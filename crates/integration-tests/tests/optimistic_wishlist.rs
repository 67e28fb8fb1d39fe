//! Optimistic wishlist updates and their rollback.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use bazaar_client::ApiError;
use bazaar_client::api::Wishlist;
use bazaar_core::{Product, ProductId};
use bazaar_integration_tests::{HitCounter, MockApi, fail, ok, product, wishlist_item};
use serde_json::json;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};

/// `GET /wishlist` always lists p1. Writes wait for `release`, then succeed
/// only if `accept_writes` is set.
fn server(list_hits: &HitCounter, release: &Arc<Notify>, accept_writes: bool) -> Router {
    let hits = list_hits.clone();
    let on_add = Arc::clone(release);
    let on_remove = Arc::clone(release);

    Router::new()
        .route(
            "/wishlist",
            get(move || async move {
                hits.hit();
                ok(json!([wishlist_item("w1", product("p1", "Linen Shirt", 40, 3))]))
            })
            .post(move || async move {
                on_add.notified().await;
                if accept_writes {
                    ok(wishlist_item("w2", product("p2", "Canvas Tote", 20, 1))).into_response()
                } else {
                    fail(StatusCode::INTERNAL_SERVER_ERROR, "Wishlist unavailable", &[])
                }
            }),
        )
        .route(
            "/wishlist/{product}",
            delete(move || async move {
                on_remove.notified().await;
                if accept_writes {
                    ok(json!(null)).into_response()
                } else {
                    fail(StatusCode::CONFLICT, "Could not remove item", &[])
                }
            }),
        )
}

fn tote() -> Product {
    serde_json::from_value(product("p2", "Canvas Tote", 20, 1)).unwrap()
}

fn ids(items: &[bazaar_core::WishlistItem]) -> Vec<&str> {
    items.iter().map(|i| i.product.id.as_str()).collect()
}

#[tokio::test]
async fn test_failed_add_rolls_back() {
    let hits = HitCounter::default();
    let release = Arc::new(Notify::new());
    let api = MockApi::start(server(&hits, &release, false)).await;
    let client = api.client();
    client.wishlist().await.unwrap();

    let adding = tokio::spawn({
        let client = client.clone();
        async move { client.add_to_wishlist(&tote()).await }
    });

    // The cached list shows the product before the server answers.
    let optimistic = timeout(Duration::from_secs(5), async {
        loop {
            let items = client.wishlist().await.unwrap();
            if items.len() == 2 {
                return items;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(ids(&optimistic), ["p1", "p2"]);
    assert_eq!(optimistic[1].id.as_str(), "pending-p2");

    release.notify_one();
    let err = adding.await.unwrap().unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 500, .. }));
    assert_eq!(err.toast_message(), "Wishlist unavailable");

    let restored = client.wishlist().await.unwrap();
    assert_eq!(ids(&restored), ["p1"]);
    assert_eq!(hits.count(), 1, "rollback restores the cache without refetching");
}

#[tokio::test]
async fn test_observer_sees_optimistic_add_and_rollback() {
    let hits = HitCounter::default();
    let release = Arc::new(Notify::new());
    let api = MockApi::start(server(&hits, &release, false)).await;
    let client = api.client();
    let mut observer = client.watch::<Wishlist>(());
    let wait = Duration::from_secs(5);

    let loaded = timeout(wait, observer.wait_for(|s| s.data.is_some()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ids(loaded.data.as_deref().unwrap()), ["p1"]);

    let adding = tokio::spawn({
        let client = client.clone();
        async move { client.add_to_wishlist(&tote()).await }
    });

    let pending = timeout(
        wait,
        observer.wait_for(|s| s.data.as_ref().is_some_and(|items| items.len() == 2)),
    )
    .await
    .unwrap()
    .unwrap();
    let items = pending.data.unwrap();
    assert_eq!(items[1].id.as_str(), "pending-p2");
    assert!(!pending.is_fetching);

    release.notify_one();
    adding.await.unwrap().unwrap_err();

    let restored = timeout(
        wait,
        observer.wait_for(|s| s.data.as_ref().is_some_and(|items| items.len() == 1)),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(ids(restored.data.as_deref().unwrap()), ["p1"]);
    assert_eq!(hits.count(), 1);
}

#[tokio::test]
async fn test_failed_remove_rolls_back() {
    let hits = HitCounter::default();
    let release = Arc::new(Notify::new());
    release.notify_one();
    let api = MockApi::start(server(&hits, &release, false)).await;
    let client = api.client();
    client.wishlist().await.unwrap();

    let err = client
        .remove_from_wishlist(&ProductId::new("p1"))
        .await
        .unwrap_err();
    assert_eq!(err.toast_message(), "Could not remove item");

    assert_eq!(ids(&client.wishlist().await.unwrap()), ["p1"]);
    assert_eq!(hits.count(), 1);
}

#[tokio::test]
async fn test_successful_add_refetches_list() {
    let hits = HitCounter::default();
    let release = Arc::new(Notify::new());
    release.notify_one();
    let api = MockApi::start(server(&hits, &release, true)).await;
    let client = api.client();
    client.wishlist().await.unwrap();

    let item = client.add_to_wishlist(&tote()).await.unwrap();
    assert_eq!(item.id.as_str(), "w2");

    client.wishlist().await.unwrap();
    assert_eq!(hits.count(), 2);
}

#[tokio::test]
async fn test_add_without_cached_list_still_sends() {
    let hits = HitCounter::default();
    let release = Arc::new(Notify::new());
    release.notify_one();
    let api = MockApi::start(server(&hits, &release, true)).await;

    let item = api.client().add_to_wishlist(&tote()).await.unwrap();

    assert_eq!(item.product.id.as_str(), "p2");
    assert_eq!(hits.count(), 0);
}
