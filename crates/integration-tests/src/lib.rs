//! Integration tests for the Bazaar client.
//!
//! Each test builds an axum router that stands in for the REST API, serves
//! it on an ephemeral port with [`MockApi::start`], and drives a real
//! [`ApiClient`] against it.
//!
//! ```rust,ignore
//! let hits = HitCounter::default();
//! let router = Router::new().route("/categories", get({
//!     let hits = hits.clone();
//!     move || async move {
//!         hits.hit();
//!         ok(json!([{ "_id": "c1", "name": "Apparel" }]))
//!     }
//! }));
//! let api = MockApi::start(router).await;
//! api.client().categories().await.unwrap();
//! assert_eq!(hits.count(), 1);
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use bazaar_client::{ApiClient, ClientConfig};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// A mock API served on `127.0.0.1` for the lifetime of the value.
pub struct MockApi {
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl MockApi {
    /// Serve `router` under `/api/v1` on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock API listener");
        let addr = listener.local_addr().expect("mock API address");
        let app = Router::new().nest("/api/v1", router);

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, server }
    }

    /// Base URL the client should use.
    ///
    /// # Panics
    ///
    /// Panics if the socket address does not form a URL.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/api/v1", self.addr)).expect("mock API URL")
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.url());
        config.timeout = Some(Duration::from_secs(5));
        config
    }

    /// A fresh client with an empty cache.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.config()).expect("build API client")
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Counts requests reaching a handler.
#[derive(Debug, Clone, Default)]
pub struct HitCounter(Arc<AtomicUsize>);

impl HitCounter {
    /// Record a request and return how many came before it.
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Response bodies
// =============================================================================

/// A successful envelope around `data`.
pub fn ok(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "message": "OK", "data": data }))
}

/// A successful envelope around one page of `items`.
pub fn page(items: &[Value], page: u32, limit: u32) -> Json<Value> {
    let total = items.len() as u64;
    let total_page = u32::try_from(total.div_ceil(u64::from(limit.max(1)))).unwrap_or(u32::MAX);
    Json(json!({
        "success": true,
        "message": "OK",
        "data": items,
        "meta": { "total": total, "page": page, "limit": limit, "totalPage": total_page },
    }))
}

/// An error body with optional per-field messages.
pub fn fail(status: StatusCode, message: &str, fields: &[(&str, &str)]) -> Response {
    let error_messages: Vec<Value> = fields
        .iter()
        .map(|(path, message)| json!({ "path": path, "message": message }))
        .collect();
    (
        status,
        Json(json!({
            "success": false,
            "message": message,
            "errorMessages": error_messages,
        })),
    )
        .into_response()
}

// =============================================================================
// Fixtures
// =============================================================================

#[must_use]
pub fn product(id: &str, name: &str, price: u32, stock: u32) -> Value {
    json!({
        "_id": id,
        "name": name,
        "price": price,
        "stock": stock,
        "images": [],
        "category": { "_id": "c1", "name": "Apparel" },
        "shop": "s1",
        "variants": [],
    })
}

#[must_use]
pub fn user(id: &str, email: &str, role: &str) -> Value {
    json!({ "_id": id, "name": "Dana", "email": email, "role": role })
}

#[must_use]
pub fn wishlist_item(id: &str, product: Value) -> Value {
    json!({ "_id": id, "product": product })
}
