//! Bazaar client - REST client, query cache and client state for the Bazaar
//! multi-vendor storefront.
//!
//! # Architecture
//!
//! - [`ApiClient`] sends requests, unwraps the `{success, message, data, meta}`
//!   envelope and owns the [`QueryCache`](cache::QueryCache).
//! - [`endpoint`] defines [`Query`](endpoint::Query) and
//!   [`Mutation`](endpoint::Mutation); successful mutations invalidate the
//!   tags queries provide, and [`QueryObserver`](endpoint::QueryObserver)s
//!   refetch.
//! - [`api`] holds every endpoint of the storefront and seller dashboard.
//! - [`validation`] checks forms before anything is sent.
//! - [`store`] is the local state: session, cart, chat, filters, toasts.
//!
//! # Example
//!
//! ```rust,no_run
//! use bazaar_client::{ApiClient, ClientConfig};
//! use bazaar_client::api::ProductQuery;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new(&ClientConfig::from_env()?)?;
//! let page = client.products(&ProductQuery::default()).await?;
//! println!("{} products", page.meta.total);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cache;
mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod store;
pub mod validation;

pub use client::{ApiClient, RawResponse};
pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
