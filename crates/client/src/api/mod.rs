//! Bazaar API endpoints, grouped by domain.
//!
//! Each module defines its [`Query`](crate::endpoint::Query) and
//! [`Mutation`](crate::endpoint::Mutation) types plus named methods on
//! [`ApiClient`](crate::ApiClient) that wrap them.

mod auth;
mod categories;
mod chat;
mod coupons;
mod dashboard;
mod orders;
mod products;
mod profile;
mod shops;
mod wishlist;

pub use auth::*;
pub use categories::*;
pub use chat::*;
pub use coupons::*;
pub use dashboard::*;
pub use orders::*;
pub use products::*;
pub use profile::*;
pub use shops::*;
pub use wishlist::*;
