//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types exchanged with the Bazaar REST API:
//! - `client` - API client, query cache and client-side state store
//! - `cli` - Command-line storefront driven by the client
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! The server owns every entity; these types only coerce shapes for display.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices and statuses
//! - [`entities`] - Users, shops, products, orders, coupons, chats, wishlist
//! - [`envelope`] - The `{success, message, data, meta}` response wrapper

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod entities;
pub mod envelope;
pub mod types;

pub use entities::*;
pub use envelope::*;
pub use types::*;
