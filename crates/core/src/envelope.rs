//! Response envelope shared by every API endpoint.
//!
//! Successful responses look like:
//!
//! ```json
//! { "success": true, "message": "Products retrieved", "data": [...],
//!   "meta": { "total": 42, "page": 1, "limit": 10, "totalPage": 5 } }
//! ```
//!
//! Failures carry a message and optional per-field messages:
//!
//! ```json
//! { "success": false, "message": "Validation Error",
//!   "errorMessages": [{ "path": "email", "message": "Email is required" }] }
//! ```

use serde::{Deserialize, Serialize};

/// Successful response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

const fn default_true() -> bool {
    true
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Total number of items across all pages.
    #[serde(default)]
    pub total: u64,
    /// Current page (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Page size.
    #[serde(default)]
    pub limit: u32,
    /// Number of pages.
    #[serde(default)]
    pub total_page: u32,
}

const fn default_page() -> u32 {
    1
}

impl PageMeta {
    /// Whether another page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_page
    }

    /// Whether a page precedes this one.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    /// Build a page from items, synthesising metadata when the server
    /// omitted it.
    #[must_use]
    pub fn new(items: Vec<T>, meta: Option<PageMeta>) -> Self {
        let meta = meta.unwrap_or_else(|| {
            let count = u32::try_from(items.len()).unwrap_or(u32::MAX);
            PageMeta {
                total: u64::from(count),
                page: 1,
                limit: count,
                total_page: 1,
            }
        });
        Self { items, meta }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_messages: Vec<FieldMessage>,
}

/// A server-reported message tied to an input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMessage {
    #[serde(default)]
    pub path: String,
    pub message: String,
}
