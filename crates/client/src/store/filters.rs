//! Catalogue filter state.

use std::collections::BTreeSet;

use bazaar_core::CategoryId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::{DEFAULT_PAGE_SIZE, ProductQuery, ProductSort};

/// What the catalogue page is currently filtered by.
///
/// Changing any filter returns to the first page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub search: String,
    pub categories: BTreeSet<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: ProductSort,
    pub page: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            search: String::new(),
            categories: BTreeSet::new(),
            min_price: None,
            max_price: None,
            sort: ProductSort::default(),
            page: 1,
        }
    }
}

impl ProductFilter {
    pub fn toggle_category(&mut self, category: CategoryId) {
        if !self.categories.remove(&category) {
            self.categories.insert(category);
        }
        self.page = 1;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.page = 1;
    }

    /// Set the price range, swapping the bounds if they arrive reversed.
    pub fn set_price_range(&mut self, min: Option<Decimal>, max: Option<Decimal>) {
        let (min, max) = match (min, max) {
            (Some(lo), Some(hi)) if lo > hi => (Some(hi), Some(lo)),
            other => other,
        };
        self.min_price = min;
        self.max_price = max;
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: ProductSort) {
        self.sort = sort;
        self.page = 1;
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        *self != Self {
            page: self.page,
            ..Self::default()
        }
    }

    /// The listing request these filters describe.
    #[must_use]
    pub fn to_query(&self) -> ProductQuery {
        let search = self.search.trim();
        ProductQuery {
            page: self.page,
            limit: DEFAULT_PAGE_SIZE,
            search_term: (!search.is_empty()).then(|| search.to_owned()),
            categories: self.categories.iter().cloned().collect(),
            min_price: self.min_price,
            max_price: self.max_price,
            sort: self.sort,
        }
    }
}
