//! Product catalogue and seller product management.

use bazaar_core::{CategoryId, Paginated, Product, ProductId, Variant, VariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cache::{Tag, TagKind};
use crate::endpoint::{Ack, Mutation, Query, decode_page};
use crate::error::ApiError;
use crate::http::ApiRequest;
use crate::validation::{ForId, ProductForm, VariantForm};
use crate::{ApiClient, RawResponse};

pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Sort orders the catalogue supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceLowToHigh,
    PriceHighToLow,
    TopRated,
}

impl ProductSort {
    /// `(sortBy, sortOrder)` query values.
    #[must_use]
    pub const fn as_params(self) -> (&'static str, &'static str) {
        match self {
            Self::Newest => ("createdAt", "desc"),
            Self::PriceLowToHigh => ("price", "asc"),
            Self::PriceHighToLow => ("price", "desc"),
            Self::TopRated => ("rating", "desc"),
        }
    }
}

impl std::str::FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "newest" => Ok(Self::Newest),
            "price_asc" | "price_low_to_high" => Ok(Self::PriceLowToHigh),
            "price_desc" | "price_high_to_low" => Ok(Self::PriceHighToLow),
            "rating" | "top_rated" => Ok(Self::TopRated),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Catalogue listing parameters. Also the cache key of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub page: u32,
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub sort: ProductSort,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            search_term: None,
            categories: Vec::new(),
            min_price: None,
            max_price: None,
            sort: ProductSort::default(),
        }
    }
}

impl ProductQuery {
    /// Apply these parameters to a listing request.
    #[must_use]
    pub fn apply(&self, request: ApiRequest) -> ApiRequest {
        let (sort_by, sort_order) = self.sort.as_params();
        let categories = (!self.categories.is_empty()).then(|| {
            self.categories
                .iter()
                .map(CategoryId::as_str)
                .collect::<Vec<_>>()
                .join(",")
        });

        request
            .query("page", self.page.max(1))
            .query("limit", self.limit)
            .query_opt(
                "searchTerm",
                self.search_term.as_deref().map(str::trim).filter(|s| !s.is_empty()),
            )
            .query_opt("category", categories)
            .query_opt("minPrice", self.min_price)
            .query_opt("maxPrice", self.max_price)
            .query("sortBy", sort_by)
            .query("sortOrder", sort_order)
    }
}

pub(crate) fn product_list_tags(output: Option<&Paginated<Product>>) -> Vec<Tag> {
    std::iter::once(Tag::list(TagKind::Product))
        .chain(
            output
                .into_iter()
                .flat_map(|page| &page.items)
                .map(|p| Tag::id(TagKind::Product, p.id.as_str())),
        )
        .collect()
}

fn product_changed(id: &ProductId) -> Vec<Tag> {
    vec![
        Tag::id(TagKind::Product, id.as_str()),
        Tag::list(TagKind::Dashboard),
    ]
}

// =============================================================================
// Queries
// =============================================================================

/// `GET /products`
pub struct Products;

impl Query for Products {
    const NAME: &'static str = "products";
    type Args = ProductQuery;
    type Output = Paginated<Product>;

    fn request(args: &ProductQuery) -> Result<ApiRequest, ApiError> {
        Ok(args.apply(ApiRequest::get("/products")))
    }

    fn provides(_: &ProductQuery, output: Option<&Paginated<Product>>) -> Vec<Tag> {
        product_list_tags(output)
    }

    fn decode(raw: RawResponse) -> Result<Paginated<Product>, ApiError> {
        decode_page(raw)
    }
}

/// `GET /products/{id}`
pub struct ProductDetail;

impl Query for ProductDetail {
    const NAME: &'static str = "product";
    type Args = ProductId;
    type Output = Product;

    fn request(id: &ProductId) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::get(format!("/products/{id}")))
    }

    fn provides(id: &ProductId, _: Option<&Product>) -> Vec<Tag> {
        vec![Tag::id(TagKind::Product, id.as_str())]
    }
}

// =============================================================================
// Mutations
// =============================================================================

/// `POST /products`, multipart when images are attached.
pub struct CreateProduct;

impl Mutation for CreateProduct {
    const NAME: &'static str = "create_product";
    type Args = ProductForm;
    type Output = Product;

    fn request(args: &ProductForm) -> Result<ApiRequest, ApiError> {
        ApiRequest::post("/products").json_or_multipart(args, args.images.clone())
    }

    fn invalidates(_: &ProductForm, _: &Product) -> Vec<Tag> {
        vec![Tag::list(TagKind::Product), Tag::list(TagKind::Dashboard)]
    }
}

/// `PATCH /products/{id}`
pub struct UpdateProduct;

impl Mutation for UpdateProduct {
    const NAME: &'static str = "update_product";
    type Args = ForId<ProductId, ProductForm>;
    type Output = Product;

    fn request(args: &Self::Args) -> Result<ApiRequest, ApiError> {
        ApiRequest::patch(format!("/products/{}", args.id))
            .json_or_multipart(&args.body, args.body.images.clone())
    }

    fn invalidates(args: &Self::Args, _: &Product) -> Vec<Tag> {
        product_changed(&args.id)
    }
}

/// `DELETE /products/{id}`
pub struct DeleteProduct;

impl Mutation for DeleteProduct {
    const NAME: &'static str = "delete_product";
    type Args = ProductId;
    type Output = Ack;

    fn request(id: &ProductId) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::delete(format!("/products/{id}")))
    }

    fn invalidates(id: &ProductId, _: &Ack) -> Vec<Tag> {
        product_changed(id)
    }

    fn decode(raw: RawResponse) -> Result<Ack, ApiError> {
        Ok(raw.into())
    }
}

/// `POST /products/{id}/variants`
pub struct AddVariant;

impl Mutation for AddVariant {
    const NAME: &'static str = "add_variant";
    type Args = ForId<ProductId, VariantForm>;
    type Output = Variant;

    fn request(args: &Self::Args) -> Result<ApiRequest, ApiError> {
        ApiRequest::post(format!("/products/{}/variants", args.id)).json(&args.body)
    }

    fn invalidates(args: &Self::Args, _: &Variant) -> Vec<Tag> {
        vec![Tag::id(TagKind::Product, args.id.as_str())]
    }
}

/// `DELETE /variants/{id}`, scoped to its product for invalidation.
pub struct DeleteVariant;

impl Mutation for DeleteVariant {
    const NAME: &'static str = "delete_variant";
    type Args = ForId<ProductId, VariantId>;
    type Output = Ack;

    fn request(args: &Self::Args) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::delete(format!("/variants/{}", args.body)))
    }

    fn invalidates(args: &Self::Args, _: &Ack) -> Vec<Tag> {
        vec![Tag::id(TagKind::Product, args.id.as_str())]
    }

    fn decode(raw: RawResponse) -> Result<Ack, ApiError> {
        Ok(raw.into())
    }
}

impl ApiClient {
    /// One page of the catalogue.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Paginated<Product>, ApiError> {
        self.query::<Products>(query).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.query::<ProductDetail>(id).await
    }

    /// # Errors
    ///
    /// Returns an error if validation fails or the server rejects the product.
    #[instrument(skip_all)]
    pub async fn create_product(&self, form: &ProductForm) -> Result<Product, ApiError> {
        self.mutate::<CreateProduct>(form).await
    }

    /// # Errors
    ///
    /// Returns an error if validation fails or the server rejects the change.
    #[instrument(skip(self, form), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        form: ProductForm,
    ) -> Result<Product, ApiError> {
        self.mutate::<UpdateProduct>(&ForId::new(id.clone(), form))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the server refuses the delete.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<Ack, ApiError> {
        self.mutate::<DeleteProduct>(id).await
    }

    /// # Errors
    ///
    /// Returns an error if validation fails or the server rejects the variant.
    #[instrument(skip(self, form), fields(product_id = %product))]
    pub async fn add_variant(
        &self,
        product: &ProductId,
        form: VariantForm,
    ) -> Result<Variant, ApiError> {
        self.mutate::<AddVariant>(&ForId::new(product.clone(), form))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the server refuses the delete.
    #[instrument(skip(self))]
    pub async fn delete_variant(
        &self,
        product: &ProductId,
        variant: &VariantId,
    ) -> Result<Ack, ApiError> {
        self.mutate::<DeleteVariant>(&ForId::new(product.clone(), variant.clone()))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params(query: &ProductQuery) -> Vec<(String, String)> {
        Products::request(query).unwrap().query
    }

    #[test]
    fn test_default_query_params() {
        let params = params(&ProductQuery::default());
        assert!(params.contains(&("page".to_string(), "1".to_string())));
        assert!(params.contains(&("limit".to_string(), "12".to_string())));
        assert!(params.contains(&("sortBy".to_string(), "createdAt".to_string())));
        assert!(!params.iter().any(|(k, _)| k == "searchTerm"));
    }

    #[test]
    fn test_filters_become_params() {
        let query = ProductQuery {
            search_term: Some("  lamp ".to_string()),
            categories: vec![CategoryId::new("c1"), CategoryId::new("c2")],
            min_price: Some(Decimal::from(10)),
            sort: ProductSort::PriceHighToLow,
            ..ProductQuery::default()
        };
        let params = params(&query);
        assert!(params.contains(&("searchTerm".to_string(), "lamp".to_string())));
        assert!(params.contains(&("category".to_string(), "c1,c2".to_string())));
        assert!(params.contains(&("minPrice".to_string(), "10".to_string())));
        assert!(params.contains(&("sortOrder".to_string(), "desc".to_string())));
    }

    #[test]
    fn test_blank_search_is_dropped() {
        let query = ProductQuery {
            search_term: Some("   ".to_string()),
            ..ProductQuery::default()
        };
        assert!(!params(&query).iter().any(|(k, _)| k == "searchTerm"));
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("price-asc".parse::<ProductSort>(), Ok(ProductSort::PriceLowToHigh));
        assert_eq!("TOP_RATED".parse::<ProductSort>(), Ok(ProductSort::TopRated));
        assert!("cheapest".parse::<ProductSort>().is_err());
    }

    #[test]
    fn test_delete_variant_targets_variant_route() {
        let args = ForId::new(ProductId::new("p1"), VariantId::new("v9"));
        let request = DeleteVariant::request(&args).unwrap();
        assert_eq!(request.path, "/variants/v9");
        assert_eq!(
            DeleteVariant::invalidates(&args, &Ack::default()),
            vec![Tag::id(TagKind::Product, "p1")]
        );
    }
}
