//! Shop pages and the seller's own shop.

use bazaar_core::{Paginated, Product, Shop, ShopId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::products::{ProductQuery, product_list_tags};
use crate::cache::{Tag, TagKind};
use crate::endpoint::{Mutation, Query, decode_page};
use crate::error::ApiError;
use crate::http::ApiRequest;
use crate::validation::ShopForm;
use crate::{ApiClient, RawResponse};

fn shop_tags(output: Option<&Shop>) -> Vec<Tag> {
    std::iter::once(Tag::list(TagKind::Shop))
        .chain(output.map(|s| Tag::id(TagKind::Shop, s.id.as_str())))
        .collect()
}

/// `GET /shops/{id}`
pub struct ShopDetail;

impl Query for ShopDetail {
    const NAME: &'static str = "shop";
    type Args = ShopId;
    type Output = Shop;

    fn request(id: &ShopId) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::get(format!("/shops/{id}")))
    }

    fn provides(id: &ShopId, _: Option<&Shop>) -> Vec<Tag> {
        vec![Tag::id(TagKind::Shop, id.as_str())]
    }
}

/// `GET /shops/my-shop`
pub struct MyShop;

impl Query for MyShop {
    const NAME: &'static str = "my_shop";
    type Args = ();
    type Output = Shop;

    fn request((): &()) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::get("/shops/my-shop"))
    }

    fn provides((): &(), output: Option<&Shop>) -> Vec<Tag> {
        shop_tags(output)
    }
}

/// Arguments of a shop's product listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopProductsArgs {
    pub shop: ShopId,
    #[serde(flatten)]
    pub query: ProductQuery,
}

/// `GET /shops/{id}/products`
pub struct ShopProducts;

impl Query for ShopProducts {
    const NAME: &'static str = "shop_products";
    type Args = ShopProductsArgs;
    type Output = Paginated<Product>;

    fn request(args: &ShopProductsArgs) -> Result<ApiRequest, ApiError> {
        Ok(args
            .query
            .apply(ApiRequest::get(format!("/shops/{}/products", args.shop))))
    }

    fn provides(args: &ShopProductsArgs, output: Option<&Paginated<Product>>) -> Vec<Tag> {
        let mut tags = product_list_tags(output);
        tags.push(Tag::id(TagKind::Shop, args.shop.as_str()));
        tags
    }

    fn decode(raw: RawResponse) -> Result<Paginated<Product>, ApiError> {
        decode_page(raw)
    }
}

/// `PATCH /shops/my-shop`, multipart when a logo is attached.
pub struct UpdateShop;

impl Mutation for UpdateShop {
    const NAME: &'static str = "update_shop";
    type Args = ShopForm;
    type Output = Shop;

    fn request(args: &ShopForm) -> Result<ApiRequest, ApiError> {
        let files = args.logo.iter().cloned().collect();
        ApiRequest::patch("/shops/my-shop").json_or_multipart(args, files)
    }

    fn invalidates(_: &ShopForm, output: &Shop) -> Vec<Tag> {
        vec![
            Tag::list(TagKind::Shop),
            Tag::id(TagKind::Shop, output.id.as_str()),
        ]
    }
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the shop does not exist.
    #[instrument(skip(self), fields(shop_id = %id))]
    pub async fn shop(&self, id: &ShopId) -> Result<Shop, ApiError> {
        self.query::<ShopDetail>(id).await
    }

    /// The signed-in seller's shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the user is not a seller.
    pub async fn my_shop(&self) -> Result<Shop, ApiError> {
        self.query::<MyShop>(&()).await
    }

    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    #[instrument(skip(self, query), fields(shop_id = %shop))]
    pub async fn shop_products(
        &self,
        shop: &ShopId,
        query: ProductQuery,
    ) -> Result<Paginated<Product>, ApiError> {
        self.query::<ShopProducts>(&ShopProductsArgs {
            shop: shop.clone(),
            query,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns an error if validation fails or the server rejects the change.
    #[instrument(skip_all)]
    pub async fn update_shop(&self, form: &ShopForm) -> Result<Shop, ApiError> {
        self.mutate::<UpdateShop>(form).await
    }
}
