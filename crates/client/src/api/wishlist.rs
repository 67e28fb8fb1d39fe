//! Wishlist with optimistic add and remove.
//!
//! Both mutations patch the cached wishlist before the request goes out and
//! roll the patch back if the server refuses.

use bazaar_core::{Product, ProductId, WishlistItem, WishlistItemId};
use chrono::Utc;
use tracing::{debug, instrument};

use crate::cache::{Tag, TagKind};
use crate::endpoint::{Ack, Mutation, Query};
use crate::error::ApiError;
use crate::http::ApiRequest;
use crate::validation::{Validate, WishlistForm};
use crate::{ApiClient, RawResponse};

/// `GET /wishlist`
pub struct Wishlist;

impl Query for Wishlist {
    const NAME: &'static str = "wishlist";
    type Args = ();
    type Output = Vec<WishlistItem>;

    fn request((): &()) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::get("/wishlist"))
    }

    fn provides((): &(), output: Option<&Vec<WishlistItem>>) -> Vec<Tag> {
        std::iter::once(Tag::list(TagKind::Wishlist))
            .chain(
                output
                    .into_iter()
                    .flatten()
                    .map(|i| Tag::id(TagKind::Wishlist, i.product.id.as_str())),
            )
            .collect()
    }
}

/// `POST /wishlist`
pub struct AddToWishlist;

impl Mutation for AddToWishlist {
    const NAME: &'static str = "add_to_wishlist";
    type Args = WishlistForm;
    type Output = WishlistItem;

    fn request(args: &WishlistForm) -> Result<ApiRequest, ApiError> {
        ApiRequest::post("/wishlist").json(args)
    }

    fn invalidates(_: &WishlistForm, _: &WishlistItem) -> Vec<Tag> {
        vec![Tag::list(TagKind::Wishlist)]
    }
}

/// `DELETE /wishlist/{product_id}`
pub struct RemoveFromWishlist;

impl Mutation for RemoveFromWishlist {
    const NAME: &'static str = "remove_from_wishlist";
    type Args = ProductId;
    type Output = Ack;

    fn request(product: &ProductId) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::delete(format!("/wishlist/{product}")))
    }

    fn invalidates(product: &ProductId, _: &Ack) -> Vec<Tag> {
        vec![Tag::id(TagKind::Wishlist, product.as_str())]
    }

    fn decode(raw: RawResponse) -> Result<Ack, ApiError> {
        Ok(raw.into())
    }
}

/// Placeholder row shown until the server's copy arrives.
fn optimistic_item(product: &Product) -> WishlistItem {
    WishlistItem {
        id: WishlistItemId::new(format!("pending-{}", product.id)),
        product: product.clone(),
        added_at: Some(Utc::now()),
    }
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn wishlist(&self) -> Result<Vec<WishlistItem>, ApiError> {
        self.query::<Wishlist>(&()).await
    }

    /// Save `product`, showing it in the cached wishlist immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses; the cached wishlist is then
    /// restored.
    #[instrument(skip_all, fields(product_id = %product.id))]
    pub async fn add_to_wishlist(&self, product: &Product) -> Result<WishlistItem, ApiError> {
        let form = WishlistForm {
            product: product.id.clone(),
        };
        form.validate()?;

        let patch = self
            .update_query_data::<Wishlist>(&(), |items| {
                if !items.iter().any(|i| i.product.id == product.id) {
                    items.push(optimistic_item(product));
                }
            })
            .await?;

        match self.mutate::<AddToWishlist>(&form).await {
            Ok(item) => Ok(item),
            Err(err) => {
                if let Some(patch) = patch {
                    debug!("Rolling back optimistic wishlist add");
                    patch.undo().await;
                }
                Err(err)
            }
        }
    }

    /// Remove `product`, hiding it from the cached wishlist immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses; the cached wishlist is then
    /// restored.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn remove_from_wishlist(&self, product: &ProductId) -> Result<Ack, ApiError> {
        product.validate()?;

        let patch = self
            .update_query_data::<Wishlist>(&(), |items| {
                items.retain(|i| &i.product.id != product);
            })
            .await?;

        match self.mutate::<RemoveFromWishlist>(product).await {
            Ok(ack) => Ok(ack),
            Err(err) => {
                if let Some(patch) = patch {
                    debug!("Rolling back optimistic wishlist removal");
                    patch.undo().await;
                }
                Err(err)
            }
        }
    }
}
