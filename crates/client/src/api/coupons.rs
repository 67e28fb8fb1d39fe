//! Seller coupons and applying a coupon at checkout.

use bazaar_core::{Coupon, CouponApplication, CouponId};
use tracing::instrument;

use crate::cache::{Tag, TagKind};
use crate::endpoint::{Ack, Mutation, Query};
use crate::error::ApiError;
use crate::http::ApiRequest;
use crate::validation::{ApplyCouponForm, CouponForm, ForId};
use crate::{ApiClient, RawResponse};

/// `GET /coupons`
pub struct MyCoupons;

impl Query for MyCoupons {
    const NAME: &'static str = "my_coupons";
    type Args = ();
    type Output = Vec<Coupon>;

    fn request((): &()) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::get("/coupons"))
    }

    fn provides((): &(), output: Option<&Vec<Coupon>>) -> Vec<Tag> {
        std::iter::once(Tag::list(TagKind::Coupon))
            .chain(
                output
                    .into_iter()
                    .flatten()
                    .map(|c| Tag::id(TagKind::Coupon, c.id.as_str())),
            )
            .collect()
    }
}

/// `POST /coupons`
pub struct CreateCoupon;

impl Mutation for CreateCoupon {
    const NAME: &'static str = "create_coupon";
    type Args = CouponForm;
    type Output = Coupon;

    fn request(args: &CouponForm) -> Result<ApiRequest, ApiError> {
        ApiRequest::post("/coupons").json(args)
    }

    fn invalidates(_: &CouponForm, _: &Coupon) -> Vec<Tag> {
        vec![Tag::list(TagKind::Coupon)]
    }
}

/// `PATCH /coupons/{id}`
pub struct UpdateCoupon;

impl Mutation for UpdateCoupon {
    const NAME: &'static str = "update_coupon";
    type Args = ForId<CouponId, CouponForm>;
    type Output = Coupon;

    fn request(args: &Self::Args) -> Result<ApiRequest, ApiError> {
        ApiRequest::patch(format!("/coupons/{}", args.id)).json(&args.body)
    }

    fn invalidates(args: &Self::Args, _: &Coupon) -> Vec<Tag> {
        vec![Tag::id(TagKind::Coupon, args.id.as_str())]
    }
}

/// `DELETE /coupons/{id}`
pub struct DeleteCoupon;

impl Mutation for DeleteCoupon {
    const NAME: &'static str = "delete_coupon";
    type Args = CouponId;
    type Output = Ack;

    fn request(id: &CouponId) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::delete(format!("/coupons/{id}")))
    }

    fn invalidates(id: &CouponId, _: &Ack) -> Vec<Tag> {
        vec![Tag::id(TagKind::Coupon, id.as_str())]
    }

    fn decode(raw: RawResponse) -> Result<Ack, ApiError> {
        Ok(raw.into())
    }
}

/// `POST /coupons/apply`. Prices a cart; changes nothing cached.
pub struct ApplyCoupon;

impl Mutation for ApplyCoupon {
    const NAME: &'static str = "apply_coupon";
    type Args = ApplyCouponForm;
    type Output = CouponApplication;

    fn request(args: &ApplyCouponForm) -> Result<ApiRequest, ApiError> {
        ApiRequest::post("/coupons/apply").json(args)
    }

    fn invalidates(_: &ApplyCouponForm, _: &CouponApplication) -> Vec<Tag> {
        Vec::new()
    }
}

impl ApiClient {
    /// Coupons of the seller's shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn my_coupons(&self) -> Result<Vec<Coupon>, ApiError> {
        self.query::<MyCoupons>(&()).await
    }

    /// # Errors
    ///
    /// Returns an error if validation fails or the code is taken.
    #[instrument(skip_all, fields(code = %form.code))]
    pub async fn create_coupon(&self, form: &CouponForm) -> Result<Coupon, ApiError> {
        self.mutate::<CreateCoupon>(form).await
    }

    /// # Errors
    ///
    /// Returns an error if validation fails or the server rejects the change.
    #[instrument(skip(self, form), fields(coupon_id = %id))]
    pub async fn update_coupon(&self, id: &CouponId, form: CouponForm) -> Result<Coupon, ApiError> {
        self.mutate::<UpdateCoupon>(&ForId::new(id.clone(), form))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the server refuses the delete.
    #[instrument(skip(self), fields(coupon_id = %id))]
    pub async fn delete_coupon(&self, id: &CouponId) -> Result<Ack, ApiError> {
        self.mutate::<DeleteCoupon>(id).await
    }

    /// Price a subtotal with a coupon code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is malformed, unknown or expired.
    #[instrument(skip_all, fields(code = %form.code))]
    pub async fn apply_coupon(&self, form: &ApplyCouponForm) -> Result<CouponApplication, ApiError> {
        self.mutate::<ApplyCoupon>(form).await
    }
}
