use bazaar_core::SellerStats;

use crate::ApiClient;
use crate::cache::{Tag, TagKind};
use crate::endpoint::Query;
use crate::error::ApiError;
use crate::http::ApiRequest;

/// `GET /dashboard/seller-stats`
pub struct SellerDashboard;

impl Query for SellerDashboard {
    const NAME: &'static str = "seller_stats";
    type Args = ();
    type Output = SellerStats;

    fn request((): &()) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::get("/dashboard/seller-stats"))
    }

    fn provides((): &(), _: Option<&SellerStats>) -> Vec<Tag> {
        vec![Tag::list(TagKind::Dashboard)]
    }
}

impl ApiClient {
    /// Headline numbers for the seller dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails or the user is not a seller.
    pub async fn seller_stats(&self) -> Result<SellerStats, ApiError> {
        self.query::<SellerDashboard>(&()).await
    }
}
