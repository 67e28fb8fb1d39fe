use bazaar_core::Category;

use crate::ApiClient;
use crate::cache::{Tag, TagKind};
use crate::endpoint::Query;
use crate::error::ApiError;
use crate::http::ApiRequest;

/// `GET /categories`
pub struct Categories;

impl Query for Categories {
    const NAME: &'static str = "categories";
    type Args = ();
    type Output = Vec<Category>;

    fn request((): &()) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::get("/categories"))
    }

    fn provides((): &(), output: Option<&Vec<Category>>) -> Vec<Tag> {
        std::iter::once(Tag::list(TagKind::Category))
            .chain(
                output
                    .into_iter()
                    .flatten()
                    .map(|c| Tag::id(TagKind::Category, c.id.as_str())),
            )
            .collect()
    }
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        self.query::<Categories>(&()).await
    }
}
