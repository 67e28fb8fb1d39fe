//! The signed-in user's profile.

use bazaar_core::User;
use tracing::instrument;

use crate::ApiClient;
use crate::cache::{Tag, TagKind};
use crate::endpoint::{Mutation, Query};
use crate::error::ApiError;
use crate::http::ApiRequest;
use crate::validation::ProfileForm;

/// `GET /users/me`
pub struct Me;

impl Query for Me {
    const NAME: &'static str = "me";
    type Args = ();
    type Output = User;

    fn request((): &()) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::get("/users/me"))
    }

    fn provides((): &(), _: Option<&User>) -> Vec<Tag> {
        vec![Tag::list(TagKind::Profile)]
    }
}

/// `PATCH /users/me`, multipart when an avatar is attached.
pub struct UpdateProfile;

impl Mutation for UpdateProfile {
    const NAME: &'static str = "update_profile";
    type Args = ProfileForm;
    type Output = User;

    fn request(args: &ProfileForm) -> Result<ApiRequest, ApiError> {
        let files = args.avatar.iter().cloned().collect();
        ApiRequest::patch("/users/me").json_or_multipart(args, files)
    }

    fn invalidates(_: &ProfileForm, _: &User) -> Vec<Tag> {
        vec![Tag::list(TagKind::Profile)]
    }
}

impl ApiClient {
    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` when signed out.
    pub async fn me(&self) -> Result<User, ApiError> {
        self.query::<Me>(&()).await
    }

    /// # Errors
    ///
    /// Returns an error if validation fails or the update is rejected.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, form: &ProfileForm) -> Result<User, ApiError> {
        self.mutate::<UpdateProfile>(form).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::http::{FilePart, RequestBody};

    #[test]
    fn test_update_profile_with_avatar_is_multipart() {
        let form = ProfileForm {
            name: "Rumi".to_string(),
            avatar: Some(FilePart::new("avatar", "me.png", "image/png", vec![1])),
            ..ProfileForm::default()
        };
        let request = UpdateProfile::request(&form).unwrap();
        match request.body {
            RequestBody::Multipart(payload) => {
                assert_eq!(payload.file_parts()[0].field, "avatar");
                assert!(payload.field("data").unwrap().contains("Rumi"));
            }
            other => panic!("expected multipart body, got {other:?}"),
        }
    }
}
