//! Sign-in, registration and password flows.

use bazaar_core::AuthSession;
use secrecy::SecretString;
use tracing::{info, instrument};

use crate::cache::{Tag, TagKind};
use crate::endpoint::{Ack, Mutation};
use crate::error::ApiError;
use crate::http::ApiRequest;
use crate::validation::{
    ChangePasswordForm, ForgotPasswordForm, LoginForm, RegisterForm, SellerRegisterForm,
};
use crate::{ApiClient, RawResponse};

/// `POST /auth/login`
pub struct Login;

impl Mutation for Login {
    const NAME: &'static str = "login";
    type Args = LoginForm;
    type Output = AuthSession;

    fn request(args: &LoginForm) -> Result<ApiRequest, ApiError> {
        ApiRequest::post("/auth/login").json(args)
    }

    // The session token must be in place before Profile refetches, so the
    // named method invalidates after storing it.
    fn invalidates(_: &LoginForm, _: &AuthSession) -> Vec<Tag> {
        Vec::new()
    }
}

/// `POST /auth/register`
pub struct Register;

impl Mutation for Register {
    const NAME: &'static str = "register";
    type Args = RegisterForm;
    type Output = AuthSession;

    fn request(args: &RegisterForm) -> Result<ApiRequest, ApiError> {
        ApiRequest::post("/auth/register").json(args)
    }

    fn invalidates(_: &RegisterForm, _: &AuthSession) -> Vec<Tag> {
        Vec::new()
    }
}

/// `POST /auth/register-seller`
pub struct RegisterSeller;

impl Mutation for RegisterSeller {
    const NAME: &'static str = "register_seller";
    type Args = SellerRegisterForm;
    type Output = AuthSession;

    fn request(args: &SellerRegisterForm) -> Result<ApiRequest, ApiError> {
        ApiRequest::post("/auth/register-seller").json(args)
    }

    fn invalidates(_: &SellerRegisterForm, _: &AuthSession) -> Vec<Tag> {
        Vec::new()
    }
}

/// `POST /auth/change-password`
pub struct ChangePassword;

impl Mutation for ChangePassword {
    const NAME: &'static str = "change_password";
    type Args = ChangePasswordForm;
    type Output = Ack;

    fn request(args: &ChangePasswordForm) -> Result<ApiRequest, ApiError> {
        ApiRequest::post("/auth/change-password").json(args)
    }

    fn invalidates(_: &ChangePasswordForm, _: &Ack) -> Vec<Tag> {
        Vec::new()
    }

    fn decode(raw: RawResponse) -> Result<Ack, ApiError> {
        Ok(raw.into())
    }
}

/// `POST /auth/forgot-password`
pub struct ForgotPassword;

impl Mutation for ForgotPassword {
    const NAME: &'static str = "forgot_password";
    type Args = ForgotPasswordForm;
    type Output = Ack;

    fn request(args: &ForgotPasswordForm) -> Result<ApiRequest, ApiError> {
        ApiRequest::post("/auth/forgot-password").json(args)
    }

    fn invalidates(_: &ForgotPasswordForm, _: &Ack) -> Vec<Tag> {
        Vec::new()
    }

    fn decode(raw: RawResponse) -> Result<Ack, ApiError> {
        Ok(raw.into())
    }
}

impl ApiClient {
    /// Sign in and start using the returned token.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the credentials are rejected.
    #[instrument(skip_all)]
    pub async fn login(&self, form: &LoginForm) -> Result<AuthSession, ApiError> {
        let session = self.mutate::<Login>(form).await?;
        self.start_session(&session).await;
        Ok(session)
    }

    /// Create a customer account and sign in.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the server rejects the account.
    #[instrument(skip_all)]
    pub async fn register(&self, form: &RegisterForm) -> Result<AuthSession, ApiError> {
        let session = self.mutate::<Register>(form).await?;
        self.start_session(&session).await;
        Ok(session)
    }

    /// Create a seller account with its shop and sign in.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the server rejects the account.
    #[instrument(skip_all)]
    pub async fn register_seller(
        &self,
        form: &SellerRegisterForm,
    ) -> Result<AuthSession, ApiError> {
        let session = self.mutate::<RegisterSeller>(form).await?;
        self.start_session(&session).await;
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns an error if validation fails or the old password is wrong.
    pub async fn change_password(&self, form: &ChangePasswordForm) -> Result<Ack, ApiError> {
        self.mutate::<ChangePassword>(form).await
    }

    /// Ask the server to email a reset link.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the request is rejected.
    pub async fn forgot_password(&self, form: &ForgotPasswordForm) -> Result<Ack, ApiError> {
        self.mutate::<ForgotPassword>(form).await
    }

    /// Forget the token and every cached result. Local only.
    pub async fn logout(&self) {
        self.clear_token().await;
        self.cache().clear().await;
        self.cache()
            .invalidate_tags(&[Tag::list(TagKind::Profile)])
            .await;
        info!("Signed out");
    }

    async fn start_session(&self, session: &AuthSession) {
        self.set_token(SecretString::from(session.access_token.clone()))
            .await;
        // Anything cached belongs to whoever was signed in before.
        self.cache().clear().await;
        self.cache()
            .invalidate_tags(&[Tag::list(TagKind::Profile)])
            .await;
        info!(user_id = %session.user.id, role = ?session.user.role, "Signed in");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::http::RequestBody;

    #[test]
    fn test_login_request() {
        let form = LoginForm {
            email: "buyer@example.com".to_string(),
            password: "secret1".to_string(),
        };
        let request = Login::request(&form).unwrap();
        assert_eq!(request.path, "/auth/login");
        match request.body {
            RequestBody::Json(body) => {
                assert_eq!(body["email"], "buyer@example.com");
                assert_eq!(body["password"], "secret1");
            }
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[test]
    fn test_register_omits_confirmation() {
        let form = RegisterForm {
            name: "Rumi".to_string(),
            email: "rumi@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        };
        let request = Register::request(&form).unwrap();
        match request.body {
            RequestBody::Json(body) => assert!(body.get("confirmPassword").is_none()),
            other => panic!("expected JSON body, got {other:?}"),
        }
    }
}
