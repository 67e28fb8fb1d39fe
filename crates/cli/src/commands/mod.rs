//! Command implementations.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod chat;
pub mod coupons;
pub mod orders;
pub mod render;
pub mod wishlist;

use std::sync::Arc;

use bazaar_client::store::{Action, FileStorage, Store, Toast};
use bazaar_client::{ApiClient, ApiError, ClientConfig};
use thiserror::Error;

pub use cart::{CartAction, CheckoutArgs};
pub use catalog::ProductsAction;
pub use chat::ChatAction;
pub use coupons::CouponAction;
pub use orders::OrdersAction;
pub use wishlist::WishlistAction;

/// Errors a command can end with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Bad command-line input the parser could not catch.
    #[error("{0}")]
    Usage(String),

    #[error("Not signed in. Run `bz login` first.")]
    NotLoggedIn,
}

impl CliError {
    /// Whether the failure should reach error tracking.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        match self {
            Self::Api(e) => e.is_unexpected(),
            Self::Usage(_) | Self::NotLoggedIn => false,
        }
    }

    /// The line shown to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.toast_message(),
            other => other.to_string(),
        }
    }
}

/// Everything a command works with.
pub struct Context {
    pub client: ApiClient,
    pub store: Store,
}

impl Context {
    /// Build the client and restore the saved session.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub async fn open(config: &ClientConfig) -> Result<Self, CliError> {
        let client = ApiClient::new(config)?;
        let store = Store::load(Arc::new(FileStorage::new(&config.state_path)));

        if config.api_token.is_none()
            && let Some(token) = store.state().auth.token()
        {
            client.set_token(token).await;
        }

        Ok(Self { client, store })
    }

    pub fn require_login(&self) -> Result<(), CliError> {
        if self.store.state().auth.is_logged_in() {
            Ok(())
        } else {
            Err(CliError::NotLoggedIn)
        }
    }

    /// Show a toast.
    pub fn toast(&mut self, toast: Toast) {
        render::toast(&toast);
        self.store.toast(toast);
    }

    /// Show the success toast for a mutation, or pass its error on.
    pub fn report<T>(&mut self, result: Result<T, ApiError>, success: &str) -> Result<T, CliError> {
        let value = self.read(result)?;
        self.toast(Toast::success(success));
        Ok(value)
    }

    /// Pass a result through. A rejected token also signs the saved
    /// session out.
    pub fn read<T>(&mut self, result: Result<T, ApiError>) -> Result<T, CliError> {
        if let Err(ApiError::Unauthorized(_)) = &result {
            tracing::info!("Saved session rejected; signing out");
            self.store.dispatch(Action::LoggedOut);
        }
        Ok(result?)
    }
}
