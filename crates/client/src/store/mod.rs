//! Client-side state that is not server data: who is signed in, the cart,
//! the open chat, catalogue filters and toasts.
//!
//! State changes only through [`Store::dispatch`], which applies an
//! [`Action`] synchronously. The auth and cart slices are written to a
//! [`StateStorage`] after every change to them; the rest resets on reload.

mod cart;
mod filters;
mod storage;
mod toast;

use std::fmt;
use std::sync::Arc;

use bazaar_core::{AuthSession, CategoryId, ChatId, Email, ProductId, UserId, UserRole, VariantId};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use cart::{Cart, CartLine};
pub use filters::ProductFilter;
pub use storage::{FileStorage, MemoryStorage, PersistedState, StateStorage, StorageError};
pub use toast::{Toast, ToastKind};

use crate::api::ProductSort;

const MAX_TOASTS: usize = 5;

// =============================================================================
// Slices
// =============================================================================

/// The signed-in user, as remembered between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: Option<Email>,
    pub role: UserRole,
}

/// Sign-in state. `Debug` redacts the token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    access_token: Option<String>,
    pub user: Option<AuthUser>,
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .finish()
    }
}

impl AuthState {
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.access_token.is_some()
    }

    /// The bearer token, for handing to the API client.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.access_token.as_deref().map(SecretString::from)
    }

    #[must_use]
    pub fn is_seller(&self) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| matches!(u.role, UserRole::Seller | UserRole::Admin))
    }
}

impl From<&AuthSession> for AuthState {
    fn from(session: &AuthSession) -> Self {
        Self {
            access_token: Some(session.access_token.clone()),
            user: Some(AuthUser {
                id: session.user.id.clone(),
                name: session.user.name.clone(),
                email: session.user.email.clone(),
                role: session.user.role,
            }),
        }
    }
}

/// Which conversation is selected and whether the chat panel is open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSelection {
    pub active: Option<ChatId>,
    pub open: bool,
}

/// Every slice of client state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientState {
    pub auth: AuthState,
    pub cart: Cart,
    pub chat: ChatSelection,
    pub filters: ProductFilter,
    pub toasts: Vec<Toast>,
    next_toast_id: u64,
}

impl ClientState {
    fn from_persisted(persisted: PersistedState) -> Self {
        Self {
            auth: persisted.auth,
            cart: persisted.cart,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            auth: self.auth.clone(),
            cart: self.cart.clone(),
        }
    }
}

// =============================================================================
// Actions
// =============================================================================

/// A state change.
#[derive(Debug, Clone)]
pub enum Action {
    LoggedIn(AuthSession),
    LoggedOut,
    AddToCart(CartLine),
    SetQuantity {
        product: ProductId,
        variant: Option<VariantId>,
        quantity: u32,
    },
    RemoveFromCart {
        product: ProductId,
        variant: Option<VariantId>,
    },
    ClearCart,
    /// Select a conversation and open the panel.
    SelectChat(ChatId),
    /// Open or close the chat panel.
    ToggleChat,
    ToggleCategory(CategoryId),
    SetSearch(String),
    SetPriceRange {
        min: Option<Decimal>,
        max: Option<Decimal>,
    },
    SetSort(ProductSort),
    SetPage(u32),
    ResetFilters,
    Toast(Toast),
    DismissToast(u64),
}

impl Action {
    const fn touches_persisted(&self) -> bool {
        matches!(
            self,
            Self::LoggedIn(_)
                | Self::LoggedOut
                | Self::AddToCart(_)
                | Self::SetQuantity { .. }
                | Self::RemoveFromCart { .. }
                | Self::ClearCart
        )
    }
}

/// Apply `action` to `state`.
pub fn reduce(state: &mut ClientState, action: Action) {
    match action {
        Action::LoggedIn(session) => state.auth = AuthState::from(&session),
        Action::LoggedOut => {
            state.auth = AuthState::default();
            state.chat = ChatSelection::default();
        }
        Action::AddToCart(line) => state.cart.add(line),
        Action::SetQuantity {
            product,
            variant,
            quantity,
        } => state.cart.set_quantity(&product, variant.as_ref(), quantity),
        Action::RemoveFromCart { product, variant } => {
            state.cart.remove(&product, variant.as_ref());
        }
        Action::ClearCart => state.cart.clear(),
        Action::SelectChat(chat) => {
            state.chat.active = Some(chat);
            state.chat.open = true;
        }
        Action::ToggleChat => state.chat.open = !state.chat.open,
        Action::ToggleCategory(category) => state.filters.toggle_category(category),
        Action::SetSearch(search) => state.filters.set_search(search),
        Action::SetPriceRange { min, max } => state.filters.set_price_range(min, max),
        Action::SetSort(sort) => state.filters.set_sort(sort),
        Action::SetPage(page) => state.filters.set_page(page),
        Action::ResetFilters => state.filters = ProductFilter::default(),
        Action::Toast(mut toast) => {
            state.next_toast_id += 1;
            toast.id = state.next_toast_id;
            state.toasts.push(toast);
            if state.toasts.len() > MAX_TOASTS {
                state.toasts.remove(0);
            }
        }
        Action::DismissToast(id) => state.toasts.retain(|t| t.id != id),
    }
}

// =============================================================================
// Store
// =============================================================================

/// Owner of [`ClientState`].
pub struct Store {
    state: ClientState,
    storage: Arc<dyn StateStorage>,
}

impl Store {
    /// Restore persisted state from `storage`.
    ///
    /// Unreadable saved state is logged and replaced with a fresh start.
    #[must_use]
    pub fn load(storage: Arc<dyn StateStorage>) -> Self {
        let state = match storage.load() {
            Ok(Some(persisted)) => ClientState::from_persisted(persisted),
            Ok(None) => ClientState::default(),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable client state");
                ClientState::default()
            }
        };
        Self { state, storage }
    }

    #[must_use]
    pub const fn state(&self) -> &ClientState {
        &self.state
    }

    /// Apply `action`, persisting if it changed auth or the cart.
    pub fn dispatch(&mut self, action: Action) {
        let persist = action.touches_persisted();
        debug!(?action, "Dispatch");
        reduce(&mut self.state, action);

        if persist && let Err(e) = self.storage.save(&self.state.persisted()) {
            warn!(error = %e, "Failed to persist client state");
        }
    }

    /// Show a toast and return its id.
    pub fn toast(&mut self, toast: Toast) -> u64 {
        self.dispatch(Action::Toast(toast));
        self.state.next_toast_id
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session() -> AuthSession {
        serde_json::from_value(serde_json::json!({
            "accessToken": "tok",
            "user": {
                "_id": "u1",
                "name": "Rumi",
                "email": "rumi@example.com",
                "role": "seller"
            }
        }))
        .unwrap()
    }

    fn line(product: &str, quantity: u32) -> CartLine {
        CartLine {
            product: ProductId::new(product),
            variant: None,
            name: product.to_string(),
            variant_label: None,
            unit_price: Decimal::TEN,
            quantity,
            image: None,
            shop: None,
            max_quantity: None,
        }
    }

    #[test]
    fn test_login_logout() {
        let mut state = ClientState::default();
        reduce(&mut state, Action::LoggedIn(session()));
        assert!(state.auth.is_logged_in());
        assert!(state.auth.is_seller());

        reduce(&mut state, Action::SelectChat(ChatId::new("c1")));
        reduce(&mut state, Action::LoggedOut);
        assert!(!state.auth.is_logged_in());
        assert_eq!(state.chat, ChatSelection::default());
    }

    #[test]
    fn test_auth_debug_redacts_token() {
        let auth = AuthState::from(&session());
        let debug = format!("{auth:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("tok\""));
    }

    #[test]
    fn test_toggle_chat_twice_restores() {
        let mut state = ClientState::default();
        reduce(&mut state, Action::SelectChat(ChatId::new("c1")));
        let before = state.chat.clone();
        reduce(&mut state, Action::ToggleChat);
        assert!(!state.chat.open);
        reduce(&mut state, Action::ToggleChat);
        assert_eq!(state.chat, before);
    }

    #[test]
    fn test_toasts_get_ids_and_are_capped() {
        let mut state = ClientState::default();
        for i in 0..7 {
            reduce(&mut state, Action::Toast(Toast::success(format!("t{i}"))));
        }
        assert_eq!(state.toasts.len(), MAX_TOASTS);
        assert_eq!(state.toasts[0].message, "t2");

        let id = state.toasts[0].id;
        reduce(&mut state, Action::DismissToast(id));
        assert!(state.toasts.iter().all(|t| t.id != id));
    }

    #[test]
    fn test_only_auth_and_cart_persist() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = Store::load(storage.clone());
        store.dispatch(Action::LoggedIn(session()));
        store.dispatch(Action::AddToCart(line("p1", 2)));
        store.dispatch(Action::SetSearch("lamp".to_string()));
        store.toast(Toast::success("Added"));

        let reloaded = Store::load(storage);
        assert!(reloaded.state().auth.is_logged_in());
        assert_eq!(reloaded.state().cart.item_count(), 2);
        assert_eq!(reloaded.state().filters, ProductFilter::default());
        assert!(reloaded.state().toasts.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let mut store = Store::load(Arc::new(MemoryStorage::new()));
        store.dispatch(Action::AddToCart(line("p1", 1)));
        store.dispatch(Action::SetQuantity {
            product: ProductId::new("p1"),
            variant: None,
            quantity: 4,
        });
        store.dispatch(Action::SetQuantity {
            product: ProductId::new("p1"),
            variant: None,
            quantity: 2,
        });
        assert_eq!(store.state().cart.item_count(), 2);
    }
}
