//! Domain entities returned by the Bazaar API.
//!
//! The server creates, updates and deletes every entity; these types only
//! describe the shapes the client reads. Missing fields default rather than
//! fail so a partially populated document still renders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    CategoryId, ChatId, CouponId, DiscountType, Email, MessageId, OrderId, OrderStatus,
    PaymentMethod, PaymentStatus, ProductId, ShopId, UserId, UserRole, VariantId,
    WishlistItemId,
};

/// Placeholder shown for missing values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Render an optional string, falling back to [`NOT_AVAILABLE`].
#[must_use]
pub fn or_na(value: Option<&str>) -> &str {
    match value {
        Some(s) if !s.trim().is_empty() => s,
        _ => NOT_AVAILABLE,
    }
}

/// Anything with a server-assigned identifier.
pub trait Entity {
    fn entity_id(&self) -> &str;
}

/// A reference that the server may send either as a bare ID or as the
/// populated document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference<T> {
    Id(String),
    Expanded(Box<T>),
}

impl<T: Entity> Reference<T> {
    /// The referenced ID, whichever form was sent.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Expanded(doc) => doc.entity_id(),
        }
    }

    /// The populated document, if the server expanded it.
    #[must_use]
    pub fn expanded(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Expanded(doc) => Some(doc),
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// An account, as returned by `/users/me` and embedded in chats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    #[must_use]
    pub fn is_seller(&self) -> bool {
        self.role == UserRole::Seller
    }

    #[must_use]
    pub fn name_display(&self) -> &str {
        or_na(Some(&self.name))
    }

    #[must_use]
    pub fn email_display(&self) -> &str {
        or_na(self.email.as_ref().map(Email::as_str))
    }

    #[must_use]
    pub fn phone_display(&self) -> &str {
        or_na(self.phone.as_deref())
    }

    #[must_use]
    pub fn address_display(&self) -> &str {
        or_na(self.address.as_deref())
    }
}

impl Entity for User {
    fn entity_id(&self) -> &str {
        self.id.as_str()
    }
}

/// Payload of a successful login or registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub access_token: String,
    pub user: User,
}

// =============================================================================
// Shops and catalog
// =============================================================================

/// A seller's storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    #[serde(alias = "_id")]
    pub id: ShopId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: Option<UserId>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub followers: u32,
}

impl Shop {
    #[must_use]
    pub fn description_display(&self) -> &str {
        or_na(self.description.as_deref())
    }
}

impl Entity for Shop {
    fn entity_id(&self) -> &str {
        self.id.as_str()
    }
}

/// Product category used by the catalog filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl Entity for Category {
    fn entity_id(&self) -> &str {
        self.id.as_str()
    }
}

/// A product listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Option<Decimal>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Option<Reference<Category>>,
    #[serde(default)]
    pub shop: Option<Reference<Shop>>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Price a buyer pays for one unit, before variant overrides.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.discount_price
            .filter(|d| *d > Decimal::ZERO && *d < self.price)
            .unwrap_or(self.price)
    }

    /// Price for one unit of `variant`, if the product has it.
    #[must_use]
    pub fn variant_price(&self, variant: &VariantId) -> Option<Decimal> {
        self.variants
            .iter()
            .find(|v| &v.id == variant)
            .map(|v| v.price.unwrap_or_else(|| self.effective_price()))
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// First image URL, used as the thumbnail.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    #[must_use]
    pub fn name_display(&self) -> &str {
        or_na(Some(&self.name))
    }

    #[must_use]
    pub fn description_display(&self) -> &str {
        or_na(self.description.as_deref())
    }

    #[must_use]
    pub fn category_display(&self) -> &str {
        match &self.category {
            Some(Reference::Expanded(category)) => &category.name,
            _ => NOT_AVAILABLE,
        }
    }
}

impl Entity for Product {
    fn entity_id(&self) -> &str {
        self.id.as_str()
    }
}

/// A purchasable option of a product (e.g., "Size: XL").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    #[serde(alias = "_id")]
    pub id: VariantId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    /// Overrides the product price when set.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: u32,
}

impl Variant {
    /// Label such as "Size: XL".
    #[must_use]
    pub fn label(&self) -> String {
        let name = or_na(Some(&self.name));
        if self.value.trim().is_empty() {
            name.to_owned()
        } else {
            format!("{name}: {}", self.value)
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Delivery address captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address_line: String,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// One line of a placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: Reference<Product>,
    #[serde(default)]
    pub variant: Option<VariantId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub price: Decimal,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub user: Option<Reference<User>>,
    #[serde(default)]
    pub shop: Option<Reference<Shop>>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

impl Entity for Order {
    fn entity_id(&self) -> &str {
        self.id.as_str()
    }
}

// =============================================================================
// Coupons
// =============================================================================

/// A seller-issued discount code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    #[serde(alias = "_id")]
    pub id: CouponId,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub discount_type: DiscountType,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub min_order_amount: Option<Decimal>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub shop: Option<ShopId>,
}

const fn default_true() -> bool {
    true
}

impl Coupon {
    /// Whether the coupon can still be applied at `now`.
    #[must_use]
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.is_none_or(|expiry| expiry > now)
    }

    /// Discount this coupon grants on `subtotal`, never exceeding it.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        if self.min_order_amount.is_some_and(|min| subtotal < min) {
            return Decimal::ZERO;
        }
        let discount = match self.discount_type {
            DiscountType::Percentage => (subtotal * self.discount / Decimal::ONE_HUNDRED).round_dp(2),
            DiscountType::Fixed => self.discount,
        };
        discount.min(subtotal).max(Decimal::ZERO)
    }
}

/// Result of applying a coupon code to a subtotal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponApplication {
    pub code: String,
    pub discount: Decimal,
    pub total: Decimal,
}

// =============================================================================
// Chat
// =============================================================================

/// A conversation between a buyer and a seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(alias = "_id")]
    pub id: ChatId,
    #[serde(default)]
    pub participants: Vec<User>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub unread: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Chat {
    /// The participant that is not `me`.
    #[must_use]
    pub fn counterpart(&self, me: &UserId) -> Option<&User> {
        self.participants.iter().find(|u| &u.id != me)
    }

    #[must_use]
    pub fn preview(&self) -> &str {
        or_na(self.last_message.as_deref())
    }
}

impl Entity for Chat {
    fn entity_id(&self) -> &str {
        self.id.as_str()
    }
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(alias = "_id")]
    pub id: MessageId,
    pub chat: ChatId,
    pub sender: UserId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Wishlist and dashboard
// =============================================================================

/// A product saved to the buyer's wishlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    #[serde(alias = "_id")]
    pub id: WishlistItemId,
    pub product: Product,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

/// Headline numbers for the seller dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SellerStats {
    #[serde(default)]
    pub total_sales: Decimal,
    #[serde(default)]
    pub total_orders: u64,
    #[serde(default)]
    pub total_products: u64,
    #[serde(default)]
    pub pending_orders: u64,
    #[serde(default)]
    pub recent_orders: Vec<Order>,
}
