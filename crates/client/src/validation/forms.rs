//! Typed forms submitted by the storefront and seller dashboard.
//!
//! Each form serialises to the JSON body the API expects (camelCase) and
//! validates itself before submission. File inputs are skipped by serde and
//! travel as multipart parts instead.

use bazaar_core::{
    ChatId, DiscountType, OrderStatus, PaymentMethod, ProductId, ShippingAddress, ShopId, UserId,
    VariantId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{COUPON_CODE_RE, PHONE_RE, Validate, ValidationErrors, Validator};
use crate::http::FilePart;

const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PRODUCT_IMAGES: usize = 5;
const MAX_MESSAGE_LENGTH: usize = 2000;
const PHONE_MESSAGE: &str = "Enter a valid phone number";
const PASSWORD_MISMATCH: &str = "Passwords do not match";

/// A form aimed at an existing entity, e.g. updating product `id`.
#[derive(Debug, Clone)]
pub struct ForId<I, T> {
    pub id: I,
    pub body: T,
}

impl<I, T> ForId<I, T> {
    pub const fn new(id: I, body: T) -> Self {
        Self { id, body }
    }
}

impl<I: AsRef<str>, T: Validate> Validate for ForId<I, T> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required("id", self.id.as_ref());
        if let Err(body) = self.body.validate() {
            v.errors.extend(body.errors);
        }
        v.finish()
    }
}

// =============================================================================
// Auth and profile
// =============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl Validate for LoginForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .email("email", &self.email)
            .required("password", &self.password)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip)]
    pub confirm_password: String,
}

impl Validate for RegisterForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("name", &self.name)
            .email("email", &self.email)
            .required("password", &self.password)
            .min_len("password", &self.password, MIN_PASSWORD_LENGTH)
            .equals(
                "confirm_password",
                &self.confirm_password,
                &self.password,
                PASSWORD_MISMATCH,
            )
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerRegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip)]
    pub confirm_password: String,
    pub shop_name: String,
    pub phone: String,
}

impl Validate for SellerRegisterForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("name", &self.name)
            .email("email", &self.email)
            .required("password", &self.password)
            .min_len("password", &self.password, MIN_PASSWORD_LENGTH)
            .equals(
                "confirm_password",
                &self.confirm_password,
                &self.password,
                PASSWORD_MISMATCH,
            )
            .required("shop_name", &self.shop_name)
            .max_len("shop_name", &self.shop_name, 80)
            .required("phone", &self.phone)
            .matches("phone", &self.phone, &PHONE_RE, PHONE_MESSAGE)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordForm {
    pub old_password: String,
    pub new_password: String,
    #[serde(skip)]
    pub confirm_password: String,
}

impl Validate for ChangePasswordForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("old_password", &self.old_password)
            .required("new_password", &self.new_password)
            .min_len("new_password", &self.new_password, MIN_PASSWORD_LENGTH)
            .check(
                "new_password",
                self.new_password != self.old_password,
                || "New password must differ from the old one".to_string(),
            )
            .equals(
                "confirm_password",
                &self.confirm_password,
                &self.new_password,
                PASSWORD_MISMATCH,
            )
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl Validate for ForgotPasswordForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new().email("email", &self.email).finish()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileForm {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip)]
    pub avatar: Option<FilePart>,
}

impl Validate for ProfileForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required("name", &self.name)
            .max_len("name", &self.name, 80)
            .matches_opt("phone", self.phone.as_deref(), &PHONE_RE, PHONE_MESSAGE);
        if let Some(avatar) = &self.avatar {
            v.check("avatar", avatar.is_image(), || {
                "Avatar must be an image".to_string()
            });
        }
        v.finish()
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<Decimal>,
    pub stock: u32,
    pub category: String,
    #[serde(skip)]
    pub images: Vec<FilePart>,
}

impl Validate for ProductForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required("name", &self.name)
            .max_len("name", &self.name, 120)
            .positive("price", self.price)
            .required("category", &self.category)
            .check("images", self.images.len() <= MAX_PRODUCT_IMAGES, || {
                format!("At most {MAX_PRODUCT_IMAGES} images are allowed")
            })
            .check("images", self.images.iter().all(FilePart::is_image), || {
                "Only image files can be uploaded".to_string()
            });
        if let Some(discount) = self.discount_price {
            v.positive("discount_price", discount)
                .check("discount_price", discount < self.price, || {
                    "Discount price must be lower than the price".to_string()
                });
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VariantForm {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub stock: u32,
}

impl Validate for VariantForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required("name", &self.name).required("value", &self.value);
        if let Some(price) = self.price {
            v.positive("price", price);
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ShopForm {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip)]
    pub logo: Option<FilePart>,
}

impl Validate for ShopForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required("name", &self.name)
            .max_len("name", &self.name, 80)
            .matches_opt("phone", self.phone.as_deref(), &PHONE_RE, PHONE_MESSAGE);
        if let Some(description) = &self.description {
            v.max_len("description", description, 1000);
        }
        if let Some(logo) = &self.logo {
            v.check("logo", logo.is_image(), || "Logo must be an image".to_string());
        }
        v.finish()
    }
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponForm {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Validate for CouponForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required("code", &self.code)
            .matches(
                "code",
                &self.code,
                &COUPON_CODE_RE,
                "Code must be 4-20 upper-case letters or digits",
            )
            .positive("discount", self.discount);
        if self.discount_type == DiscountType::Percentage {
            v.range("discount", self.discount, Decimal::ONE, Decimal::ONE_HUNDRED);
        }
        if let Some(min) = self.min_order_amount {
            v.non_negative("min_order_amount", min);
        }
        if let Some(expires_at) = self.expires_at {
            v.check("expires_at", expires_at > Utc::now(), || {
                "Expiry date must be in the future".to_string()
            });
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyCouponForm {
    pub code: String,
    pub subtotal: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop: Option<ShopId>,
}

impl Validate for ApplyCouponForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("code", &self.code)
            .positive("subtotal", self.subtotal)
            .finish()
    }
}

// =============================================================================
// Orders
// =============================================================================

/// One cart line as submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineInput {
    pub product: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantId>,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    pub items: Vec<OrderLineInput>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

impl Validate for CheckoutForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let address = &self.shipping_address;
        Validator::new()
            .check("items", !self.items.is_empty(), || {
                "Your cart is empty".to_string()
            })
            .check("items", self.items.iter().all(|i| i.quantity > 0), || {
                "Every item needs a quantity of at least 1".to_string()
            })
            .required("full_name", &address.full_name)
            .required("phone", &address.phone)
            .matches("phone", &address.phone, &PHONE_RE, PHONE_MESSAGE)
            .required("address_line", &address.address_line)
            .required("city", &address.city)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OrderStatusForm {
    pub status: OrderStatus,
}

impl Validate for OrderStatusForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

// =============================================================================
// Chat and wishlist
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StartChatForm {
    pub receiver: UserId,
}

impl Validate for StartChatForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("receiver", self.receiver.as_str())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageForm {
    pub chat: ChatId,
    pub text: String,
}

impl Validate for MessageForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("chat", self.chat.as_str())
            .required("text", &self.text)
            .max_len("text", &self.text, MAX_MESSAGE_LENGTH)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WishlistForm {
    pub product: ProductId,
}

impl Validate for WishlistForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("product", self.product.as_str())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Rina Das".to_string(),
            phone: "+8801712345678".to_string(),
            address_line: "12 Lake Road".to_string(),
            city: "Dhaka".to_string(),
            postal_code: None,
            country: None,
        }
    }

    #[test]
    fn test_login_requires_fields() {
        let errors = LoginForm::default().validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));
    }

    #[test]
    fn test_register_password_rules() {
        let form = RegisterForm {
            name: "Rina".to_string(),
            email: "rina@example.com".to_string(),
            password: "abc".to_string(),
            confirm_password: "abd".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 6 characters")
        );
        assert_eq!(errors.get("confirm_password"), Some(PASSWORD_MISMATCH));
    }

    #[test]
    fn test_register_skips_confirmation_in_body() {
        let form = RegisterForm {
            name: "Rina".to_string(),
            email: "rina@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        };
        assert!(form.validate().is_ok());
        let body = serde_json::to_value(&form).unwrap();
        assert!(body.get("confirm_password").is_none());
        assert_eq!(body["email"], "rina@example.com");
    }

    #[test]
    fn test_seller_register_phone() {
        let form = SellerRegisterForm {
            name: "Rina".to_string(),
            email: "rina@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            shop_name: "Rina's Crafts".to_string(),
            phone: "call me".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("phone"), Some(PHONE_MESSAGE));
        let body = serde_json::to_value(&form).unwrap();
        assert_eq!(body["shopName"], "Rina's Crafts");
    }

    #[test]
    fn test_product_discount_must_be_lower() {
        let form = ProductForm {
            name: "Mug".to_string(),
            price: Decimal::from(10),
            discount_price: Some(Decimal::from(12)),
            stock: 4,
            category: "kitchen".to_string(),
            ..ProductForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.get("discount_price"),
            Some("Discount price must be lower than the price")
        );
    }

    #[test]
    fn test_product_image_limit() {
        let image = FilePart::new("images", "a.png", "image/png", vec![0x89]);
        let form = ProductForm {
            name: "Mug".to_string(),
            price: Decimal::from(10),
            category: "kitchen".to_string(),
            images: vec![image; 6],
            ..ProductForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("images"), Some("At most 5 images are allowed"));
    }

    #[test]
    fn test_coupon_rules() {
        let form = CouponForm {
            code: "save10".to_string(),
            discount_type: DiscountType::Percentage,
            discount: Decimal::from(120),
            min_order_amount: None,
            expires_at: Some(Utc::now() - chrono::Duration::hours(1)),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.get("code").is_some());
        assert_eq!(
            errors.get("discount"),
            Some("Discount must be between 1 and 100")
        );
        assert_eq!(
            errors.get("expires_at"),
            Some("Expiry date must be in the future")
        );
    }

    #[test]
    fn test_fixed_coupon_allows_large_discount() {
        let form = CouponForm {
            code: "FLAT500".to_string(),
            discount_type: DiscountType::Fixed,
            discount: Decimal::from(500),
            min_order_amount: Some(Decimal::from(2000)),
            expires_at: None,
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_checkout_empty_cart() {
        let form = CheckoutForm {
            items: vec![],
            shipping_address: address(),
            ..CheckoutForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.first().unwrap().message, "Your cart is empty");
    }

    #[test]
    fn test_checkout_valid() {
        let form = CheckoutForm {
            items: vec![OrderLineInput {
                product: ProductId::new("p1"),
                variant: None,
                quantity: 2,
            }],
            shipping_address: address(),
            payment_method: PaymentMethod::CashOnDelivery,
            coupon_code: Some("SAVE10".to_string()),
        };
        assert!(form.validate().is_ok());
        let body = serde_json::to_value(&form).unwrap();
        assert_eq!(body["paymentMethod"], "cash_on_delivery");
        assert_eq!(body["shippingAddress"]["fullName"], "Rina Das");
    }

    #[test]
    fn test_message_blank() {
        let form = MessageForm {
            chat: ChatId::new("c1"),
            text: "   ".to_string(),
        };
        assert_eq!(
            form.validate().unwrap_err().get("text"),
            Some("Text is required")
        );
    }

    #[test]
    fn test_for_id_requires_id() {
        let form = ForId::new(ProductId::new(""), WishlistForm {
            product: ProductId::new("p1"),
        });
        assert_eq!(form.validate().unwrap_err().get("id"), Some("Id is required"));
    }
}
