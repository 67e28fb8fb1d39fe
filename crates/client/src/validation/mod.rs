//! Client-side form validation.
//!
//! Every mutation input implements [`Validate`]. The client runs it before
//! building a request, so an invalid form never reaches the network.
//!
//! Rules are declared with [`Validator`]; each field keeps only its first
//! failure so messages read the way a form shows them.
//!
//! ```rust
//! use bazaar_client::validation::Validator;
//!
//! let mut v = Validator::new();
//! v.required("email", "").min_len("password", "abc", 6);
//! let errors = v.finish().unwrap_err();
//! assert_eq!(errors.first().unwrap().message, "Email is required");
//! ```

mod forms;

use std::fmt;
use std::sync::LazyLock;

use bazaar_core::Email;
use regex::Regex;
use rust_decimal::Decimal;

pub use forms::*;

/// International or local phone number: optional `+`, 7-15 digits, with
/// spaces or dashes between groups.
pub static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9](?:[0-9 -]{5,18})[0-9]$").expect("Invalid regex"));

/// Coupon codes: 4-20 upper-case letters or digits.
pub static COUPON_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{4,20}$").expect("Invalid regex"));

/// Something that can check itself before being submitted.
pub trait Validate {
    /// Check every rule.
    ///
    /// # Errors
    ///
    /// Returns every failing field with a user-facing message.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Inputs with nothing to check.
impl Validate for () {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

/// Bare IDs (deletes, cancels) only need to be non-blank.
macro_rules! validate_id {
    ($($ty:ty => $field:literal),* $(,)?) => {
        $(
            impl Validate for $ty {
                fn validate(&self) -> Result<(), ValidationErrors> {
                    Validator::new().required($field, self.as_str()).finish()
                }
            }
        )*
    };
}

validate_id!(
    bazaar_core::ProductId => "product",
    bazaar_core::VariantId => "variant",
    bazaar_core::OrderId => "order",
    bazaar_core::CouponId => "coupon",
    bazaar_core::ChatId => "chat",
);

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every failed rule of a form, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&FieldError> {
        self.errors.first()
    }

    /// The message for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages = self
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Builder collecting rule failures for one form.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Record `message` for `field` unless `ok` holds or the field already
    /// failed an earlier rule.
    pub fn check(
        &mut self,
        field: &str,
        ok: bool,
        message: impl FnOnce() -> String,
    ) -> &mut Self {
        if !ok && !self.has_error(field) {
            self.errors.push(FieldError {
                field: field.to_owned(),
                message: message(),
            });
        }
        self
    }

    /// The value must contain something other than whitespace.
    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, !value.trim().is_empty(), || {
            format!("{} is required", label(field))
        })
    }

    /// An optional value must be present.
    pub fn required_some<T>(&mut self, field: &str, value: Option<&T>) -> &mut Self {
        self.check(field, value.is_some(), || {
            format!("{} is required", label(field))
        })
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.required(field, value);
        self.check(field, Email::parse(value).is_ok(), || {
            "Enter a valid email address".to_string()
        })
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        self.check(field, value.trim().chars().count() >= min, || {
            format!("{} must be at least {min} characters", label(field))
        })
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        self.check(field, value.chars().count() <= max, || {
            format!("{} must be at most {max} characters", label(field))
        })
    }

    pub fn matches(
        &mut self,
        field: &str,
        value: &str,
        pattern: &Regex,
        message: &str,
    ) -> &mut Self {
        self.check(field, pattern.is_match(value.trim()), || message.to_owned())
    }

    /// Optional text that, when present, must match `pattern`.
    pub fn matches_opt(
        &mut self,
        field: &str,
        value: Option<&str>,
        pattern: &Regex,
        message: &str,
    ) -> &mut Self {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => self.matches(field, v, pattern, message),
            None => self,
        }
    }

    pub fn positive(&mut self, field: &str, value: Decimal) -> &mut Self {
        self.check(field, value > Decimal::ZERO, || {
            format!("{} must be greater than zero", label(field))
        })
    }

    pub fn non_negative(&mut self, field: &str, value: Decimal) -> &mut Self {
        self.check(field, value >= Decimal::ZERO, || {
            format!("{} cannot be negative", label(field))
        })
    }

    pub fn range(&mut self, field: &str, value: Decimal, min: Decimal, max: Decimal) -> &mut Self {
        self.check(field, value >= min && value <= max, || {
            format!("{} must be between {min} and {max}", label(field))
        })
    }

    pub fn equals(&mut self, field: &str, value: &str, expected: &str, message: &str) -> &mut Self {
        self.check(field, value == expected, || message.to_owned())
    }

    /// Finish, returning every failure.
    ///
    /// # Errors
    ///
    /// Returns the collected failures if any rule failed.
    pub fn finish(&mut self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                errors: std::mem::take(&mut self.errors),
            })
        }
    }
}

/// Turn a field key into a label: `shop_name` -> `Shop name`.
fn label(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        assert_eq!(label("shop_name"), "Shop name");
        assert_eq!(label("email"), "Email");
        assert_eq!(label(""), "");
    }

    #[test]
    fn test_first_failure_per_field_wins() {
        let mut v = Validator::new();
        v.required("password", "").min_len("password", "", 6);
        let errors = v.finish().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("password"), Some("Password is required"));
    }

    #[test]
    fn test_email_rule() {
        let mut v = Validator::new();
        v.email("email", "not-an-email");
        assert_eq!(
            v.finish().unwrap_err().get("email"),
            Some("Enter a valid email address")
        );

        let mut v = Validator::new();
        v.email("email", "buyer@example.com");
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_phone_pattern() {
        assert!(PHONE_RE.is_match("+8801712345678"));
        assert!(PHONE_RE.is_match("555-123-4567"));
        assert!(!PHONE_RE.is_match("12"));
        assert!(!PHONE_RE.is_match("call me"));
    }

    #[test]
    fn test_matches_opt_skips_blank() {
        let mut v = Validator::new();
        v.matches_opt("phone", Some("  "), &PHONE_RE, "Enter a valid phone number")
            .matches_opt("phone", None, &PHONE_RE, "Enter a valid phone number");
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_blank_id_is_invalid() {
        let errors = bazaar_core::ProductId::new(" ").validate().unwrap_err();
        assert_eq!(errors.get("product"), Some("Product is required"));
        assert!(bazaar_core::OrderId::new("o1").validate().is_ok());
    }

    #[test]
    fn test_range_and_display() {
        let mut v = Validator::new();
        v.range("discount", Decimal::from(150), Decimal::ONE, Decimal::ONE_HUNDRED)
            .positive("price", Decimal::ZERO);
        let errors = v.finish().unwrap_err();
        assert_eq!(
            errors.to_string(),
            "Discount must be between 1 and 100; Price must be greater than zero"
        );
    }
}
