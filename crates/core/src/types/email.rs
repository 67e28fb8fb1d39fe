//! Account email address.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was rejected as an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email needs a name before the @")]
    EmptyLocalPart,
    #[error("email needs a domain after the @")]
    EmptyDomain,
    #[error("email must contain a single @ symbol")]
    MultipleAtSymbols,
}

/// A trimmed, lowercased address with one `@` between a non-empty name and
/// domain. The server decides whether it is deliverable.
///
/// Deserialization does not re-check the shape: the client shows whatever
/// address the API stored.
///
/// ```
/// use bazaar_core::Email;
///
/// let email = Email::parse(" Seller@Bazaar.Shop ").unwrap();
/// assert_eq!(email.as_str(), "seller@bazaar.shop");
/// assert!(Email::parse("seller@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// # Errors
    ///
    /// Returns an [`EmailError`] naming the first structural problem.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }
        if domain.contains('@') {
            return Err(EmailError::MultipleAtSymbols);
        }

        Ok(Self(s.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// The part after the `@`, e.g. for grouping sellers by company.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_marketplace_addresses() {
        for input in [
            "buyer@example.com",
            "rumi.ahmed+orders@shop.com.bd",
            "a@b.c",
        ] {
            assert!(Email::parse(input).is_ok(), "{input} should parse");
        }
    }

    #[test]
    fn test_rejections_name_the_problem() {
        let long = format!("{}@example.com", "x".repeat(250));
        let cases = [
            ("   ", EmailError::Empty),
            (long.as_str(), EmailError::TooLong { max: 254 }),
            ("buyer.example.com", EmailError::MissingAtSymbol),
            ("@example.com", EmailError::EmptyLocalPart),
            ("buyer@", EmailError::EmptyDomain),
            ("buyer@shop@example.com", EmailError::MultipleAtSymbols),
        ];
        for (input, expected) in cases {
            assert_eq!(Email::parse(input).unwrap_err(), expected, "{input}");
        }
    }

    #[test]
    fn test_parse_trims_and_lowercases() {
        let email: Email = "  Seller@Bazaar.SHOP ".parse().unwrap();
        assert_eq!(email.as_str(), "seller@bazaar.shop");
        assert_eq!(email.domain(), "bazaar.shop");
        assert_eq!(email.to_string(), "seller@bazaar.shop");
    }

    #[test]
    fn test_deserialize_keeps_server_value() {
        let email: Email = serde_json::from_str("\"Legacy@Import\"").unwrap();
        assert_eq!(email.as_str(), "Legacy@Import");
    }
}
