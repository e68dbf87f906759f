//! Email address types for message headers.

use crate::encoding::{encode_rfc2047, encode_rfc2047_words};
use crate::error::{Error, Result};
use std::fmt;

/// Characters that require a display name to be quoted (RFC 5322 specials).
const SPECIALS: &str = "()<>[]:;@\\,.\"";

/// RFC 5321 size limits for the local part and the whole address.
const MAX_LOCAL_LENGTH: usize = 64;
const MAX_ADDRESS_LENGTH: usize = 254;

/// Display name words longer than this are sent as encoded words so the
/// header can be folded.
const MAX_NAME_WORD_LENGTH: usize = 75;

/// A bare `local@domain` email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    /// Validates an email address (basic validation).
    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if addr.contains(|c: char| c.is_whitespace() || c.is_control()) {
            return Err(Error::InvalidAddress(format!(
                "Address cannot contain whitespace: {addr:?}"
            )));
        }

        if addr.contains(['<', '>', ',', ';']) {
            return Err(Error::InvalidAddress(format!(
                "Address contains invalid characters: {addr}"
            )));
        }

        let Some((local, domain)) = addr.split_once('@') else {
            return Err(Error::InvalidAddress(format!(
                "Address must contain @: {addr}"
            )));
        };

        if domain.contains('@') {
            return Err(Error::InvalidAddress(format!(
                "Address must have exactly one @: {addr}"
            )));
        }

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "Local and domain parts cannot be empty: {addr}"
            )));
        }

        if local.len() > MAX_LOCAL_LENGTH || addr.len() > MAX_ADDRESS_LENGTH {
            return Err(Error::InvalidAddress(format!(
                "Address exceeds RFC 5321 length limits: {addr}"
            )));
        }

        if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
            return Err(Error::InvalidAddress(format!("Invalid domain: {domain}")));
        }

        Ok(())
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(addr: String) -> Result<Self> {
        Self::new(addr)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: Address,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: None,
            address: Address::new(address)?,
        })
    }

    /// Creates a new mailbox with a display name and address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: Some(name.into()),
            address: Address::new(address)?,
        })
    }

    /// Parses `addr@example.com`, `Name <addr@example.com>` or
    /// `"Name, Jr." <addr@example.com>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mailbox is malformed or the address is invalid.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        let Some(open) = s.rfind('<') else {
            return Self::new(s);
        };

        let Some(inner) = s[open + 1..].strip_suffix('>') else {
            return Err(Error::InvalidAddress(format!("Unterminated angle address: {s}")));
        };

        let raw = s[..open].trim();
        let name = match raw.strip_prefix('"').and_then(|n| n.strip_suffix('"')) {
            Some(quoted) => quoted.replace("\\\"", "\"").replace("\\\\", "\\"),
            // A period is tolerated in an unquoted phrase (obs-phrase)
            None if raw.contains(|c: char| c != '.' && SPECIALS.contains(c)) => {
                return Err(Error::InvalidAddress(format!(
                    "Display name with special characters must be quoted: {raw}"
                )));
            }
            None => raw.to_string(),
        };

        if name.contains(['\r', '\n']) {
            return Err(Error::InvalidAddress(format!(
                "Display name cannot contain line breaks: {name:?}"
            )));
        }

        let address = Address::new(inner.trim())?;
        Ok(Self {
            name: (!name.is_empty()).then_some(name),
            address,
        })
    }

    /// Renders the mailbox for a header line, RFC 2047 encoding a
    /// non-ASCII display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the display name cannot be encoded.
    pub fn to_header_value(&self) -> Result<String> {
        match &self.name {
            Some(name) if !name.is_ascii() => {
                Ok(format!("{} <{}>", encode_rfc2047(name, "utf-8")?, self.address))
            }
            Some(name)
                if name
                    .split_whitespace()
                    .any(|word| word.len() > MAX_NAME_WORD_LENGTH) =>
            {
                Ok(format!(
                    "{} <{}>",
                    encode_rfc2047_words(name, "utf-8")?,
                    self.address
                ))
            }
            _ => Ok(self.to_string()),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if name.contains(|c: char| SPECIALS.contains(c)) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.address)
            }
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        let addr = Address::new("user@example.com").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
        assert_eq!(addr.domain(), "example.com");
    }

    #[test]
    fn test_invalid_address_no_at() {
        assert!(Address::new("userexample.com").is_err());
    }

    #[test]
    fn test_invalid_address_empty() {
        assert!(Address::new("").is_err());
    }

    #[test]
    fn test_invalid_address_empty_local() {
        assert!(Address::new("@example.com").is_err());
    }

    #[test]
    fn test_invalid_address_empty_domain() {
        assert!(Address::new("user@").is_err());
    }

    #[test]
    fn test_invalid_address_two_ats() {
        assert!(Address::new("a@b@example.com").is_err());
    }

    #[test]
    fn test_invalid_address_whitespace() {
        assert!(Address::new("john doe@example.com").is_err());
        assert!(Address::new("user@example.com\r\nBcc: x@y.z").is_err());
    }

    #[test]
    fn test_invalid_address_too_long() {
        let local = "a".repeat(65);
        assert!(Address::new(format!("{local}@example.com")).is_err());

        let domain = format!("{}.com", "d".repeat(250));
        assert!(Address::new(format!("user@{domain}")).is_err());
    }

    #[test]
    fn test_mailbox_long_name_word_encoded() {
        let mailbox = Mailbox::with_name("n".repeat(120), "n@example.com").unwrap();
        let value = mailbox.to_header_value().unwrap();
        assert!(value.starts_with("=?utf-8?B?"));
        assert!(value.ends_with(" <n@example.com>"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_mailbox_serde_validates_address() {
        let mailbox: Mailbox =
            serde_json::from_str(r#"{"name": "Jane", "address": "jane@example.com"}"#).unwrap();
        assert_eq!(mailbox.to_string(), "Jane <jane@example.com>");
        assert_eq!(
            serde_json::to_string(&mailbox.address).unwrap(),
            r#""jane@example.com""#
        );

        assert!(serde_json::from_str::<Address>(r#""not-an-address""#).is_err());
    }

    #[test]
    fn test_mailbox_with_name() {
        let mailbox = Mailbox::with_name("John Doe", "john@example.com").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("John Doe"));
        assert_eq!(mailbox.to_string(), "John Doe <john@example.com>");
    }

    #[test]
    fn test_mailbox_parse_bare() {
        let mailbox = Mailbox::parse("  user@example.com ").unwrap();
        assert!(mailbox.name.is_none());
        assert_eq!(mailbox.address.as_str(), "user@example.com");
    }

    #[test]
    fn test_mailbox_parse_named() {
        let mailbox = Mailbox::parse("Jane Roe <jane@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("Jane Roe"));
        assert_eq!(mailbox.address.as_str(), "jane@example.com");
    }

    #[test]
    fn test_mailbox_parse_quoted_name() {
        let mailbox = Mailbox::parse("\"Roe, Jane\" <jane@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("Roe, Jane"));
        assert_eq!(mailbox.to_string(), "\"Roe, Jane\" <jane@example.com>");
    }

    #[test]
    fn test_mailbox_parse_unquoted_specials() {
        assert!(matches!(
            Mailbox::parse("Doe, John <j@example.com>"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(Mailbox::parse("Zoë, X <z@example.com>").is_err());
        assert!(Mailbox::parse("a@b <j@example.com>").is_err());

        let mailbox = Mailbox::parse("John Q. Public <jqp@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("John Q. Public"));
    }

    #[test]
    fn test_mailbox_parse_unterminated() {
        assert!(Mailbox::parse("Jane <jane@example.com").is_err());
    }

    #[test]
    fn test_mailbox_header_value_encodes_name() {
        let mailbox = Mailbox::parse("Jörg Müller <jm@example.de>").unwrap();
        let value = mailbox.to_header_value().unwrap();
        assert!(value.starts_with("=?utf-8?B?"));
        assert!(value.ends_with(" <jm@example.de>"));
    }
}
