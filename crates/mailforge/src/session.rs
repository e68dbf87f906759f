//! Mail session context.
//!
//! A [`Session`] carries the conventions a built message follows: the
//! domain used for generated `Message-ID` values, an optional `X-Mailer`
//! value, and whether a `Date` header is stamped. It is configuration only;
//! nothing here opens a connection.

/// Default host name used for `Message-ID` generation.
pub const DEFAULT_HOSTNAME: &str = "localhost";

/// Message conventions shared by every message built against it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Session {
    /// Domain for generated `Message-ID` values. When empty, the sender's
    /// domain is used instead.
    pub hostname: String,
    /// Value of the `X-Mailer` header, if any.
    pub mailer: Option<String>,
    /// Whether to stamp a `Date` header at build time.
    pub include_date: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            mailer: None,
            include_date: true,
        }
    }
}

impl Session {
    /// Creates a session for the given host name.
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    /// Sets the `X-Mailer` header value.
    #[must_use]
    pub fn with_mailer(mut self, mailer: impl Into<String>) -> Self {
        self.mailer = Some(mailer.into());
        self
    }

    /// Enables or disables the `Date` header.
    #[must_use]
    pub const fn with_date(mut self, include_date: bool) -> Self {
        self.include_date = include_date;
        self
    }

    /// Returns the domain for a `Message-ID`, falling back to `sender_domain`.
    pub(crate) fn message_id_domain<'a>(&'a self, sender_domain: &'a str) -> &'a str {
        let hostname = self.hostname.trim();
        if hostname.is_empty() {
            sender_domain
        } else {
            hostname
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session() {
        let session = Session::default();
        assert_eq!(session.hostname, "localhost");
        assert!(session.mailer.is_none());
        assert!(session.include_date);
    }

    #[test]
    fn test_session_builder_methods() {
        let session = Session::new("mail.example.com")
            .with_mailer("mailforge")
            .with_date(false);
        assert_eq!(session.hostname, "mail.example.com");
        assert_eq!(session.mailer.as_deref(), Some("mailforge"));
        assert!(!session.include_date);
    }

    #[test]
    fn test_message_id_domain_fallback() {
        assert_eq!(Session::new("").message_id_domain("example.org"), "example.org");
        assert_eq!(
            Session::new("mx.example.com").message_id_domain("example.org"),
            "mx.example.com"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_session_from_json() {
        let session: Session =
            serde_json::from_str(r#"{"hostname": "mx.example.com", "mailer": "ops-bot"}"#)
                .unwrap();
        assert_eq!(session.hostname, "mx.example.com");
        assert_eq!(session.mailer.as_deref(), Some("ops-bot"));
        assert!(session.include_date);
    }
}
