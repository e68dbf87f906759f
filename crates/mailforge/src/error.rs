//! Error types for message building.

use std::fmt;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A builder field that must be set before `build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Sender address.
    From,
    /// Recipient address.
    To,
    /// Subject line.
    Subject,
    /// Message body (plain text or HTML).
    Body,
}

impl Field {
    /// Get the field name as used by the builder setters.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::From => "from",
            Self::To => "to",
            Self::Subject => "subject",
            Self::Body => "body",
        }
    }

    /// Get a human-readable description of the field.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::From => "sender (from)",
            Self::To => "recipient (to)",
            Self::Subject => "subject",
            Self::Body => "message body",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required builder field was never set.
    MissingRequiredField,
    /// The MIME layer rejected an address, header value or content.
    MessageConstructionFailure,
}

/// Errors that can occur while building a message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required field was not set before `build`.
    #[error("Missing required field: {0}")]
    MissingField(Field),

    /// The MIME layer rejected part of the message.
    #[error("Message construction failed: {0}")]
    Construction(#[from] mailforge_mime::Error),
}

impl Error {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_) => ErrorKind::MissingRequiredField,
            Self::Construction(_) => ErrorKind::MessageConstructionFailure,
        }
    }

    /// Returns the missing field, if this is a missing-field error.
    #[must_use]
    pub const fn missing_field(&self) -> Option<Field> {
        match self {
            Self::MissingField(field) => Some(*field),
            Self::Construction(_) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_missing_field_display() {
        let err = Error::MissingField(Field::From);
        assert_eq!(err.to_string(), "Missing required field: sender (from)");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
        assert_eq!(err.missing_field(), Some(Field::From));
        assert!(err.source().is_none());
    }

    #[test]
    fn test_construction_keeps_cause() {
        let cause = mailforge_mime::Error::InvalidAddress("bad".into());
        let err = Error::from(cause);

        assert_eq!(err.kind(), ErrorKind::MessageConstructionFailure);
        assert_eq!(err.missing_field(), None);
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Invalid email address: bad");
    }

    #[test]
    fn test_field_names() {
        assert_eq!(Field::Subject.name(), "subject");
        assert_eq!(Field::Body.to_string(), "message body");
    }
}
