//! `Content-Disposition` header handling (RFC 2183).

use crate::params::{Parameters, split_unquoted};
use std::fmt;

/// Disposition type of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DispositionKind {
    /// Displayed as part of the message.
    Inline,
    /// Offered as a separate file.
    Attachment,
}

impl fmt::Display for DispositionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::Attachment => write!(f, "attachment"),
        }
    }
}

/// Parsed `Content-Disposition` value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentDisposition {
    /// Disposition type.
    pub kind: DispositionKind,
    /// Parameters such as `filename`.
    pub parameters: Parameters,
}

impl ContentDisposition {
    /// Creates an `attachment` disposition for the given file name.
    #[must_use]
    pub fn attachment(filename: impl Into<String>) -> Self {
        let mut parameters = Parameters::default();
        parameters.set("filename", filename);
        Self {
            kind: DispositionKind::Attachment,
            parameters,
        }
    }

    /// Creates a bare `inline` disposition.
    #[must_use]
    pub fn inline() -> Self {
        Self {
            kind: DispositionKind::Inline,
            parameters: Parameters::default(),
        }
    }

    /// Returns the `filename` parameter if present.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.parameters.get("filename")
    }

    /// Parses a `Content-Disposition` value.
    ///
    /// Unknown disposition types are treated as `attachment`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let first = split_unquoted(s, ';').first().copied().unwrap_or_default();
        let kind = if first.trim().eq_ignore_ascii_case("inline") {
            DispositionKind::Inline
        } else {
            DispositionKind::Attachment
        };

        Self {
            kind,
            parameters: Parameters::parse(&s[first.len()..]),
        }
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_display() {
        let disposition = ContentDisposition::attachment("report.pdf");
        assert_eq!(disposition.to_string(), "attachment; filename=report.pdf");
    }

    #[test]
    fn test_attachment_non_ascii_filename() {
        let disposition = ContentDisposition::attachment("größe.txt");
        let rendered = disposition.to_string();
        assert!(rendered.starts_with("attachment; filename*=utf-8''"));

        let parsed = ContentDisposition::parse(&rendered);
        assert_eq!(parsed.filename(), Some("größe.txt"));
    }

    #[test]
    fn test_parse_inline() {
        let parsed = ContentDisposition::parse("INLINE");
        assert_eq!(parsed.kind, DispositionKind::Inline);
        assert_eq!(parsed.filename(), None);
        assert_eq!(ContentDisposition::inline(), parsed);
    }

    #[test]
    fn test_parse_quoted_filename() {
        let parsed = ContentDisposition::parse("attachment; filename=\"annual report.pdf\"");
        assert_eq!(parsed.kind, DispositionKind::Attachment);
        assert_eq!(parsed.filename(), Some("annual report.pdf"));
    }
}
