//! MIME content type handling.

use crate::error::{Error, Result};
use crate::params::{Parameters, split_unquoted};
use std::fmt;
use std::path::Path;

/// File extensions mapped to media types, used when a part is read from disk.
const EXTENSION_TYPES: &[(&str, &str, &str)] = &[
    ("txt", "text", "plain"),
    ("log", "text", "plain"),
    ("csv", "text", "csv"),
    ("htm", "text", "html"),
    ("html", "text", "html"),
    ("css", "text", "css"),
    ("xml", "application", "xml"),
    ("json", "application", "json"),
    ("pdf", "application", "pdf"),
    ("zip", "application", "zip"),
    ("gz", "application", "gzip"),
    ("doc", "application", "msword"),
    (
        "docx",
        "application",
        "vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application", "vnd.ms-excel"),
    (
        "xlsx",
        "application",
        "vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ics", "text", "calendar"),
    ("eml", "message", "rfc822"),
    ("png", "image", "png"),
    ("jpg", "image", "jpeg"),
    ("jpeg", "image", "jpeg"),
    ("gif", "image", "gif"),
    ("svg", "image", "svg+xml"),
    ("webp", "image", "webp"),
    ("mp3", "audio", "mpeg"),
    ("wav", "audio", "wav"),
    ("mp4", "video", "mp4"),
];

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=UTF-8, boundary=xxx), in insertion order.
    pub parameters: Parameters,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into().to_lowercase(),
            sub_type: sub_type.into().to_lowercase(),
            parameters: Parameters::default(),
        }
    }

    /// Creates a `text/plain; charset=UTF-8` content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "UTF-8")
    }

    /// Creates a `text/html; charset=UTF-8` content type.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "UTF-8")
    }

    /// Creates an `application/octet-stream` content type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Guesses the content type from a file name's extension.
    ///
    /// Unknown or missing extensions yield `application/octet-stream`.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| {
                EXTENSION_TYPES
                    .iter()
                    .find(|(known, _, _)| known.eq_ignore_ascii_case(ext))
            })
            .map_or_else(Self::octet_stream, |(_, main, sub)| {
                let content_type = Self::new(*main, *sub);
                if content_type.is_text() {
                    content_type.with_parameter("charset", "UTF-8")
                } else {
                    content_type
                }
            })
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.set(key, value);
        self
    }

    /// Returns the `type/subtype` essence without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary")
    }

    /// Returns the name parameter if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.parameters.get("name")
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the format is invalid.
    pub fn parse(s: &str) -> Result<Self> {
        let first = split_unquoted(s, ';').first().copied().unwrap_or_default();
        let (type_str, params) = (first.trim(), &s[first.len()..]);

        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype: {s}")))?;
        let (main_type, sub_type) = (main_type.trim(), sub_type.trim());

        if main_type.is_empty() {
            return Err(Error::InvalidContentType("Missing main type".to_string()));
        }
        if sub_type.is_empty() {
            return Err(Error::InvalidContentType("Missing subtype".to_string()));
        }

        Ok(Self {
            main_type: main_type.to_lowercase(),
            sub_type: sub_type.to_lowercase(),
            parameters: Parameters::parse(params),
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}{}", self.main_type, self.sub_type, self.parameters)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_new() {
        let ct = ContentType::new("text", "plain");
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_text_plain() {
        let ct = ContentType::text_plain();
        assert_eq!(ct.essence(), "text/plain");
        assert_eq!(ct.charset(), Some("UTF-8"));
    }

    #[test]
    fn test_text_html_display() {
        assert_eq!(
            ContentType::text_html().to_string(),
            "text/html; charset=UTF-8"
        );
    }

    #[test]
    fn test_multipart_mixed() {
        let ct = ContentType::multipart_mixed("boundary123");
        assert_eq!(ct.main_type, "multipart");
        assert_eq!(ct.sub_type, "mixed");
        assert_eq!(ct.boundary(), Some("boundary123"));
        assert!(ct.is_multipart());
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("text/plain; charset=utf-8").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_content_type_parse_quoted() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"").unwrap();
        assert_eq!(ct.main_type, "multipart");
        assert_eq!(ct.sub_type, "mixed");
        assert_eq!(ct.boundary(), Some("----=_Part_123"));
    }

    #[test]
    fn test_content_type_parse_invalid() {
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("/plain").is_err());
        assert!(ContentType::parse("text/").is_err());
    }

    #[test]
    fn test_content_type_with_parameter() {
        let ct = ContentType::new("text", "plain")
            .with_parameter("charset", "iso-8859-1")
            .with_parameter("format", "flowed");

        assert_eq!(ct.charset(), Some("iso-8859-1"));
        assert_eq!(ct.parameters.get("format"), Some("flowed"));
        assert_eq!(
            ct.to_string(),
            "text/plain; charset=iso-8859-1; format=flowed"
        );
    }

    #[test]
    fn test_from_path_known_extensions() {
        assert_eq!(ContentType::from_path("report.PDF").essence(), "application/pdf");
        assert_eq!(ContentType::from_path("/tmp/photo.jpeg").essence(), "image/jpeg");

        let notes = ContentType::from_path("notes.txt");
        assert_eq!(notes.essence(), "text/plain");
        assert_eq!(notes.charset(), Some("UTF-8"));
    }

    #[test]
    fn test_from_path_unknown_extension() {
        assert_eq!(
            ContentType::from_path("data.bin").essence(),
            "application/octet-stream"
        );
        assert_eq!(
            ContentType::from_path("Makefile").essence(),
            "application/octet-stream"
        );
    }
}
