//! MIME header handling.

use crate::address::Mailbox;
use crate::encoding::{decode_rfc2047, encode_rfc2047, encode_rfc2047_words, needs_header_encoding};
use crate::error::{Error, Result};
use crate::params::split_unquoted;
use std::fmt::Write as _;

/// Headers whose values are mailbox lists.
const ADDRESS_HEADERS: &[&str] = &["from", "to", "cc", "bcc", "reply-to", "sender"];

/// Headers whose values are structured and must never be RFC 2047 encoded.
const STRUCTURED_HEADERS: &[&str] = &[
    "content-type",
    "content-disposition",
    "content-transfer-encoding",
    "mime-version",
    "message-id",
    "date",
];

/// Preferred maximum line length; longer lines are folded at whitespace.
const FOLD_WIDTH: usize = 78;

/// Hard line limit from RFC 5322, excluding the CRLF.
const MAX_LINE_LENGTH: usize = 998;

/// Header names whose conventional spelling is not plain title case.
const CANONICAL_NAMES: &[(&str, &str)] = &[
    ("mime-version", "MIME-Version"),
    ("message-id", "Message-ID"),
    ("content-id", "Content-ID"),
];

/// Ordered collection of email headers.
///
/// Names are matched case-insensitively; insertion order is kept so the
/// serialized message lists headers in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into().to_lowercase(), value.into()));
    }

    /// Sets a header value, replacing any existing values.
    ///
    /// The header keeps the position of its first occurrence.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        let value = value.into();

        match self.headers.iter().position(|(n, _)| *n == name) {
            Some(first) => {
                self.headers[first].1 = value;
                let mut index = 0;
                self.headers.retain(|(n, _)| {
                    let keep = index <= first || *n != name;
                    index += 1;
                    keep
                });
            }
            None => self.headers.push((name, value)),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses headers from raw text.
    ///
    /// Headers are in the format:
    /// ```text
    /// Header-Name: value
    /// Continuation: line
    /// ```
    /// Parsing stops at the first empty line. Values are kept as they
    /// appear on the wire.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            // Continuation line (starts with space or tab)
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value);
            }

            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.trim().to_string(), value.trim().to_string()));
            }
        }

        if let Some((name, value)) = current {
            headers.add(name, value);
        }

        headers
    }

    /// Rejects header values that could inject extra header lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the value contains a CR or LF.
    pub fn check_value(name: &str, value: &str) -> Result<()> {
        if value.contains(['\r', '\n']) {
            return Err(Error::InvalidHeader(format!(
                "{name} header cannot contain line breaks"
            )));
        }
        Ok(())
    }

    /// Encodes a header value using RFC 2047 if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_value(value: &str) -> Result<String> {
        encode_rfc2047(value, "utf-8")
    }

    /// Decodes a header value from RFC 2047 if encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_value(value: &str) -> Result<String> {
        decode_rfc2047(value)
    }

    /// Serializes the headers as CRLF-terminated lines.
    ///
    /// Unstructured values with non-ASCII text are RFC 2047 encoded, and
    /// address headers get their display names encoded. Lines longer than
    /// 78 characters are folded at whitespace; an unstructured word too long
    /// to fit the 998 character limit is sent as encoded words instead.
    ///
    /// # Errors
    ///
    /// Returns an error if a value contains a line break or cannot be
    /// encoded.
    pub fn to_wire(&self) -> Result<String> {
        let mut out = String::new();

        for (name, value) in &self.headers {
            Self::check_value(name, value)?;

            let canonical = canonical_name(name);
            let encoded = if STRUCTURED_HEADERS.contains(&name.as_str()) {
                value.clone()
            } else if ADDRESS_HEADERS.contains(&name.as_str()) {
                if needs_header_encoding(value) || has_overlong_word(&canonical, value) {
                    encode_mailbox_list(value)?
                } else {
                    value.clone()
                }
            } else if has_overlong_word(&canonical, value) {
                encode_rfc2047_words(value, "utf-8")?
            } else {
                Self::encode_value(value)?
            };

            let _ = write!(out, "{}\r\n", fold(&canonical, &encoded));
        }

        Ok(out)
    }
}

/// True if some word of `value` cannot fit on one line even after folding.
fn has_overlong_word(name: &str, value: &str) -> bool {
    value
        .split([' ', '\t'])
        .any(|word| name.len() + 2 + word.len() > MAX_LINE_LENGTH)
}

/// Folds `name: value` into lines of at most [`FOLD_WIDTH`] characters
/// where whitespace allows. Values that already carry folds pass through.
fn fold(name: &str, value: &str) -> String {
    let line = format!("{name}: {value}");
    if line.len() <= FOLD_WIDTH || value.contains('\r') {
        return line;
    }

    let mut out = String::with_capacity(line.len() + line.len() / FOLD_WIDTH * 3);
    let mut width = 0;
    let mut start = 0;

    // Never break between the name and the first word of the value
    let breaks = line
        .char_indices()
        .filter(|&(i, c)| i > name.len() + 1 && (c == ' ' || c == '\t'))
        .map(|(i, _)| i)
        .chain(std::iter::once(line.len()));

    for end in breaks {
        let piece = &line[start..end];
        // A continuation line must carry more than whitespace
        if width > 0 && width + piece.len() > FOLD_WIDTH && !piece.trim().is_empty() {
            out.push_str("\r\n");
            width = 0;
        }
        out.push_str(piece);
        width += piece.len();
        start = end;
    }

    out
}

fn encode_mailbox_list(value: &str) -> Result<String> {
    let mailboxes = split_unquoted(value, ',')
        .into_iter()
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| Mailbox::parse(entry)?.to_header_value())
        .collect::<Result<Vec<_>>>()?;
    Ok(mailboxes.join(", "))
}

/// Capitalizes a header name (e.g., "content-type" -> "Content-Type").
fn canonical_name(name: &str) -> String {
    if let Some((_, canonical)) = CANONICAL_NAMES.iter().find(|(lower, _)| *lower == name) {
        return (*canonical).to_string();
    }

    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_set() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("Subject", "Hi");
        headers.add("To", "bob@example.com");
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("To", "charlie@example.com");
        assert_eq!(headers.get_all("To"), vec!["charlie@example.com"]);
        assert_eq!(
            headers.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            vec!["to", "subject"]
        );
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        assert!(headers.get("Subject").is_some());

        headers.remove("Subject");
        assert!(headers.get("Subject").is_none());
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Ignored: body\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("recipient@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(headers.get("Ignored"), None);
    }

    #[test]
    fn test_headers_to_wire_order_and_names() {
        let mut headers = Headers::new();
        headers.add("from", "sender@example.com");
        headers.add("to", "recipient@example.com");
        headers.add("mime-version", "1.0");
        headers.add("message-id", "<abc@example.com>");

        assert_eq!(
            headers.to_wire().unwrap(),
            concat!(
                "From: sender@example.com\r\n",
                "To: recipient@example.com\r\n",
                "MIME-Version: 1.0\r\n",
                "Message-ID: <abc@example.com>\r\n",
            )
        );
    }

    #[test]
    fn test_headers_to_wire_encodes_subject() {
        let mut headers = Headers::new();
        headers.add("subject", "Grüße");

        let wire = headers.to_wire().unwrap();
        let parsed = Headers::parse(&wire);
        let subject = parsed.get("subject").unwrap();
        assert!(subject.starts_with("=?utf-8?B?"));
        assert_eq!(Headers::decode_value(subject).unwrap(), "Grüße");
    }

    #[test]
    fn test_headers_to_wire_encodes_display_name() {
        let mut headers = Headers::new();
        headers.add("from", "Zoë <zoe@example.com>");

        let wire = headers.to_wire().unwrap();
        assert!(wire.starts_with("From: =?utf-8?B?"));
        assert!(wire.ends_with(" <zoe@example.com>\r\n"));
    }

    #[test]
    fn test_headers_to_wire_folds_long_values() {
        let subject = "word ".repeat(300).trim_end().to_string();
        let mut headers = Headers::new();
        headers.add("subject", subject.as_str());

        let wire = headers.to_wire().unwrap();
        let lines: Vec<&str> = wire.trim_end_matches("\r\n").split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.len() <= 78));
        assert!(lines[1..].iter().all(|line| line.starts_with(' ')));
        assert_eq!(Headers::parse(&wire).get("subject"), Some(subject.as_str()));
    }

    #[test]
    fn test_headers_to_wire_encodes_unbreakable_values() {
        let subject = "x".repeat(1500);
        let mut headers = Headers::new();
        headers.add("subject", subject.as_str());

        let wire = headers.to_wire().unwrap();
        assert!(wire.split("\r\n").all(|line| line.len() <= 998));

        let parsed = Headers::parse(&wire);
        let value = parsed.get("subject").unwrap();
        assert!(value.starts_with("=?utf-8?B?"));
        assert_eq!(Headers::decode_value(value).unwrap(), subject);
    }

    #[test]
    fn test_headers_to_wire_folds_address_list() {
        let to = (0..20)
            .map(|i| format!("user{i}@example.com"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut headers = Headers::new();
        headers.add("to", to.as_str());

        let wire = headers.to_wire().unwrap();
        assert!(wire.split("\r\n").all(|line| line.len() <= 78));
        assert_eq!(Headers::parse(&wire).get("to"), Some(to.as_str()));
    }

    #[test]
    fn test_headers_to_wire_rejects_injection() {
        let mut headers = Headers::new();
        headers.add("subject", "Hello\r\nBcc: victim@example.com");
        assert!(matches!(headers.to_wire(), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_headers_iter() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("To", "recipient@example.com");

        let mut count = 0;
        for (name, value) in headers.iter() {
            assert!(!name.is_empty());
            assert!(!value.is_empty());
            count += 1;
        }
        assert_eq!(count, 2);
    }
}
