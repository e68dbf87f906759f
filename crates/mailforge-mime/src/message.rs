//! MIME message structure and serialization.

use crate::content_type::ContentType;
use crate::disposition::{ContentDisposition, DispositionKind};
use crate::encoding::{
    decode_base64, decode_quoted_printable_bytes, encode_base64_wrapped, encode_quoted_printable,
    is_seven_bit_safe,
};
use crate::error::{Error, Result};
use crate::header::Headers;
use chrono::{DateTime, TimeZone};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt;
use std::path::Path;

/// Length of the random component in boundaries and message IDs.
const RANDOM_TOKEN_LENGTH: usize = 24;

/// Transfer encodings used for generated parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII, sent as is.
    SevenBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    ///
    /// Identity encodings (`7bit`, `8bit`, `binary`) and unknown values map
    /// to [`TransferEncoding::SevenBit`], whose body is used unchanged.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::SevenBit,
        }
    }

    /// Picks the encoding for a text body: `7bit` when the text is short-lined
    /// ASCII, `quoted-printable` otherwise.
    #[must_use]
    pub fn for_text(text: &str) -> Self {
        if is_seven_bit_safe(text) {
            Self::SevenBit
        } else {
            Self::QuotedPrintable
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Generates a random multipart boundary.
#[must_use]
pub fn generate_boundary() -> String {
    format!("=_mailforge_{}", random_token())
}

/// Generates a `Message-ID` value (including angle brackets) for `domain`.
#[must_use]
pub fn generate_message_id(domain: &str) -> String {
    format!(
        "<{}.{}@{domain}>",
        chrono::Utc::now().timestamp_millis(),
        random_token()
    )
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// MIME message part.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body (raw bytes, transfer-encoded).
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    /// Creates a text part, choosing a transfer encoding for the content.
    #[must_use]
    pub fn text(content: &str, content_type: &ContentType) -> Self {
        let encoding = TransferEncoding::for_text(content);
        let body = match encoding {
            TransferEncoding::QuotedPrintable => encode_quoted_printable(content),
            _ => content.replace("\r\n", "\n").replace('\n', "\r\n"),
        };

        let mut headers = Headers::new();
        headers.add("content-type", content_type.to_string());
        headers.add("content-transfer-encoding", encoding.to_string());
        Self::new(headers, body.into_bytes())
    }

    /// Creates a Base64-encoded attachment part.
    #[must_use]
    pub fn attachment(filename: &str, content_type: ContentType, data: &[u8]) -> Self {
        let content_type = content_type.with_parameter("name", filename);

        let mut headers = Headers::new();
        headers.add("content-type", content_type.to_string());
        headers.add(
            "content-disposition",
            ContentDisposition::attachment(filename).to_string(),
        );
        headers.add(
            "content-transfer-encoding",
            TransferEncoding::Base64.to_string(),
        );
        Self::new(headers, encode_base64_wrapped(data).into_bytes())
    }

    /// Creates an attachment part from a file on disk.
    ///
    /// The content type is inferred from the file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>, filename: &str) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        Ok(Self::attachment(filename, ContentType::from_path(path), &data))
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Gets the content disposition, if the part declares one.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Checks if this part is an attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.disposition()
            .is_some_and(|d| d.kind == DispositionKind::Attachment)
    }

    /// Gets the attachment file name from `Content-Disposition`, falling back
    /// to the `name` parameter of `Content-Type`.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.disposition()
            .and_then(|d| d.filename().map(str::to_string))
            .or_else(|| {
                self.content_type()
                    .ok()
                    .and_then(|ct| ct.name().map(str::to_string))
            })
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        decode_with(self.transfer_encoding(), &self.body)
    }

    /// Gets the decoded body as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or UTF-8 conversion fails.
    pub fn body_text(&self) -> Result<String> {
        let decoded = self.decode_body()?;
        String::from_utf8(decoded).map_err(Into::into)
    }
}

fn decode_with(encoding: TransferEncoding, body: &[u8]) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => {
            let body_str = String::from_utf8_lossy(body);
            // Remove whitespace for lenient parsing
            let cleaned: String = body_str.chars().filter(|c| !c.is_whitespace()).collect();
            decode_base64(&cleaned)
        }
        TransferEncoding::QuotedPrintable => {
            decode_quoted_printable_bytes(&String::from_utf8_lossy(body))
        }
        TransferEncoding::SevenBit => Ok(body.to_vec()),
    }
}

/// Multipart MIME message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    /// Message parts, in order.
    pub parts: Vec<Part>,
}

impl Message {
    /// Creates a multipart message.
    ///
    /// `headers` must carry a multipart `Content-Type` with a boundary for
    /// the message to serialize.
    #[must_use]
    pub const fn multipart(headers: Headers, parts: Vec<Part>) -> Self {
        Self { headers, parts }
    }

    /// Creates an empty `multipart/mixed` message with a fresh boundary.
    #[must_use]
    pub fn mixed(mut headers: Headers) -> Self {
        headers.set("mime-version", "1.0");
        headers.set(
            "content-type",
            ContentType::multipart_mixed(generate_boundary()).to_string(),
        );
        Self::multipart(headers, Vec::new())
    }

    /// Appends a part.
    pub fn push_part(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// Stamps the `Date` header in RFC 2822 format.
    pub fn set_date<Tz: TimeZone>(&mut self, date: &DateTime<Tz>)
    where
        Tz::Offset: fmt::Display,
    {
        self.headers.set("date", date.to_rfc2822());
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Checks if this is a multipart message.
    ///
    /// # Errors
    ///
    /// Returns an error if content type cannot be determined.
    pub fn is_multipart(&self) -> Result<bool> {
        Ok(self.content_type()?.is_multipart())
    }

    /// Gets the From header.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.headers.get("from")
    }

    /// Gets the To header.
    #[must_use]
    pub fn to(&self) -> Option<&str> {
        self.headers.get("to")
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Gets the Date header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.headers.get("date")
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("message-id")
    }

    /// Finds the first text/plain part in a multipart message.
    ///
    /// # Errors
    ///
    /// Returns an error if no text part is found or decoding fails.
    pub fn text_part(&self) -> Result<String> {
        self.find_text_part("plain")
    }

    /// Finds the first text/html part in a multipart message.
    ///
    /// # Errors
    ///
    /// Returns an error if no HTML part is found or decoding fails.
    pub fn html_part(&self) -> Result<String> {
        self.find_text_part("html")
    }

    fn find_text_part(&self, sub_type: &str) -> Result<String> {
        for part in self.parts.iter().filter(|p| !p.is_attachment()) {
            let ct = part.content_type()?;
            if ct.is_text() && ct.sub_type == sub_type {
                return part.body_text();
            }
        }

        Err(Error::InvalidMultipart(format!(
            "No text/{sub_type} part found"
        )))
    }

    /// Returns the attachment parts in order.
    pub fn attachments(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| p.is_attachment())
    }

    /// Serializes the message as RFC 5322 bytes with CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns an error if a header cannot be encoded or the message has
    /// no boundary.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = self.headers.to_wire()?.into_bytes();
        out.extend_from_slice(b"\r\n");

        let content_type = self.content_type()?;
        let boundary = content_type
            .boundary()
            .ok_or_else(|| Error::InvalidMultipart("Missing boundary".to_string()))?;

        for part in &self.parts {
            out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            out.extend_from_slice(part.headers.to_wire()?.as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&part.body);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Ok(out)
    }
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
    use chrono::FixedOffset;

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("base64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("8bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("binary"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_transfer_encoding_for_text() {
        assert_eq!(TransferEncoding::for_text("Hi"), TransferEncoding::SevenBit);
        assert_eq!(
            TransferEncoding::for_text("Grüße"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_generate_boundary_unique() {
        let a = generate_boundary();
        let b = generate_boundary();
        assert_ne!(a, b);
        assert!(a.starts_with("=_mailforge_"));
    }

    #[test]
    fn test_generate_message_id() {
        let id = generate_message_id("mail.example.com");
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@mail.example.com>"));
    }

    #[test]
    fn test_part_text_ascii() {
        let part = Part::text("line one\nline two", &ContentType::text_plain());
        assert_eq!(part.transfer_encoding(), TransferEncoding::SevenBit);
        assert_eq!(part.body, b"line one\r\nline two");
        assert_eq!(part.body_text().unwrap(), "line one\r\nline two");
    }

    #[test]
    fn test_part_text_non_ascii() {
        let part = Part::text("<p>Grüße</p>", &ContentType::text_html());
        assert_eq!(part.transfer_encoding(), TransferEncoding::QuotedPrintable);
        assert_eq!(
            part.headers.get("content-type"),
            Some("text/html; charset=UTF-8")
        );
        assert_eq!(part.body_text().unwrap(), "<p>Grüße</p>");
    }

    #[test]
    fn test_part_attachment() {
        let part = Part::attachment("report.pdf", ContentType::octet_stream(), b"%PDF-1.4");

        assert!(part.is_attachment());
        assert_eq!(part.filename().as_deref(), Some("report.pdf"));
        assert_eq!(part.transfer_encoding(), TransferEncoding::Base64);
        assert_eq!(
            part.content_type().unwrap().essence(),
            "application/octet-stream"
        );
        assert_eq!(part.decode_body().unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn test_part_from_missing_file() {
        let result = Part::from_file("/definitely/not/here.txt", "here.txt");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_part_filename_from_content_type() {
        let mut headers = Headers::new();
        headers.add("content-type", "image/png; name=\"logo.png\"");
        let part = Part::new(headers, Vec::new());
        assert_eq!(part.filename().as_deref(), Some("logo.png"));
        assert!(!part.is_attachment());
    }

    #[test]
    fn test_message_mixed_serialization() {
        let mut headers = Headers::new();
        headers.add("from", "sender@example.com");
        let mut message = Message::mixed(headers);
        message.push_part(Part::text("Body", &ContentType::text_plain()));
        message.push_part(Part::attachment(
            "a.bin",
            ContentType::octet_stream(),
            b"\x00\x01",
        ));

        assert!(message.is_multipart().unwrap());
        let boundary = message.content_type().unwrap().boundary().unwrap().to_string();
        let wire = String::from_utf8(message.to_bytes().unwrap()).unwrap();

        assert!(wire.contains("MIME-Version: 1.0\r\n"));
        assert_eq!(wire.matches(&format!("--{boundary}\r\n")).count(), 2);
        assert!(wire.ends_with(&format!("--{boundary}--\r\n")));
        assert!(wire.contains("Content-Disposition: attachment; filename=a.bin\r\n"));
        assert_eq!(message.attachments().count(), 1);
        assert_eq!(message.text_part().unwrap(), "Body");
    }

    #[test]
    fn test_message_without_boundary_fails() {
        let mut headers = Headers::new();
        headers.add("content-type", "multipart/mixed");
        let message = Message::multipart(
            headers,
            vec![Part::text("x", &ContentType::text_plain())],
        );
        assert!(matches!(
            message.to_bytes(),
            Err(Error::InvalidMultipart(_))
        ));
    }

    #[test]
    fn test_message_set_date() {
        let mut message = Message::mixed(Headers::new());
        let date = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 0)
            .unwrap();
        message.set_date(&date);

        let stamped = message.date().unwrap();
        assert!(stamped.starts_with("Fri, "));
        assert_eq!(DateTime::parse_from_rfc2822(stamped).unwrap(), date);
    }

    #[test]
    fn test_message_multipart() {
        let mut headers = Headers::new();
        headers.add("content-type", "multipart/mixed; boundary=abc123");

        let mut part1_headers = Headers::new();
        part1_headers.add("content-type", "text/plain");
        let part1 = Part::new(part1_headers, b"Part 1".to_vec());

        let mut part2_headers = Headers::new();
        part2_headers.add("content-type", "text/html");
        let part2 = Part::new(part2_headers, b"<b>Part 2</b>".to_vec());

        let message = Message::multipart(headers, vec![part1, part2]);

        assert!(message.is_multipart().unwrap());
        assert_eq!(message.parts.len(), 2);
        assert_eq!(message.html_part().unwrap(), "<b>Part 2</b>");
        assert!(message.text_part().is_err());
    }
}
