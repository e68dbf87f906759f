//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 header encoding and
//! RFC 2231 parameter encoding.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum line length for Base64 and Quoted-Printable bodies.
const MAX_LINE_LENGTH: usize = 76;

/// Maximum line length for an unencoded (7bit) body, excluding CRLF.
const MAX_7BIT_LINE_LENGTH: usize = 998;

/// Maximum length of a single RFC 2047 encoded word.
const MAX_ENCODED_WORD_LENGTH: usize = 75;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64, folded into CRLF-separated lines of 76 characters.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);

    for (i, line) in encoded.as_bytes().chunks(MAX_LINE_LENGTH).enumerate() {
        if i > 0 {
            wrapped.push_str("\r\n");
        }
        wrapped.extend(line.iter().copied().map(char::from));
    }

    wrapped
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Returns true if text can travel as a `7bit` body without transformation.
#[must_use]
pub fn is_seven_bit_safe(text: &str) -> bool {
    text.is_ascii()
        && !text.contains('\0')
        && text.lines().all(|line| line.len() <= MAX_7BIT_LINE_LENGTH)
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks in the input are kept as hard CRLF breaks; long lines get
/// soft breaks so no encoded line exceeds 76 characters.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let mut result = String::with_capacity(normalized.len());
    let mut lines = normalized.split('\n').peekable();

    while let Some(line) = lines.next() {
        encode_quoted_printable_line(line.as_bytes(), &mut result);
        if lines.peek().is_some() {
            result.push_str("\r\n");
        }
    }

    result
}

fn encode_quoted_printable_line(line: &[u8], out: &mut String) {
    let mut line_length = 0;

    for (i, &byte) in line.iter().enumerate() {
        let is_last = i + 1 == line.len();
        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            // Whitespace at the end of a line must be encoded
            b' ' | b'\t' => !is_last,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // Leave room for the trailing '=' of a soft break
        if line_length + width > MAX_LINE_LENGTH - 1 {
            out.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "={byte:02X}");
        }
        line_length += width;
    }
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or the
/// decoded bytes are not UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    String::from_utf8(decode_quoted_printable_bytes(text)?).map_err(Into::into)
}

/// Decodes Quoted-Printable text into raw bytes.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable_bytes(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        let rest = &bytes[i + 1..];

        // Soft line break
        if rest.starts_with(b"\r\n") {
            i += 3;
            continue;
        }
        if rest.starts_with(b"\n") {
            i += 2;
            continue;
        }

        let hex = rest
            .get(..2)
            .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".to_string()))?;
        let hex = std::str::from_utf8(hex)
            .map_err(|_| Error::InvalidEncoding("Invalid escape sequence".to_string()))?;
        let value = u8::from_str_radix(hex, 16)
            .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
        result.push(value);
        i += 3;
    }

    Ok(result)
}

/// Returns true if a header value must be RFC 2047 encoded.
#[must_use]
pub fn needs_header_encoding(text: &str) -> bool {
    !text.is_ascii() || text.contains("=?")
}

/// Encodes a header value using RFC 2047 encoding.
///
/// Format: `=?charset?B?encoded-text?=`. Long values are split into
/// several encoded words on character boundaries and folded onto
/// continuation lines.
///
/// # Arguments
///
/// * `text` - Text to encode
/// * `charset` - Character set (e.g., "utf-8")
///
/// # Errors
///
/// Returns an error if the charset cannot be used in an encoded word.
pub fn encode_rfc2047(text: &str, charset: &str) -> Result<String> {
    if !needs_header_encoding(text) {
        return Ok(text.to_string());
    }
    encode_rfc2047_words(text, charset)
}

/// Encodes `text` as RFC 2047 encoded words even when it is plain ASCII.
///
/// Used for values that cannot otherwise be folded under the line limit.
///
/// # Errors
///
/// Returns an error if the charset cannot be used in an encoded word.
pub fn encode_rfc2047_words(text: &str, charset: &str) -> Result<String> {
    if charset.is_empty()
        || !charset.is_ascii()
        || charset.contains(|c: char| c == '?' || c.is_ascii_whitespace())
    {
        return Err(Error::InvalidEncoding(format!("Invalid charset: {charset}")));
    }

    // "=?" + charset + "?B?" + text + "?="
    let overhead = charset.len() + 7;
    let max_chunk = MAX_ENCODED_WORD_LENGTH.saturating_sub(overhead) / 4 * 3;
    if max_chunk < 4 {
        return Err(Error::InvalidEncoding(format!(
            "Charset name too long: {charset}"
        )));
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for ch in text.chars() {
        if !chunk.is_empty() && chunk.len() + ch.len_utf8() > max_chunk {
            words.push(format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes())));
    }

    Ok(words.join("\r\n "))
}

/// Decodes RFC 2047 encoded words inside a header value.
///
/// Whitespace between adjacent encoded words is dropped. Text that is not
/// an encoded word passes through unchanged.
///
/// # Errors
///
/// Returns an error if an encoded word has an unknown encoding or its
/// payload cannot be decoded.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    let mut previous_was_word = false;

    while !rest.is_empty() {
        let Some(start) = rest.find("=?") else {
            result.push_str(rest);
            break;
        };
        let (before, candidate) = rest.split_at(start);

        if let Some((decoded, consumed)) = decode_encoded_word(candidate)? {
            if !(previous_was_word && before.trim().is_empty()) {
                result.push_str(before);
            }
            result.push_str(&decoded);
            rest = &candidate[consumed..];
            previous_was_word = true;
        } else {
            result.push_str(before);
            result.push_str("=?");
            rest = &candidate[2..];
            previous_was_word = false;
        }
    }

    Ok(result)
}

/// Decodes one encoded word at the start of `text`.
///
/// Returns the decoded text and the number of bytes consumed, or `None`
/// if `text` does not start with a well-formed encoded word.
fn decode_encoded_word(text: &str) -> Result<Option<(String, usize)>> {
    let Some(inner) = text.strip_prefix("=?") else {
        return Ok(None);
    };
    let mut fields = inner.splitn(3, '?');
    let (Some(charset), Some(encoding), Some(tail)) = (fields.next(), fields.next(), fields.next())
    else {
        return Ok(None);
    };
    let Some(end) = tail.find("?=") else {
        return Ok(None);
    };
    let encoded_text = &tail[..end];
    if charset.is_empty() || encoded_text.contains(char::is_whitespace) {
        return Ok(None);
    }

    let decoded = match encoding {
        "B" | "b" => decode_base64(encoded_text)?,
        // Quoted-Printable with underscore for space
        "Q" | "q" => decode_quoted_printable_bytes(&encoded_text.replace('_', " "))?,
        other => {
            return Err(Error::InvalidEncoding(format!("Unknown encoding: {other}")));
        }
    };

    let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + end + 2;
    Ok(Some((String::from_utf8(decoded)?, consumed)))
}

/// Encodes a parameter value using RFC 2231 extended notation.
///
/// The result is meant for `name*=` parameters, e.g.
/// `filename*=utf-8''r%C3%A9sum%C3%A9.pdf`.
#[must_use]
pub fn encode_rfc2231(value: &str, charset: &str) -> String {
    let mut encoded = format!("{charset}''");
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}

/// Decodes an RFC 2231 extended parameter value (`charset'lang'value`).
///
/// # Errors
///
/// Returns an error if the value is malformed or not UTF-8.
pub fn decode_rfc2231(value: &str) -> Result<String> {
    let mut fields = value.splitn(3, '\'');
    let (Some(_charset), Some(_language), Some(encoded)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Err(Error::InvalidEncoding(format!(
            "Invalid RFC 2231 value: {value}"
        )));
    };

    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .ok_or_else(|| Error::InvalidEncoding("Incomplete percent escape".to_string()))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
            decoded.push(byte);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(decoded).map_err(Into::into)
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
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_wrapped_line_length() {
        let data = vec![0xAB_u8; 300];
        let wrapped = encode_base64_wrapped(&data);

        let lines: Vec<&str> = wrapped.split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.len() <= 76));
        assert_eq!(decode_base64(&lines.concat()).unwrap(), data);
    }

    #[test]
    fn test_base64_wrapped_empty() {
        assert_eq!(encode_base64_wrapped(b""), "");
    }

    #[test]
    fn test_seven_bit_safe() {
        assert!(is_seven_bit_safe("Hello,\r\nWorld!"));
        assert!(!is_seven_bit_safe("Héllo"));
        assert!(!is_seven_bit_safe(&"x".repeat(1000)));
    }

    #[test]
    fn test_quoted_printable_encode() {
        let text = "Hello, World!";
        let encoded = encode_quoted_printable(text);
        assert_eq!(encoded, "Hello, World!");

        let text = "Héllo, Wørld!";
        let encoded = encode_quoted_printable(text);
        assert!(encoded.contains("=C3"));
    }

    #[test]
    fn test_quoted_printable_keeps_line_breaks() {
        let encoded = encode_quoted_printable("first\nsecond\r\nthird");
        assert_eq!(encoded, "first\r\nsecond\r\nthird");
    }

    #[test]
    fn test_quoted_printable_trailing_whitespace() {
        let encoded = encode_quoted_printable("trailing \nnext");
        assert_eq!(encoded, "trailing=20\r\nnext");
    }

    #[test]
    fn test_quoted_printable_soft_breaks_long_lines() {
        let text = "é".repeat(60);
        let encoded = encode_quoted_printable(&text);

        assert!(encoded.lines().all(|line| line.len() <= 76));
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), text);
    }

    #[test]
    fn test_quoted_printable_decode() {
        let encoded = "Hello, World!";
        let decoded = decode_quoted_printable(encoded).unwrap();
        assert_eq!(decoded, "Hello, World!");

        let encoded = "H=C3=A9llo";
        let decoded = decode_quoted_printable(encoded).unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let encoded = "Hello=\r\nWorld";
        let decoded = decode_quoted_printable(encoded).unwrap();
        assert_eq!(decoded, "HelloWorld");
    }

    #[test]
    fn test_quoted_printable_incomplete_escape() {
        assert!(decode_quoted_printable("broken=4").is_err());
        assert!(decode_quoted_printable("broken=ZZ").is_err());
    }

    #[test]
    fn test_rfc2047_encode() {
        let text = "Hello";
        let encoded = encode_rfc2047(text, "utf-8").unwrap();
        assert_eq!(encoded, "Hello"); // No encoding needed

        let text = "Héllo";
        let encoded = encode_rfc2047(text, "utf-8").unwrap();
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn test_rfc2047_encode_splits_long_values() {
        let text = "Überraschung ".repeat(10);
        let encoded = encode_rfc2047(&text, "utf-8").unwrap();

        let words: Vec<&str> = encoded.split("\r\n ").collect();
        assert!(words.len() > 1);
        assert!(words.iter().all(|word| word.len() <= 75));
        assert_eq!(decode_rfc2047(&encoded).unwrap(), text);
    }

    #[test]
    fn test_rfc2047_words_force_ascii() {
        let text = "x".repeat(200);
        let encoded = encode_rfc2047_words(&text, "utf-8").unwrap();

        assert!(encoded.split("\r\n ").all(|word| word.len() <= 75));
        assert_eq!(decode_rfc2047(&encoded).unwrap(), text);
    }

    #[test]
    fn test_rfc2047_rejects_bad_charset() {
        assert!(encode_rfc2047("Héllo", "utf 8").is_err());
        assert!(encode_rfc2047("Héllo", "").is_err());
    }

    #[test]
    fn test_rfc2047_decode() {
        let encoded = "Hello";
        let decoded = decode_rfc2047(encoded).unwrap();
        assert_eq!(decoded, "Hello");

        let encoded = "=?utf-8?B?SMOpbGxv?=";
        let decoded = decode_rfc2047(encoded).unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_rfc2047_decode_mixed_text() {
        let decoded = decode_rfc2047("Re: =?utf-8?B?SMOpbGxv?= there").unwrap();
        assert_eq!(decoded, "Re: Héllo there");
    }

    #[test]
    fn test_rfc2047_quoted_printable() {
        let encoded = "=?utf-8?Q?H=C3=A9llo_there?=";
        let decoded = decode_rfc2047(encoded).unwrap();
        assert_eq!(decoded, "Héllo there");
    }

    #[test]
    fn test_rfc2047_unknown_encoding() {
        assert!(decode_rfc2047("=?utf-8?X?abc?=").is_err());
    }

    #[test]
    fn test_rfc2231_round_trip() {
        let encoded = encode_rfc2231("résumé 2024.pdf", "utf-8");
        assert_eq!(encoded, "utf-8''r%C3%A9sum%C3%A9%202024.pdf");
        assert_eq!(decode_rfc2231(&encoded).unwrap(), "résumé 2024.pdf");
    }

    #[test]
    fn test_rfc2231_malformed() {
        assert!(decode_rfc2231("no-quotes").is_err());
        assert!(decode_rfc2231("utf-8''bad%4").is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn quoted_printable_preserves_lines(text in "[^\r]{0,300}") {
                let encoded = encode_quoted_printable(&text);
                prop_assert!(encoded.split("\r\n").all(|line| line.len() <= 76));
                let decoded = decode_quoted_printable(&encoded).unwrap();
                prop_assert_eq!(decoded, text.replace('\n', "\r\n"));
            }

            #[test]
            fn rfc2047_words_stay_short(text in "\\PC{0,120}") {
                let encoded = encode_rfc2047(&text, "utf-8").unwrap();
                if needs_header_encoding(&text) {
                    prop_assert!(encoded.split("\r\n ").all(|word| word.len() <= 75));
                }
                prop_assert_eq!(decode_rfc2047(&encoded).unwrap(), text);
            }
        }
    }
}
