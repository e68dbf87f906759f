//! Header parameter lists (`; key=value; ...`) shared by `Content-Type`
//! and `Content-Disposition`.

use crate::encoding::{decode_rfc2231, encode_rfc2231};
use std::fmt;

/// Characters that force a parameter value to be quoted (RFC 2045 tspecials).
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

/// Longest `key=value` rendered on one line before RFC 2231 continuations
/// are used.
const MAX_PARAMETER_LENGTH: usize = 76;

/// Length of each encoded continuation section.
const SECTION_LENGTH: usize = 60;

/// Ordered, case-insensitive parameter list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameters(Vec<(String, String)>);

impl Parameters {
    /// Gets a parameter value by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Sets a parameter, replacing an existing value with the same name.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into().to_lowercase();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Returns true if no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses the parameter section following the first `;` of a header.
    ///
    /// Quoted values may contain `;`. Extended `name*=` values and RFC 2231
    /// continuations (`name*0*=`, `name*1*=`, ...) are decoded and stored
    /// under `name`. Malformed entries are ignored.
    pub fn parse(text: &str) -> Self {
        let mut params = Self::default();
        let mut sections: Vec<(String, u32, bool, String)> = Vec::new();

        for raw in split_unquoted(text, ';') {
            let Some((key, value)) = raw.split_once('=') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if let Some((base, index, extended)) = continuation(&key) {
                if params.get(base).is_none() {
                    // Reserve the position of the first section
                    params.set(base, "");
                }
                sections.push((base.to_string(), index, extended, value.to_string()));
            } else if let Some(base) = key.strip_suffix('*') {
                if let Ok(decoded) = decode_rfc2231(value.trim_matches('"')) {
                    params.set(base, decoded);
                }
            } else if !key.is_empty() {
                params.set(key, unquote(value));
            }
        }

        sections.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        let mut rest = sections.as_slice();
        while let Some((base, _, extended, _)) = rest.first() {
            let count = rest.iter().take_while(|s| s.0 == *base).count();
            let joined: String = rest[..count]
                .iter()
                .map(|(_, _, ext, value)| {
                    if *ext { value.trim_matches('"').to_string() } else { unquote(value) }
                })
                .collect();

            if *extended {
                match decode_rfc2231(&joined) {
                    Ok(decoded) => params.set(base.as_str(), decoded),
                    Err(_) => params.remove(base),
                }
            } else {
                params.set(base.as_str(), joined);
            }
            rest = &rest[count..];
        }

        params
    }

    fn remove(&mut self, key: &str) {
        self.0.retain(|(k, _)| k != key);
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.0 {
            let rendered = if !value.is_ascii() {
                format!("{key}*={}", encode_rfc2231(value, "utf-8"))
            } else if value.is_empty()
                || value.contains(|c: char| c.is_ascii_whitespace() || TSPECIALS.contains(c))
            {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                format!("{key}=\"{escaped}\"")
            } else {
                format!("{key}={value}")
            };

            if rendered.len() <= MAX_PARAMETER_LENGTH {
                write!(f, "; {rendered}")?;
                continue;
            }

            let encoded = encode_rfc2231(value, "utf-8");
            for (index, section) in sections(&encoded).into_iter().enumerate() {
                write!(f, "; {key}*{index}*={section}")?;
            }
        }
        Ok(())
    }
}

/// Splits `key*N` or `key*N*` into its base name, section number and
/// whether the section is percent-encoded.
fn continuation(key: &str) -> Option<(&str, u32, bool)> {
    let (base, rest) = key.split_once('*')?;
    let (digits, extended) = rest.strip_suffix('*').map_or((rest, false), |d| (d, true));
    let index = digits.parse().ok()?;
    (!base.is_empty()).then_some((base, index, extended))
}

/// Cuts an RFC 2231 encoded value into sections without splitting a `%XX`
/// escape.
fn sections(encoded: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut start = 0;

    while start < encoded.len() {
        let mut end = (start + SECTION_LENGTH).min(encoded.len());
        if end < encoded.len()
            && let Some(offset) = encoded[end - 2..end].rfind('%')
        {
            end = end - 2 + offset;
        }
        sections.push(&encoded[start..end]);
        start = end;
    }

    sections
}

/// Splits `text` on `separator`, ignoring separators inside double quotes.
pub fn split_unquoted(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                pieces.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&text[start..]);

    pieces
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else {
                    out.push(c);
                }
            }
            out
        }
        None => value.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_semicolon() {
        let params = Parameters::parse(" filename=\"a;b.txt\"; size=10");
        assert_eq!(params.get("filename"), Some("a;b.txt"));
        assert_eq!(params.get("SIZE"), Some("10"));
    }

    #[test]
    fn test_parse_extended_value() {
        let params = Parameters::parse("filename*=utf-8''r%C3%A9sum%C3%A9.pdf");
        assert_eq!(params.get("filename"), Some("résumé.pdf"));
    }

    #[test]
    fn test_display_quotes_and_escapes() {
        let mut params = Parameters::default();
        params.set("name", "my \"file\".txt");
        params.set("charset", "UTF-8");
        assert_eq!(
            params.to_string(),
            "; name=\"my \\\"file\\\".txt\"; charset=UTF-8"
        );
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let mut params = Parameters::default();
        params.set("filename", "résumé; final.pdf");
        params.set("name", "report (1).pdf");

        let parsed = Parameters::parse(&params.to_string());
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_parse_continuations() {
        let params = Parameters::parse(
            "; name*1*=%C3%A9.pdf; name*0*=utf-8''r%C3%A9sum; title*0=\"part \"; title*1=two",
        );
        assert_eq!(params.get("name"), Some("résumé.pdf"));
        assert_eq!(params.get("title"), Some("part two"));
    }

    #[test]
    fn test_long_value_uses_continuations() {
        let name = format!("{}-ü.pdf", "quarterly-report".repeat(10));
        let mut params = Parameters::default();
        params.set("filename", name.as_str());

        let rendered = params.to_string();
        assert!(rendered.starts_with("; filename*0*=utf-8''"));
        assert!(rendered.split("; ").all(|section| section.len() <= 76));
        assert_eq!(Parameters::parse(&rendered).get("filename"), Some(name.as_str()));
    }

    #[test]
    fn test_sections_keep_escapes_whole() {
        let encoded = encode_rfc2231(&"é".repeat(40), "utf-8");
        let sections = sections(&encoded);
        assert!(sections.len() > 1);
        assert!(sections.iter().skip(1).all(|section| section.starts_with('%')));
        assert_eq!(sections.concat(), encoded);
    }

    #[test]
    fn test_set_replaces() {
        let mut params = Parameters::default();
        params.set("Charset", "us-ascii");
        params.set("charset", "utf-8");
        assert_eq!(params.iter().count(), 1);
        assert_eq!(params.get("charset"), Some("utf-8"));
    }
}
