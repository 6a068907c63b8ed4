//! XML Entity Decoding and Escaping
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Uses Cow for zero-copy when no entities are present.

use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Unknown named entities are kept verbatim; no DTD is ever consulted.
#[inline]
pub fn decode_text(input: &str) -> Cow<'_, str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

fn decode_entities(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = memchr(b'&', rest.as_bytes()) {
        result.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match memchr(b';', rest.as_bytes()) {
            Some(semi) => {
                let entity = &rest[1..semi];
                match decode_entity(entity) {
                    Some(c) => {
                        result.push(c);
                        rest = &rest[semi + 1..];
                    }
                    None => {
                        result.push('&');
                        rest = &rest[1..];
                    }
                }
            }
            None => {
                result.push('&');
                rest = &rest[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Escape character data for serialization
pub fn escape_text(input: &str) -> Cow<'_, str> {
    if memchr3(b'<', b'>', b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escape an attribute value for serialization inside double quotes
pub fn escape_attr(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    if memchr3(b'<', b'&', b'"', bytes).is_none() && memchr(b'\n', bytes).is_none() {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities_borrows() {
        assert!(matches!(decode_text("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_builtin_and_numeric() {
        assert_eq!(decode_text("a &lt; b &amp;&amp; c &#65;&#x42;"), "a < b && c AB");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(decode_text("&nbsp; &"), "&nbsp; &");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape_text("1 < 2 & 3"), "1 &lt; 2 &amp; 3");
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }
}
