//! Character encoding detection and decoding
//!
//! Pages fetched over HTTP usually announce their charset in the
//! Content-Type header; saved pages and stdin input only carry it in a
//! `<meta>` tag, if at all. Detection follows a three-level cascade:
//!
//! 1. **Content-Type header** `charset` parameter
//! 2. **HTML meta tags**: `<meta charset>` or `<meta http-equiv="Content-Type">`
//!    within the first 1024 bytes
//! 3. **UTF-8** when neither is present
//!
//! ```rust
//! use fetchmd::charset::detect_charset;
//!
//! let label = detect_charset(Some("text/html; charset=ISO-8859-1"), b"<html></html>");
//! assert_eq!(label, "ISO-8859-1");
//!
//! let label = detect_charset(None, b"<html><body>No charset</body></html>");
//! assert_eq!(label, "UTF-8");
//! ```

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::error::ConversionError;

const DEFAULT_CHARSET: &str = "UTF-8";

/// Meta charset declarations must appear this early to be honoured
const META_SCAN_LIMIT: usize = 1024;

/// Detect the charset label for a page, uppercased
pub fn detect_charset(content_type: Option<&str>, html: &[u8]) -> String {
    declared_charset(content_type, html).unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

/// The charset the page announces itself, uppercased; `None` when undeclared
pub fn declared_charset(content_type: Option<&str>, html: &[u8]) -> Option<String> {
    content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_meta(html))
        .map(|label| label.to_uppercase())
}

/// Extract the `charset` parameter from a Content-Type header value
///
/// Accepts quoted values, missing spaces and trailing parameters:
///
/// ```rust
/// use fetchmd::charset::charset_from_content_type;
///
/// assert_eq!(charset_from_content_type("text/html;charset=\"utf-8\""), Some("utf-8".to_string()));
/// assert_eq!(charset_from_content_type("text/html"), None);
/// ```
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    static PARAM: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = PARAM
        .get_or_init(|| Regex::new(r#"(?i)charset\s*=\s*"?([^";,\s]+)"?"#).ok())
        .as_ref()?;

    regex
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract a charset declared by a `<meta>` tag near the top of the page
pub fn charset_from_meta(html: &[u8]) -> Option<String> {
    let prefix = String::from_utf8_lossy(&html[..html.len().min(META_SCAN_LIMIT)]);

    static HTML5: OnceLock<Option<Regex>> = OnceLock::new();
    static HTML4: OnceLock<Option<Regex>> = OnceLock::new();

    let patterns = [
        HTML5.get_or_init(|| Regex::new(r#"(?i)<meta\s+charset\s*=\s*"?([^";>\s]+)"?"#).ok()),
        HTML4.get_or_init(|| {
            Regex::new(
                r#"(?i)<meta\s+http-equiv\s*=\s*"?Content-Type"?\s+content\s*=\s*"?[^">]*charset\s*=\s*([^";>\s]+)"?"#,
            )
            .ok()
        }),
    ];

    patterns.iter().find_map(|pattern| {
        pattern
            .as_ref()?
            .captures(&prefix)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Decode page bytes to UTF-8 text using the detected charset
///
/// UTF-8 input is borrowed when valid. A page that declares its charset
/// must match it: malformed byte sequences are rejected rather than
/// replaced. A page that declares nothing is read as UTF-8 with invalid
/// sequences replaced by U+FFFD, as a browser would.
pub fn decode_html<'a>(
    html: &'a [u8],
    content_type: Option<&str>,
) -> Result<Cow<'a, str>, ConversionError> {
    let Some(label) = declared_charset(content_type, html) else {
        let text = String::from_utf8_lossy(html);
        if let Cow::Owned(_) = text {
            log::warn!("page declares no charset and is not valid UTF-8; invalid bytes replaced");
        }
        return Ok(text);
    };

    if label == DEFAULT_CHARSET || label == "UTF8" {
        return std::str::from_utf8(html).map(Cow::Borrowed).map_err(|e| {
            ConversionError::EncodingError(format!(
                "Invalid UTF-8 at byte position {}: {}",
                e.valid_up_to(),
                e
            ))
        });
    }

    let encoding = encoding_rs::Encoding::for_label(label.as_bytes()).ok_or_else(|| {
        ConversionError::EncodingError(format!("Unsupported charset '{}'", label))
    })?;

    log::debug!("transcoding page from {} to UTF-8", encoding.name());

    encoding
        .decode_without_bom_handling_and_without_replacement(html)
        .ok_or_else(|| {
            ConversionError::EncodingError(format!("Invalid byte sequence for charset '{}'", label))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_content_type_charset_variants() {
        for (header, expected) in [
            ("text/html; charset=UTF-8", Some("UTF-8")),
            ("text/html; charset=\"UTF-8\"", Some("UTF-8")),
            ("text/html;charset=windows-1252", Some("windows-1252")),
            ("text/html; CHARSET=iso-8859-1; boundary=x", Some("iso-8859-1")),
            ("text/html", None),
        ] {
            assert_eq!(
                charset_from_content_type(header).as_deref(),
                expected,
                "header: {header}"
            );
        }
    }

    #[test]
    fn test_meta_charset_html5_and_html4() {
        assert_eq!(
            charset_from_meta(b"<head><meta charset=\"shift_jis\"></head>").as_deref(),
            Some("shift_jis")
        );
        assert_eq!(
            charset_from_meta(
                b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=ISO-8859-1\">"
            )
            .as_deref(),
            Some("ISO-8859-1")
        );
        assert_eq!(charset_from_meta(b"<html><body>none</body></html>"), None);
    }

    #[test]
    fn test_meta_charset_beyond_scan_limit_is_ignored() {
        let mut html = vec![b' '; META_SCAN_LIMIT];
        html.extend_from_slice(b"<meta charset=\"ISO-8859-1\">");
        assert_eq!(charset_from_meta(&html), None);
    }

    #[test]
    fn test_header_takes_priority_over_meta() {
        let html = b"<meta charset=\"ISO-8859-1\"><p>x</p>";
        assert_eq!(detect_charset(Some("text/html; charset=utf-8"), html), "UTF-8");
        assert_eq!(detect_charset(None, html), "ISO-8859-1");
    }

    #[test]
    fn test_decode_latin1() {
        let decoded = decode_html(b"<p>Caf\xE9</p>", Some("text/html; charset=ISO-8859-1"))
            .expect("latin-1 decodes");
        assert_eq!(decoded, "<p>Café</p>");
    }

    #[test]
    fn test_decode_declared_utf8_rejects_invalid_bytes() {
        let result = decode_html(b"\xFF\xFE<p>x</p>", Some("text/html; charset=utf-8"));
        assert!(matches!(result, Err(ConversionError::EncodingError(_))));

        let result = decode_html(b"<meta charset=\"utf-8\"><p>\xFFx</p>", None);
        assert!(matches!(result, Err(ConversionError::EncodingError(_))));
    }

    #[test]
    fn test_decode_undeclared_stray_byte_is_replaced() {
        let decoded = decode_html(b"<p>caf\xE9 au lait</p>", None).expect("lenient decode");
        assert!(matches!(decoded, Cow::Owned(_)));
        assert_eq!(decoded, "<p>caf\u{FFFD} au lait</p>");
    }

    #[test]
    fn test_decode_unknown_label_is_encoding_error() {
        match decode_html(b"<p>x</p>", Some("text/html; charset=x-unknown-test")) {
            Err(ConversionError::EncodingError(msg)) => {
                assert!(msg.contains("Unsupported charset"))
            }
            other => panic!("expected EncodingError, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn prop_valid_utf8_is_borrowed_unchanged(text in "\\PC{0,200}") {
            let decoded = decode_html(text.as_bytes(), None).expect("utf-8 decodes");
            prop_assert!(matches!(decoded, Cow::Borrowed(_)));
            prop_assert_eq!(decoded.as_ref(), text.as_str());
        }
    }
}
