//! HTML5 parsing using html5ever
//!
//! html5ever implements the WHATWG parsing algorithm, so the tree it builds
//! for broken markup is the same tree a browser would build. That matters
//! here: the content selector runs the same queries a page script would run
//! against the live document, and the results only line up when the trees
//! agree.
//!
//! Scripting is disabled; `<noscript>` content is therefore parsed as
//! markup, and the converter drops it.
//!
//! ```rust
//! use fetchmd::parser::parse_html;
//!
//! let dom = parse_html(b"<html><body><h1>Hello").expect("parser recovers");
//! ```

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::RcDom;

use crate::charset::decode_html;
use crate::error::ConversionError;

/// Parse page bytes into a DOM tree, honouring the page charset
///
/// `content_type` is the Content-Type header the page was served with, if
/// any. See [`crate::charset`] for the detection cascade.
///
/// # Errors
///
/// - `ConversionError::InvalidInput` for empty input
/// - `ConversionError::EncodingError` when the bytes are not valid for the
///   declared charset or the charset is unknown
pub fn parse_html_with_charset(
    html: &[u8],
    content_type: Option<&str>,
) -> Result<RcDom, ConversionError> {
    if html.is_empty() {
        return Err(ConversionError::InvalidInput("HTML input is empty".to_string()));
    }

    let text = decode_html(html, content_type)?;

    Ok(parse_document(RcDom::default(), Default::default()).one(text.as_ref()))
}

/// Parse page bytes with no Content-Type header
pub fn parse_html(html: &[u8]) -> Result<RcDom, ConversionError> {
    parse_html_with_charset(html, None)
}
