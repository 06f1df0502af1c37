//! Converter resolution
//!
//! The page copier never builds a converter itself. It asks the loader for
//! one at startup, and a bad configuration surfaces here as a [`LoadError`]
//! before any page is read.

use crate::converter::{HtmlToMarkdown, MarkdownConverter};
use crate::error::LoadError;
use crate::options::ConverterOptions;
use crate::rules::page_copy_rules;

/// Resolve the page-copy converter: validated options plus the code,
/// line-break and list overrides
pub fn load_converter(options: ConverterOptions) -> Result<Box<dyn HtmlToMarkdown>, LoadError> {
    options.validate()?;

    let mut converter = MarkdownConverter::with_options(options);
    for rule in page_copy_rules() {
        log::debug!("registering rule {}", rule.name());
        converter.add_rule(rule);
    }

    Ok(Box::new(converter))
}
