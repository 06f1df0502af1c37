//! Converter style options
//!
//! The defaults are the style the tool has always produced: ATX headings,
//! `---` rules, `-` bullets, fenced code blocks and `*` emphasis.

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Heading syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingStyle {
    /// `# Heading`
    Atx,
    /// `Heading` underlined with `=` or `-` (levels 1-2; deeper levels fall back to ATX)
    Setext,
}

/// Code block syntax used by the built-in `pre > code` rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeBlockStyle {
    Fenced,
    Indented,
}

/// Conversion options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterOptions {
    pub heading_style: HeadingStyle,
    /// Horizontal rule token
    pub hr: String,
    pub bullet_list_marker: char,
    pub code_block_style: CodeBlockStyle,
    /// Fence token for fenced code blocks
    pub fence: String,
    pub em_delimiter: String,
    pub strong_delimiter: String,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Atx,
            hr: "---".to_string(),
            bullet_list_marker: '-',
            code_block_style: CodeBlockStyle::Fenced,
            fence: "```".to_string(),
            em_delimiter: "*".to_string(),
            strong_delimiter: "**".to_string(),
        }
    }
}

impl ConverterOptions {
    /// Reject option values that would produce something other than the
    /// Markdown construct they are meant to produce
    pub fn validate(&self) -> Result<(), LoadError> {
        if !matches!(self.bullet_list_marker, '-' | '+' | '*') {
            return Err(invalid("bullet_list_marker", self.bullet_list_marker.to_string()));
        }
        if !matches!(self.em_delimiter.as_str(), "*" | "_") {
            return Err(invalid("em_delimiter", self.em_delimiter.clone()));
        }
        if !matches!(self.strong_delimiter.as_str(), "**" | "__") {
            return Err(invalid("strong_delimiter", self.strong_delimiter.clone()));
        }
        if !is_thematic_break(&self.hr) {
            return Err(invalid("hr", self.hr.clone()));
        }
        if !is_fence(&self.fence) {
            return Err(invalid("fence", self.fence.clone()));
        }
        Ok(())
    }
}

fn invalid(option: &'static str, value: String) -> LoadError {
    LoadError::InvalidOption { option, value }
}

/// Three or more of one of `-`, `*`, `_`, optionally separated by spaces
fn is_thematic_break(token: &str) -> bool {
    let mut marks = token.chars().filter(|c| *c != ' ');
    let Some(first) = marks.next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_')
        && marks.clone().all(|c| c == first)
        && marks.count() >= 2
}

/// Three or more backticks, or three or more tildes
fn is_fence(token: &str) -> bool {
    token.len() >= 3 && (token.chars().all(|c| c == '`') || token.chars().all(|c| c == '~'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = ConverterOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.heading_style, HeadingStyle::Atx);
        assert_eq!(options.hr, "---");
        assert_eq!(options.bullet_list_marker, '-');
        assert_eq!(options.code_block_style, CodeBlockStyle::Fenced);
        assert_eq!(options.em_delimiter, "*");
    }

    #[test]
    fn test_thematic_break_tokens() {
        for ok in ["---", "***", "___", "- - -", "*****"] {
            assert!(is_thematic_break(ok), "{ok} should be accepted");
        }
        for bad in ["", "--", "-*-", "===", "ab"] {
            assert!(!is_thematic_break(bad), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_fence_tokens() {
        assert!(is_fence("```"));
        assert!(is_fence("~~~~"));
        assert!(!is_fence("``"));
        assert!(!is_fence("`~`"));
    }

    #[test]
    fn test_invalid_bullet_is_rejected() {
        let options = ConverterOptions {
            bullet_list_marker: '#',
            ..Default::default()
        };
        match options.validate() {
            Err(LoadError::InvalidOption { option, value }) => {
                assert_eq!(option, "bullet_list_marker");
                assert_eq!(value, "#");
            }
            other => panic!("expected InvalidOption, got {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_partial_toml_uses_defaults() {
        let options: ConverterOptions =
            toml::from_str("heading_style = \"setext\"\nbullet_list_marker = \"*\"\n")
                .expect("valid toml");
        assert_eq!(options.heading_style, HeadingStyle::Setext);
        assert_eq!(options.bullet_list_marker, '*');
        assert_eq!(options.fence, "```");
    }
}
