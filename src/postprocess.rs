//! Indentation handling inside fenced code blocks
//!
//! Fenced spans are located the same way they always have been: lazily,
//! from one triple-backtick marker to the next, anywhere in the text. Each
//! span is then treated as an ordered list of lines. The first line holds
//! the opening marker (and any info string) and the last line holds the
//! closing marker; everything between is rewritten by an [`IndentPolicy`].
//!
//! The default policy, [`IndentPolicy::Preserve`], splits every interior
//! line into its leading whitespace and the rest and puts them back
//! together, so the output is byte-for-byte the input. Callers who want the
//! indentation normalized choose [`IndentPolicy::Dedent`] or
//! [`IndentPolicy::Strip`] explicitly.
//!
//! ```rust
//! use fetchmd::postprocess::{postprocess, IndentPolicy};
//!
//! let md = "```\n    a\n      b\n```";
//! assert_eq!(postprocess(md, IndentPolicy::Preserve), md);
//! assert_eq!(postprocess(md, IndentPolicy::Dedent), "```\na\n  b\n```");
//! assert_eq!(postprocess(md, IndentPolicy::Strip), "```\na\nb\n```");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// What happens to leading whitespace on the interior lines of a fenced block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentPolicy {
    /// Leave every line exactly as converted
    #[default]
    Preserve,
    /// Remove the longest leading whitespace prefix shared by all non-blank lines
    Dedent,
    /// Remove all leading whitespace from every line
    Strip,
}

impl fmt::Display for IndentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndentPolicy::Preserve => "preserve",
            IndentPolicy::Dedent => "dedent",
            IndentPolicy::Strip => "strip",
        })
    }
}

impl FromStr for IndentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "preserve" => Ok(IndentPolicy::Preserve),
            "dedent" => Ok(IndentPolicy::Dedent),
            "strip" => Ok(IndentPolicy::Strip),
            other => Err(format!("unknown indent policy '{}'", other)),
        }
    }
}

/// A fenced span split into its marker lines and interior lines
#[derive(Debug, PartialEq, Eq)]
pub struct FencedBlock<'a> {
    pub opening: &'a str,
    pub lines: Vec<&'a str>,
    /// `None` when the span sits on a single line
    pub closing: Option<&'a str>,
}

impl<'a> FencedBlock<'a> {
    pub fn parse(span: &'a str) -> Self {
        let mut lines: Vec<&str> = span.split('\n').collect();
        if lines.len() < 2 {
            return Self {
                opening: span,
                lines: Vec::new(),
                closing: None,
            };
        }
        let closing = lines.pop();
        let opening = lines.remove(0);
        Self {
            opening,
            lines,
            closing,
        }
    }

    pub fn render(&self, policy: IndentPolicy) -> String {
        let interior = apply_policy(&self.lines, policy);

        let mut out = String::from(self.opening);
        for line in &interior {
            out.push('\n');
            out.push_str(line);
        }
        if let Some(closing) = self.closing {
            out.push('\n');
            out.push_str(closing);
        }
        out
    }
}

/// Rewrite the interior lines of every fenced span in `markdown`
pub fn postprocess(markdown: &str, policy: IndentPolicy) -> String {
    static FENCED_SPAN: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(regex) = FENCED_SPAN
        .get_or_init(|| Regex::new(r"(?s)```.*?```").ok())
        .as_ref()
    else {
        return markdown.to_string();
    };

    regex
        .replace_all(markdown, |caps: &Captures<'_>| {
            FencedBlock::parse(&caps[0]).render(policy)
        })
        .into_owned()
}

fn apply_policy<'a>(lines: &[&'a str], policy: IndentPolicy) -> Vec<Cow<'a, str>> {
    match policy {
        IndentPolicy::Preserve => lines
            .iter()
            .map(|line| {
                let (indent, rest) = split_indent(line);
                Cow::Owned(format!("{indent}{rest}"))
            })
            .collect(),
        IndentPolicy::Strip => lines
            .iter()
            .map(|line| Cow::Borrowed(split_indent(line).1))
            .collect(),
        IndentPolicy::Dedent => {
            let common = common_indent(lines);
            lines
                .iter()
                .map(|line| match line.strip_prefix(common) {
                    Some(rest) => Cow::Borrowed(rest),
                    // Blank lines shorter than the shared prefix
                    None => Cow::Borrowed(line.trim_start()),
                })
                .collect()
        }
    }
}

fn split_indent(line: &str) -> (&str, &str) {
    let rest = line.trim_start_matches([' ', '\t']);
    (&line[..line.len() - rest.len()], rest)
}

/// Longest whitespace prefix shared by every non-blank line
fn common_indent<'a>(lines: &[&'a str]) -> &'a str {
    let mut common: Option<&'a str> = None;

    for line in lines.iter().filter(|line| !line.trim().is_empty()) {
        let indent = split_indent(line).0;
        common = Some(match common {
            None => indent,
            Some(prev) => {
                let shared = prev
                    .bytes()
                    .zip(indent.bytes())
                    .take_while(|(a, b)| a == b)
                    .count();
                &prev[..shared]
            }
        });
    }

    common.unwrap_or("")
}
