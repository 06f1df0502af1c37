//! Markdown converter - renders a DOM subtree as Markdown
//!
//! # Conversion Strategy
//!
//! The converter walks the subtree depth-first. For every element it first
//! resolves the [`Rule`](crate::rules::Rule) that will render it; if the
//! element is not removed, its children are converted into a `content`
//! string, and the rule turns `content` plus the element into the element's
//! Markdown. Outputs of siblings are joined so that block separators never
//! stack: the gap between two pieces is the longer of their newline runs,
//! capped at a blank line.
//!
//! Text nodes have whitespace runs collapsed to a single space and
//! Markdown-significant characters backslash-escaped. Inline elements move
//! their leading and trailing whitespace outside the markup they emit, so
//! `<em> a </em>` renders as ` *a* ` rather than `* a *`.
//!
//! # Output Normalization
//!
//! After traversal, the output is normalized outside fenced code blocks:
//! whitespace-only lines become empty, runs of blank lines collapse to one,
//! stray trailing spaces are removed (two-space hard breaks are kept), and
//! runs of interior spaces collapse. Leading and trailing newlines of the
//! whole document are trimmed. Identical input and options always produce
//! byte-identical output.
//!
//! # Examples
//!
//! ```rust
//! use fetchmd::converter::{HtmlToMarkdown, MarkdownConverter};
//! use fetchmd::parser::parse_html;
//!
//! let dom = parse_html(b"<h1>Title</h1><p>Some <em>content</em>.</p>").expect("parse");
//! let markdown = MarkdownConverter::new().convert(&dom.document).expect("convert");
//! assert_eq!(markdown, "# Title\n\nSome *content*.");
//! ```

use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::time::{Duration, Instant};

use crate::dom;
use crate::error::ConversionError;
use crate::options::ConverterOptions;
use crate::rules::{NodeView, Resolved, Rule, Rules};

/// Deepest element nesting the converter will follow
pub const MAX_NESTING_DEPTH: usize = 1000;

/// Conversion context for tracking timeout, node count and depth
///
/// The timeout is cooperative: elapsed time is checked every 100 nodes and
/// once more after normalization, so a conversion can overrun its budget by
/// at most the time it takes to process 100 nodes.
///
/// ```rust
/// use std::time::Duration;
/// use fetchmd::converter::ConversionContext;
///
/// let mut ctx = ConversionContext::new(Duration::from_secs(5));
/// for _ in 0..1000 {
///     ctx.increment_and_check()?;
/// }
/// assert_eq!(ctx.node_count(), 1000);
/// # Ok::<(), fetchmd::error::ConversionError>(())
/// ```
#[derive(Debug)]
pub struct ConversionContext {
    start_time: Instant,
    /// Zero means no timeout
    timeout: Duration,
    node_count: u32,
    max_depth: usize,
}

impl ConversionContext {
    /// Create a context; `Duration::ZERO` disables the timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            timeout,
            node_count: 0,
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    /// Same as [`ConversionContext::new`] with a custom depth limit
    pub fn with_max_depth(timeout: Duration, max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::new(timeout)
        }
    }

    /// `Err(ConversionError::Timeout)` once the budget is spent
    pub fn check_timeout(&self) -> Result<(), ConversionError> {
        if !self.timeout.is_zero() && self.start_time.elapsed() > self.timeout {
            return Err(ConversionError::Timeout);
        }
        Ok(())
    }

    /// Count one node; checks the timeout every 100 nodes
    pub fn increment_and_check(&mut self) -> Result<(), ConversionError> {
        self.node_count += 1;
        if self.node_count.is_multiple_of(100) {
            self.check_timeout()?;
        }
        Ok(())
    }

    pub fn check_depth(&self, depth: usize) -> Result<(), ConversionError> {
        if depth > self.max_depth {
            return Err(ConversionError::DepthLimit(self.max_depth));
        }
        Ok(())
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }
}

/// An HTML to Markdown conversion capability
///
/// The page copier only depends on this trait; [`crate::loader`] resolves
/// the concrete converter once at startup.
pub trait HtmlToMarkdown {
    /// Options the converter was configured with
    fn options(&self) -> &ConverterOptions;

    /// Convert `node` and its subtree within the limits of `ctx`
    fn convert_with_context(
        &self,
        node: &Handle,
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError>;

    /// Convert `node` and its subtree with no timeout
    fn convert(&self, node: &Handle) -> Result<String, ConversionError> {
        let mut ctx = ConversionContext::new(Duration::ZERO);
        self.convert_with_context(node, &mut ctx)
    }
}

/// Rule-driven Markdown converter
///
/// ```rust
/// use fetchmd::converter::{HtmlToMarkdown, MarkdownConverter};
/// use fetchmd::options::{ConverterOptions, HeadingStyle};
/// use fetchmd::parser::parse_html;
///
/// let options = ConverterOptions {
///     heading_style: HeadingStyle::Setext,
///     ..Default::default()
/// };
/// let converter = MarkdownConverter::with_options(options);
///
/// let dom = parse_html(b"<h1>Title</h1>").expect("parse");
/// assert_eq!(converter.convert_document(&dom).expect("convert"), "Title\n=====");
/// ```
#[derive(Debug)]
pub struct MarkdownConverter {
    options: ConverterOptions,
    rules: Rules,
}

impl MarkdownConverter {
    /// Converter with default options and only the built-in rules
    pub fn new() -> Self {
        Self::with_options(ConverterOptions::default())
    }

    pub fn with_options(options: ConverterOptions) -> Self {
        Self {
            options,
            rules: Rules::new(),
        }
    }

    /// Add a rule that overrides every rule already registered for the
    /// nodes it matches
    pub fn add_rule(&mut self, rule: Rule) -> &mut Self {
        self.rules.add(rule);
        self
    }

    /// Convert a whole parsed document
    pub fn convert_document(&self, dom: &RcDom) -> Result<String, ConversionError> {
        self.convert(&dom.document)
    }

    fn process_children(
        &self,
        parent: &Handle,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError> {
        let mut output = String::new();

        for child in parent.children.borrow().iter() {
            ctx.increment_and_check()?;

            let replacement = match child.data {
                NodeData::Text { ref contents } => {
                    let text = collapse_whitespace(&contents.borrow());
                    if output.is_empty() || output.ends_with('\n') {
                        escape_markdown(text.trim_start_matches(' '))
                    } else {
                        escape_markdown(&text)
                    }
                }
                NodeData::Element { .. } => self.replace_element(child, parent, depth + 1, ctx)?,
                // Comments, doctypes and processing instructions produce nothing
                _ => continue,
            };

            if replacement.starts_with('\n') {
                output.truncate(output.trim_end_matches(' ').len());
            }
            join_into(&mut output, &replacement);
        }

        Ok(output)
    }

    fn replace_element(
        &self,
        node: &Handle,
        parent: &Handle,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError> {
        ctx.check_depth(depth)?;

        let view = NodeView::new(node, Some(parent));
        let tag = view.tag();
        let is_block = dom::is_block(tag);

        let rule = match self.rules.resolve(&view, &self.options) {
            Resolved::Remove => return Ok(String::new()),
            Resolved::Blank => {
                return Ok(if is_block { "\n\n".to_string() } else { String::new() });
            }
            Resolved::Rule(rule) => Some(rule),
            Resolved::Default => None,
        };

        let content = self.process_children(node, depth, ctx)?;

        if is_block {
            return Ok(match rule {
                Some(rule) => rule.replace(&content, &view, &self.options),
                None => format!("\n\n{}\n\n", content.trim_matches(|c| c == ' ' || c == '\t')),
            });
        }

        // Inline: keep flanking whitespace outside the emitted markup
        let (leading, inner, trailing) = split_flanking(&content);
        let rendered = match rule {
            Some(rule) => rule.replace(inner, &view, &self.options),
            None => inner.to_string(),
        };
        Ok(format!("{leading}{rendered}{trailing}"))
    }
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlToMarkdown for MarkdownConverter {
    fn options(&self) -> &ConverterOptions {
        &self.options
    }

    fn convert_with_context(
        &self,
        node: &Handle,
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError> {
        // Only the root's children are rendered; the root element itself
        // contributes no markup of its own.
        let raw = match node.data {
            NodeData::Document | NodeData::Element { .. } => self.process_children(node, 0, ctx)?,
            NodeData::Text { ref contents } => {
                escape_markdown(collapse_whitespace(&contents.borrow()).trim_start_matches(' '))
            }
            _ => String::new(),
        };

        ctx.check_timeout()?;
        let markdown = normalize_output(&raw);
        ctx.check_timeout()?;

        Ok(markdown)
    }
}

/// Append `replacement` to `output`, merging the newlines between them
///
/// The separator is the longer of `output`'s trailing and `replacement`'s
/// leading newline runs, capped at two.
fn join_into(output: &mut String, replacement: &str) {
    let trimmed_len = output.trim_end_matches('\n').len();
    let trailing = output.len() - trimmed_len;
    let body = replacement.trim_start_matches('\n');
    let leading = replacement.len() - body.len();

    output.truncate(trimmed_len);
    let separator = trailing.max(leading).min(2);
    for _ in 0..separator {
        output.push('\n');
    }
    output.push_str(body);
}

/// Split off leading and trailing spaces
fn split_flanking(content: &str) -> (&str, &str, &str) {
    let is_space = |c: char| c == ' ' || c == '\t';
    let start = content.len() - content.trim_start_matches(is_space).len();
    let end = content.trim_end_matches(is_space).len().max(start);
    (&content[..start], &content[start..end], &content[end..])
}

/// Collapse every whitespace run (including newlines) to one space
fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() && ch != '\u{a0}' {
            if !in_space {
                result.push(' ');
                in_space = true;
            }
        } else {
            result.push(ch);
            in_space = false;
        }
    }
    result
}

/// Backslash-escape characters that would otherwise be read as Markdown
///
/// Characters that are only significant at the start of a line (`-`, `+ `,
/// `=`, `#`, `>`, `~~~`, `1. `) are escaped only when `text` begins with
/// them. Callers strip line-start indentation first.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        if matches!(ch, '\\' | '*' | '`' | '[' | ']' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    let digits = escaped.chars().take_while(|c| c.is_ascii_digit()).count();
    if escaped.starts_with('-')
        || escaped.starts_with("+ ")
        || escaped.starts_with('=')
        || escaped.starts_with('>')
        || escaped.starts_with("~~~")
        || is_atx_prefix(&escaped)
    {
        escaped.insert(0, '\\');
    } else if digits > 0 && escaped[digits..].starts_with(". ") {
        escaped.insert(digits, '\\');
    }

    escaped
}

fn is_atx_prefix(text: &str) -> bool {
    let hashes = text.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes) && text[hashes..].starts_with(' ')
}

/// Normalize converter output; fenced and indented code blocks pass through
/// untouched
fn normalize_output(output: &str) -> String {
    let output = output.replace("\r\n", "\n");

    let mut result = String::with_capacity(output.len());
    let mut prev_blank = false;
    let mut fence: Option<String> = None;
    let mut indented_code = false;

    for line in output.split('\n') {
        let opener = fence_marker(line);

        if let Some(open) = &fence {
            result.push_str(line);
            result.push('\n');
            if opener.as_deref().is_some_and(|m| m.starts_with(open.as_str()) && line.trim().len() == m.len()) {
                fence = None;
            }
            prev_blank = false;
            continue;
        }

        if let Some(marker) = opener {
            fence = Some(marker);
            result.push_str(line.trim_end());
            result.push('\n');
            prev_blank = false;
            continue;
        }

        if line.trim().is_empty() {
            if !prev_blank {
                result.push('\n');
                prev_blank = true;
            }
            continue;
        }

        // An indented code block opens after a blank line
        indented_code = line.starts_with("    ") && (prev_blank || indented_code);
        if indented_code {
            result.push_str(line.trim_end());
        } else {
            result.push_str(&normalize_line(line));
        }
        result.push('\n');
        prev_blank = false;
    }

    result
        .trim_start_matches(['\n', '\t', '\r'])
        .trim_end()
        .to_string()
}

/// The backtick or tilde run opening a fenced block on this line
fn fence_marker(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = trimmed.chars().take_while(|c| *c == ch).count();
    (run >= 3).then(|| ch.to_string().repeat(run))
}

/// Collapse interior space runs, keep indentation, inline code and hard breaks
fn normalize_line(line: &str) -> String {
    let body = line.trim_end();
    let hard_break = line.ends_with("  ") && !body.is_empty();

    let mut result = String::with_capacity(line.len());
    let mut prev_space = false;
    let mut at_start = true;
    let mut in_inline_code = false;
    let mut escaped = false;

    for ch in body.chars() {
        if ch == '`' && !escaped {
            in_inline_code = !in_inline_code;
        }
        escaped = ch == '\\' && !escaped;

        if ch == ' ' && !at_start && !in_inline_code {
            if !prev_space {
                result.push(ch);
                prev_space = true;
            }
            continue;
        }

        result.push(ch);
        prev_space = false;
        if ch != ' ' {
            at_start = false;
        }
    }

    if hard_break {
        result.push_str("  ");
    }
    result
}
