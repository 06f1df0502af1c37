//! Conversion rules
//!
//! A [`Rule`] pairs a [`Filter`] that decides which nodes it handles with a
//! replacement function that renders one node. The replacement receives the
//! already-converted Markdown of the node's children as `content`, the node
//! itself, and the converter options; it may use or ignore any of them.
//!
//! [`Rules`] resolves the rule for a node in this order:
//!
//! 1. blank elements (whitespace-only, no images or other void content)
//!    render as nothing, or as a paragraph break for blocks
//! 2. added rules, most recently added first
//! 3. built-in rules
//! 4. removed elements (`head`, `script`, `style`, `noscript`, `template`)
//! 5. the default rule: blocks are set apart by blank lines, inline
//!    elements pass their content through
//!
//! Adding a rule for a node kind therefore replaces the built-in output for
//! that kind without touching anything else. [`page_copy_rules`] holds the
//! three overrides the page copier installs.

use std::rc::Rc;

use markup5ever_rcdom::{Handle, NodeData};

use crate::converter::MAX_NESTING_DEPTH;
use crate::dom;
use crate::options::{CodeBlockStyle, ConverterOptions, HeadingStyle};

type FilterFn = dyn Fn(&NodeView<'_>, &ConverterOptions) -> bool + Send + Sync;
type ReplacementFn = dyn Fn(&str, &NodeView<'_>, &ConverterOptions) -> String + Send + Sync;

/// An element node together with its parent, as seen by a rule
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    handle: &'a Handle,
    parent: Option<&'a Handle>,
}

impl<'a> NodeView<'a> {
    pub fn new(handle: &'a Handle, parent: Option<&'a Handle>) -> Self {
        Self { handle, parent }
    }

    pub fn handle(&self) -> &'a Handle {
        self.handle
    }

    /// Tag name, or the empty string for non-element nodes
    pub fn tag(&self) -> &'a str {
        dom::tag_name(self.handle).unwrap_or("")
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        dom::attr(self.handle, name)
    }

    pub fn text_content(&self) -> String {
        dom::text_content(self.handle)
    }

    pub fn parent_tag(&self) -> Option<&'a str> {
        self.parent.and_then(dom::tag_name)
    }

    pub fn parent_attr(&self, name: &str) -> Option<String> {
        self.parent.and_then(|parent| dom::attr(parent, name))
    }

    /// Index among the parent's element children, and whether another
    /// element follows
    pub fn element_position(&self) -> (usize, bool) {
        let Some(parent) = self.parent else {
            return (0, false);
        };
        let siblings = dom::element_children(parent);
        match siblings.iter().position(|s| Rc::ptr_eq(s, self.handle)) {
            Some(index) => (index, index + 1 < siblings.len()),
            None => (0, false),
        }
    }

    fn first_child(&self) -> Option<Handle> {
        self.handle.children.borrow().first().cloned()
    }
}

/// Which nodes a rule applies to
pub enum Filter {
    /// Elements with any of these tag names
    Tags(Vec<&'static str>),
    /// Elements accepted by a predicate
    Predicate(Box<FilterFn>),
}

impl Filter {
    pub fn tags(tags: &[&'static str]) -> Self {
        Filter::Tags(tags.to_vec())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&NodeView<'_>, &ConverterOptions) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Box::new(f))
    }

    fn accepts(&self, node: &NodeView<'_>, options: &ConverterOptions) -> bool {
        match self {
            Filter::Tags(tags) => tags.contains(&node.tag()),
            Filter::Predicate(f) => f(node, options),
        }
    }
}

/// A named filter + replacement pair
pub struct Rule {
    name: &'static str,
    filter: Filter,
    replacement: Box<ReplacementFn>,
}

impl Rule {
    pub fn new<F>(name: &'static str, filter: Filter, replacement: F) -> Self
    where
        F: Fn(&str, &NodeView<'_>, &ConverterOptions) -> String + Send + Sync + 'static,
    {
        Self {
            name,
            filter,
            replacement: Box::new(replacement),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, node: &NodeView<'_>, options: &ConverterOptions) -> bool {
        self.filter.accepts(node, options)
    }

    pub fn replace(&self, content: &str, node: &NodeView<'_>, options: &ConverterOptions) -> String {
        (self.replacement)(content, node, options)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Outcome of rule lookup for one element
#[derive(Debug)]
pub enum Resolved<'r> {
    Rule(&'r Rule),
    /// Whitespace-only element: a blank line for blocks, nothing otherwise
    Blank,
    /// Dropped together with its children
    Remove,
    /// No rule claims the element
    Default,
}

const REMOVED: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Elements that carry meaning without any text
const VOID_CONTENT: &[&str] = &[
    "a", "area", "audio", "br", "canvas", "embed", "hr", "iframe", "img", "input", "object",
    "picture", "source", "svg", "table", "td", "th", "video",
];

/// Ordered rule set
#[derive(Debug)]
pub struct Rules {
    added: Vec<Rule>,
    builtin: Vec<Rule>,
}

impl Default for Rules {
    fn default() -> Self {
        Self::new()
    }
}

impl Rules {
    /// The built-in rule set with nothing added
    pub fn new() -> Self {
        Self {
            added: Vec::new(),
            builtin: builtin_rules(),
        }
    }

    /// Add a rule that takes precedence over every rule already present
    pub fn add(&mut self, rule: Rule) {
        self.added.push(rule);
    }

    pub fn resolve<'r>(&'r self, node: &NodeView<'_>, options: &ConverterOptions) -> Resolved<'r> {
        if is_blank(node.handle()) {
            return Resolved::Blank;
        }

        let claimed = self
            .added
            .iter()
            .rev()
            .chain(self.builtin.iter())
            .find(|rule| rule.matches(node, options));

        if let Some(rule) = claimed {
            return Resolved::Rule(rule);
        }
        if REMOVED.contains(&node.tag()) {
            return Resolved::Remove;
        }
        Resolved::Default
    }
}

fn is_blank(node: &Handle) -> bool {
    let tag = dom::tag_name(node).unwrap_or("");
    if VOID_CONTENT.contains(&tag) || REMOVED.contains(&tag) {
        return false;
    }

    // Stops at the first non-whitespace text or void element. A subtree
    // nested past the conversion depth limit counts as content, so traversal
    // reaches it and reports `DepthLimit`.
    let mut stack: Vec<(Handle, usize)> = node
        .children
        .borrow()
        .iter()
        .map(|child| (child.clone(), 1))
        .collect();

    while let Some((node, depth)) = stack.pop() {
        match node.data {
            NodeData::Text { ref contents } => {
                if !contents.borrow().trim().is_empty() {
                    return false;
                }
            }
            NodeData::Element { ref name, .. } => {
                if VOID_CONTENT.contains(&name.local.as_ref()) || depth >= MAX_NESTING_DEPTH {
                    return false;
                }
                stack.extend(
                    node.children
                        .borrow()
                        .iter()
                        .map(|child| (child.clone(), depth + 1)),
                );
            }
            _ => {}
        }
    }

    true
}

// ============================================================================
// Page copy overrides
// ============================================================================

/// Code rule: `pre` and `code` become one fenced block of raw text
///
/// Nested markup is discarded. Inline `code` spans are fenced too.
pub fn code_blocks_rule() -> Rule {
    Rule::new("codeBlocks", Filter::tags(&["pre", "code"]), |_, node, _| {
        format!("\n```\n{}\n```\n", node.text_content())
    })
}

/// Line-break rule: `br` becomes a bare newline
pub fn line_breaks_rule() -> Rule {
    Rule::new("lineBreaks", Filter::tags(&["br"]), |_, _, _| "\n".to_string())
}

/// List rule: lists are set apart by a single newline on each side
pub fn lists_rule() -> Rule {
    Rule::new("lists", Filter::tags(&["ul", "ol"]), |content, _, _| {
        format!("\n{}\n", content)
    })
}

/// The overrides installed by the page copier, in installation order
pub fn page_copy_rules() -> Vec<Rule> {
    vec![code_blocks_rule(), line_breaks_rule(), lists_rule()]
}

// ============================================================================
// Built-in rules
// ============================================================================

fn builtin_rules() -> Vec<Rule> {
    vec![
        Rule::new("paragraph", Filter::tags(&["p"]), |content, _, _| {
            format!("\n\n{}\n\n", trim_spaces(content))
        }),
        Rule::new("lineBreak", Filter::tags(&["br"]), |_, _, _| "  \n".to_string()),
        Rule::new(
            "heading",
            Filter::tags(&["h1", "h2", "h3", "h4", "h5", "h6"]),
            heading,
        ),
        Rule::new("blockquote", Filter::tags(&["blockquote"]), |content, _, _| {
            let quoted: Vec<String> = content
                .trim_matches('\n')
                .lines()
                .map(|line| format!("> {}", line).trim_end().to_string())
                .collect();
            format!("\n\n{}\n\n", quoted.join("\n"))
        }),
        Rule::new("list", Filter::tags(&["ul", "ol"]), |content, node, _| {
            if matches!(node.parent_tag(), Some("li")) {
                format!("\n{}", content.trim_end_matches('\n'))
            } else {
                format!("\n\n{}\n\n", content)
            }
        }),
        Rule::new("listItem", Filter::tags(&["li"]), list_item),
        Rule::new(
            "indentedCodeBlock",
            Filter::predicate(|node, options| {
                options.code_block_style == CodeBlockStyle::Indented && is_code_block(node)
            }),
            |_, node, _| {
                let code = node.text_content();
                let indented: Vec<String> = code
                    .trim_end_matches('\n')
                    .lines()
                    .map(|line| format!("    {}", line))
                    .collect();
                format!("\n\n{}\n\n", indented.join("\n"))
            },
        ),
        Rule::new(
            "fencedCodeBlock",
            Filter::predicate(|node, options| {
                options.code_block_style == CodeBlockStyle::Fenced && is_code_block(node)
            }),
            fenced_code_block,
        ),
        Rule::new("horizontalRule", Filter::tags(&["hr"]), |_, _, options| {
            format!("\n\n{}\n\n", options.hr)
        }),
        Rule::new(
            "inlineLink",
            Filter::predicate(|node, _| node.tag() == "a" && node.attr("href").is_some()),
            |content, node, _| {
                let href = node.attr("href").unwrap_or_default();
                format!("[{}]({}{})", content, href, title_suffix(node))
            },
        ),
        Rule::new("emphasis", Filter::tags(&["em", "i"]), |content, _, options| {
            delimit(content, &options.em_delimiter)
        }),
        Rule::new("strong", Filter::tags(&["strong", "b"]), |content, _, options| {
            delimit(content, &options.strong_delimiter)
        }),
        Rule::new(
            "code",
            Filter::predicate(|node, _| node.tag() == "code" && node.parent_tag() != Some("pre")),
            |_, node, _| inline_code(&node.text_content()),
        ),
        Rule::new("image", Filter::tags(&["img"]), |_, node, _| {
            match node.attr("src").filter(|src| !src.is_empty()) {
                Some(src) => format!(
                    "![{}]({}{})",
                    clean_attribute(&node.attr("alt").unwrap_or_default()),
                    src,
                    title_suffix(node)
                ),
                None => String::new(),
            }
        }),
    ]
}

fn heading(content: &str, node: &NodeView<'_>, options: &ConverterOptions) -> String {
    let level = node
        .tag()
        .strip_prefix('h')
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(1);
    let text = trim_spaces(content);

    if options.heading_style == HeadingStyle::Setext && level < 3 {
        let underline = if level == 1 { "=" } else { "-" };
        return format!(
            "\n\n{}\n{}\n\n",
            text,
            underline.repeat(text.chars().count().max(1))
        );
    }

    format!("\n\n{} {}\n\n", "#".repeat(level), text)
}

fn list_item(content: &str, node: &NodeView<'_>, options: &ConverterOptions) -> String {
    let (index, has_next) = node.element_position();

    let prefix = if node.parent_tag() == Some("ol") {
        let start = node
            .parent_attr("start")
            .and_then(|start| start.trim().parse::<i64>().ok())
            .unwrap_or(1);
        format!("{}. ", start + index as i64)
    } else {
        format!("{} ", options.bullet_list_marker)
    };

    let body = content.trim_start_matches(['\n', ' ']).trim_end();
    let indent = " ".repeat(prefix.len());
    let mut item = prefix;
    for (i, line) in body.lines().enumerate() {
        if i > 0 {
            item.push('\n');
            if !line.is_empty() {
                item.push_str(&indent);
            }
        }
        item.push_str(line);
    }

    if has_next {
        item.push('\n');
    }
    item
}

/// A `pre`, with or without a `code` child; its text is kept verbatim
fn is_code_block(node: &NodeView<'_>) -> bool {
    node.tag() == "pre"
}

fn fenced_code_block(_: &str, node: &NodeView<'_>, options: &ConverterOptions) -> String {
    let language = node
        .first_child()
        .filter(|child| dom::tag_name(child) == Some("code"))
        .and_then(|code| dom::attr(&code, "class"))
        .and_then(|class| {
            class.split_ascii_whitespace().find_map(|token| {
                token
                    .strip_prefix("language-")
                    .or_else(|| token.strip_prefix("lang-"))
                    .map(str::to_string)
            })
        })
        .unwrap_or_default();

    let code = node.text_content();
    let fence_char = options.fence.chars().next().unwrap_or('`');
    let longest_run = longest_line_run(&code, fence_char);
    let fence = if longest_run >= options.fence.len() {
        fence_char.to_string().repeat(longest_run + 1)
    } else {
        options.fence.clone()
    };

    format!(
        "\n\n{fence}{language}\n{}\n{fence}\n\n",
        code.trim_end_matches('\n')
    )
}

/// Longest run of `ch` at the start of any line
fn longest_line_run(code: &str, ch: char) -> usize {
    code.lines()
        .map(|line| line.chars().take_while(|c| *c == ch).count())
        .max()
        .unwrap_or(0)
}

fn inline_code(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }

    let runs: Vec<usize> = code
        .split(|c| c != '`')
        .map(str::len)
        .filter(|len| *len > 0)
        .collect();
    let width = (1..).find(|n| !runs.contains(n)).unwrap_or(1);
    let delimiter = "`".repeat(width);

    let needs_space = code.starts_with('`')
        || code.ends_with('`')
        || (code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());
    let space = if needs_space { " " } else { "" };

    format!("{delimiter}{space}{code}{space}{delimiter}")
}

fn delimit(content: &str, delimiter: &str) -> String {
    if content.trim().is_empty() {
        return String::new();
    }
    format!("{delimiter}{content}{delimiter}")
}

fn title_suffix(node: &NodeView<'_>) -> String {
    match node.attr("title").map(|t| clean_attribute(&t)) {
        Some(title) if !title.is_empty() => format!(" \"{}\"", title.replace('"', "\\\"")),
        _ => String::new(),
    }
}

/// Collapse newlines inside an attribute value so it stays on one line
fn clean_attribute(value: &str) -> String {
    value
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .replace('\n', " ")
}

fn trim_spaces(text: &str) -> &str {
    text.trim_matches(|c| c == ' ' || c == '\t')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_html;
    use crate::selector::find_first;
    use markup5ever_rcdom::RcDom;

    fn parse(html: &str) -> RcDom {
        parse_html(html.as_bytes()).expect("Parse failed")
    }

    fn first(dom: &RcDom, tag: &str) -> Handle {
        find_first(&dom.document, &|name, _| name == tag).expect("element present")
    }

    #[test]
    fn test_code_rule_emits_raw_text_fenced() {
        let dom = parse("<pre>foo<b>bar</b></pre>");
        let pre = first(&dom, "pre");
        let node = NodeView::new(&pre, None);

        let output = code_blocks_rule().replace("ignored **bar**", &node, &ConverterOptions::default());
        assert_eq!(output, "\n```\nfoobar\n```\n");
    }

    #[test]
    fn test_code_rule_claims_inline_code() {
        let dom = parse("<p>run <code>ls -la</code> now</p>");
        let code = first(&dom, "code");
        let node = NodeView::new(&code, None);

        let rule = code_blocks_rule();
        assert!(rule.matches(&node, &ConverterOptions::default()));
        assert_eq!(
            rule.replace("", &node, &ConverterOptions::default()),
            "\n```\nls -la\n```\n"
        );
    }

    #[test]
    fn test_list_rule_adds_single_newlines() {
        let dom = parse("<ul><li>item1</li><li>item2</li></ul>");
        let ul = first(&dom, "ul");
        let output = lists_rule().replace(
            "- item1\n- item2",
            &NodeView::new(&ul, None),
            &ConverterOptions::default(),
        );
        assert_eq!(output, "\n- item1\n- item2\n");
    }

    #[test]
    fn test_line_break_rule() {
        let dom = parse("a<br>b");
        let br = first(&dom, "br");
        let output = line_breaks_rule().replace("", &NodeView::new(&br, None), &ConverterOptions::default());
        assert_eq!(output, "\n");
    }

    #[test]
    fn test_added_rule_precedes_builtin() {
        let dom = parse("<ul><li>x</li></ul>");
        let ul = first(&dom, "ul");
        let node = NodeView::new(&ul, None);
        let options = ConverterOptions::default();

        let mut rules = Rules::new();
        match rules.resolve(&node, &options) {
            Resolved::Rule(rule) => assert_eq!(rule.name(), "list"),
            other => panic!("expected built-in list rule, got {other:?}"),
        }

        rules.add(lists_rule());
        match rules.resolve(&node, &options) {
            Resolved::Rule(rule) => assert_eq!(rule.name(), "lists"),
            other => panic!("expected added lists rule, got {other:?}"),
        }
    }

    #[test]
    fn test_later_added_rule_wins() {
        let dom = parse("a<br>b");
        let br = first(&dom, "br");
        let node = NodeView::new(&br, None);
        let options = ConverterOptions::default();

        let mut rules = Rules::new();
        rules.add(line_breaks_rule());
        rules.add(Rule::new("custom", Filter::tags(&["br"]), |_, _, _| " / ".to_string()));

        match rules.resolve(&node, &options) {
            Resolved::Rule(rule) => assert_eq!(rule.name(), "custom"),
            other => panic!("expected custom rule, got {other:?}"),
        }
    }

    #[test]
    fn test_script_is_removed_and_empty_div_is_blank() {
        let dom = parse("<div> </div><script>alert(1)</script>");
        let options = ConverterOptions::default();
        let rules = Rules::new();

        let script = first(&dom, "script");
        assert!(matches!(
            rules.resolve(&NodeView::new(&script, None), &options),
            Resolved::Remove
        ));

        let div = first(&dom, "div");
        assert!(matches!(
            rules.resolve(&NodeView::new(&div, None), &options),
            Resolved::Blank
        ));
    }

    #[test]
    fn test_blank_check_stops_at_nesting_limit() {
        let nested = |levels: usize| {
            let mut html = String::from("<div>");
            for _ in 0..levels {
                html.push_str("<span>");
            }
            html
        };

        let dom = parse(&nested(MAX_NESTING_DEPTH - 1));
        assert!(is_blank(&first(&dom, "div")));

        let dom = parse(&nested(MAX_NESTING_DEPTH * 20));
        assert!(!is_blank(&first(&dom, "div")));
    }

    #[test]
    fn test_div_with_image_is_not_blank() {
        let dom = parse("<div><span><img src=\"a.png\"></span></div>");
        let div = first(&dom, "div");
        assert!(!is_blank(&div));
    }

    #[test]
    fn test_inline_code_delimiters() {
        assert_eq!(inline_code("x"), "`x`");
        assert_eq!(inline_code("a`b"), "``a`b``");
        assert_eq!(inline_code("`tick"), "`` `tick ``");
        assert_eq!(inline_code("a``b"), "`a``b`");
    }

    #[test]
    fn test_clean_attribute_joins_lines() {
        assert_eq!(clean_attribute("  one\n\n  two  "), "one two");
    }

    #[test]
    fn test_longest_line_run() {
        assert_eq!(longest_line_run("```\ncode\n````", '`'), 4);
        assert_eq!(longest_line_run("plain", '`'), 0);
    }
}
