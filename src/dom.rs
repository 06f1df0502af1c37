//! Small read-only helpers over `markup5ever_rcdom` nodes

use html5ever::Attribute;
use markup5ever_rcdom::{Handle, NodeData};

/// Local tag name of an element node, lowercase as html5ever stores it
pub fn tag_name(node: &Handle) -> Option<&str> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// Value of the named attribute, if the node is an element carrying it
pub fn attr(node: &Handle, name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => find_attr(&attrs.borrow(), name),
        _ => None,
    }
}

pub fn find_attr(attrs: &[Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|attr| attr.name.local.as_ref() == name)
        .map(|attr| attr.value.to_string())
}

/// True when the whitespace-separated `class` list contains `class`
pub fn has_class(attrs: &[Attribute], class: &str) -> bool {
    find_attr(attrs, "class")
        .map(|value| value.split_ascii_whitespace().any(|token| token == class))
        .unwrap_or(false)
}

/// Concatenated text of all descendant text nodes, untouched
///
/// Equivalent to the DOM `textContent` property: markup is dropped, and
/// whitespace and entities come through exactly as parsed.
pub fn text_content(node: &Handle) -> String {
    let mut output = String::new();
    collect_text(node, &mut output);
    output
}

fn collect_text(node: &Handle, output: &mut String) {
    let mut stack = vec![node.clone()];

    while let Some(node) = stack.pop() {
        match node.data {
            NodeData::Text { ref contents } => output.push_str(&contents.borrow()),
            NodeData::Element { .. } | NodeData::Document => {
                stack.extend(node.children.borrow().iter().rev().cloned());
            }
            _ => {}
        }
    }
}

/// Element children of `node`, in document order
pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

/// Whether `tag` is rendered as a block in Markdown output
pub fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "address"
            | "article"
            | "aside"
            | "audio"
            | "blockquote"
            | "body"
            | "canvas"
            | "center"
            | "dd"
            | "dir"
            | "div"
            | "dl"
            | "dt"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "frameset"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hgroup"
            | "hr"
            | "html"
            | "isindex"
            | "li"
            | "main"
            | "menu"
            | "nav"
            | "noframes"
            | "noscript"
            | "ol"
            | "output"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "tbody"
            | "td"
            | "tfoot"
            | "th"
            | "thead"
            | "tr"
            | "ul"
    )
}
