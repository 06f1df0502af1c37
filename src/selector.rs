//! Main-content selection
//!
//! The root node to convert is chosen by a fixed fallback chain, evaluated
//! in order until one query matches:
//!
//! 1. the first `<main>` element
//! 2. the first `<article>` element
//! 3. the first element whose class list contains `content`
//! 4. `<body>`
//!
//! Each query is a document-order search, like `querySelector`. There is no
//! scoring and no merging of candidates. When only the body matches, the
//! whole page (navigation, footers and so on) is converted; that output is
//! often noisy and is accepted as-is.

use std::fmt;

use html5ever::Attribute;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::dom::has_class;

/// Which query in the fallback chain produced the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    Main,
    Article,
    ContentClass,
    Body,
    /// No body element exists; the document node itself is used
    Document,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selector = match self {
            Candidate::Main => "main",
            Candidate::Article => "article",
            Candidate::ContentClass => ".content",
            Candidate::Body => "body",
            Candidate::Document => "document",
        };
        f.write_str(selector)
    }
}

/// The node chosen for conversion
#[derive(Debug, Clone)]
pub struct Selection {
    pub node: Handle,
    pub candidate: Candidate,
}

type Query = fn(&str, &[Attribute]) -> bool;

const CHAIN: [(Candidate, Query); 4] = [
    (Candidate::Main, is_main),
    (Candidate::Article, is_article),
    (Candidate::ContentClass, is_content_class),
    (Candidate::Body, is_body),
];

fn is_main(tag: &str, _: &[Attribute]) -> bool {
    tag == "main"
}

fn is_article(tag: &str, _: &[Attribute]) -> bool {
    tag == "article"
}

fn is_content_class(_: &str, attrs: &[Attribute]) -> bool {
    has_class(attrs, "content")
}

fn is_body(tag: &str, _: &[Attribute]) -> bool {
    tag == "body"
}

/// Pick the root node to convert
pub fn select_content(dom: &RcDom) -> Selection {
    for (candidate, query) in CHAIN {
        if let Some(node) = find_first(&dom.document, &query) {
            log::debug!("selected main content via {}", candidate);
            return Selection { node, candidate };
        }
    }

    log::debug!("no body element; converting the whole document");
    Selection {
        node: dom.document.clone(),
        candidate: Candidate::Document,
    }
}

/// First element under `root` (inclusive) matching `predicate`, in document order
pub fn find_first(root: &Handle, predicate: &dyn Fn(&str, &[Attribute]) -> bool) -> Option<Handle> {
    // Explicit stack; pages can nest far deeper than is safe to recurse.
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        let matched = match node.data {
            NodeData::Element {
                ref name,
                ref attrs,
                ..
            } => predicate(name.local.as_ref(), &attrs.borrow()),
            _ => false,
        };
        if matched {
            return Some(node);
        }

        stack.extend(node.children.borrow().iter().rev().cloned());
    }

    None
}
