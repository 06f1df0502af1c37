//! fetchmd - copy the main content of a web page as Markdown
//!
//! This library picks the main content node of an HTML page, converts it
//! to Markdown with a rule-driven converter, tidies fenced code blocks and
//! hands the result to the clipboard.
//!
//! # Architecture
//!
//! The library is structured into several modules:
//! - `loader`: resolves the configured converter, or reports why it cannot
//! - `options`, `rules`, `converter`: Markdown generation from the DOM tree
//! - `source`: page bytes from a URL, a file or standard input
//! - `charset`: character encoding detection and transcoding
//! - `parser`: HTML5 parsing using html5ever
//! - `selector`: the main / article / .content / body fallback chain
//! - `postprocess`: indentation policy inside fenced code blocks
//! - `clipboard`: system clipboard with a copy-command fallback
//! - `notifier`: the banner reporting how the copy went
//! - `config`: the TOML settings file
//! - `pipeline`: all of the above for one invocation
//!
//! ```rust
//! use fetchmd::loader::load_converter;
//! use fetchmd::options::ConverterOptions;
//! use fetchmd::parser::parse_html;
//! use fetchmd::selector::{select_content, Candidate};
//!
//! let converter = load_converter(ConverterOptions::default()).expect("load");
//! let dom = parse_html(b"<body><nav>x</nav><main><h2>Usage</h2></main></body>").expect("parse");
//! let selection = select_content(&dom);
//!
//! assert_eq!(selection.candidate, Candidate::Main);
//! assert_eq!(converter.convert(&selection.node).expect("convert"), "## Usage");
//! ```

pub mod charset;
pub mod clipboard;
pub mod config;
pub mod converter;
pub mod dom;
pub mod error;
pub mod loader;
pub mod notifier;
pub mod options;
pub mod parser;
pub mod pipeline;
pub mod postprocess;
pub mod rules;
pub mod selector;
pub mod source;

// Re-export main types for convenience
pub use converter::{HtmlToMarkdown, MarkdownConverter};
pub use error::{ConversionError, FetchmdError};
pub use loader::load_converter;
pub use parser::parse_html;
pub use pipeline::{RunReport, RunRequest, run};
