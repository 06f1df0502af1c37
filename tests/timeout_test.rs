//! Integration tests for the conversion limits
//!
//! A page that takes too long to convert, or nests too deeply, stops with
//! an error instead of producing partial Markdown.

use fetchmd::converter::{ConversionContext, HtmlToMarkdown, MarkdownConverter};
use fetchmd::error::ConversionError;
use fetchmd::loader::load_converter;
use fetchmd::options::ConverterOptions;
use fetchmd::parser::parse_html;
use proptest::prelude::*;
use std::time::Duration;

fn large_page(paragraphs: usize) -> String {
    let mut html = String::from("<html><body><main>");
    for i in 0..paragraphs {
        html.push_str(&format!("<div><p>Paragraph {}</p></div>", i));
    }
    html.push_str("</main></body></html>");
    html
}

#[test]
fn test_no_timeout() {
    let dom = parse_html(b"<h1>Title</h1><p>Content</p>").expect("Parse failed");
    let converter = MarkdownConverter::new();

    let mut ctx = ConversionContext::new(Duration::ZERO);
    let markdown = converter
        .convert_with_context(&dom.document, &mut ctx)
        .expect("Conversion failed");

    assert_eq!(markdown, "# Title\n\nContent");
}

#[test]
fn test_generous_timeout() {
    let dom = parse_html(b"<h1>Title</h1><p>Content</p>").expect("Parse failed");
    let converter = load_converter(ConverterOptions::default()).expect("load");

    let mut ctx = ConversionContext::new(Duration::from_secs(10));
    let markdown = converter
        .convert_with_context(&dom.document, &mut ctx)
        .expect("Conversion failed");

    assert!(markdown.contains("# Title"));
}

#[test]
fn test_timeout_detection() {
    let html = large_page(10_000);
    let dom = parse_html(html.as_bytes()).expect("Parse failed");
    let converter = MarkdownConverter::new();

    let mut ctx = ConversionContext::new(Duration::from_micros(1));
    std::thread::sleep(Duration::from_millis(1));

    match converter.convert_with_context(&dom.document, &mut ctx) {
        Err(ConversionError::Timeout) => {}
        Err(e) => panic!("Expected Timeout error, got: {:?}", e),
        Ok(_) => panic!("Expected timeout, but conversion succeeded"),
    }
}

#[test]
fn test_depth_limit() {
    let mut html = String::new();
    for _ in 0..60 {
        html.push_str("<div>");
    }
    html.push_str("deep");

    let dom = parse_html(html.as_bytes()).expect("Parse failed");
    let converter = MarkdownConverter::new();

    let mut ctx = ConversionContext::with_max_depth(Duration::ZERO, 50);
    match converter.convert_with_context(&dom.document, &mut ctx) {
        Err(ConversionError::DepthLimit(limit)) => assert_eq!(limit, 50),
        other => panic!("Expected DepthLimit, got: {:?}", other),
    }

    // The default limit leaves room for ordinary nesting
    let mut ctx = ConversionContext::new(Duration::ZERO);
    let markdown = converter
        .convert_with_context(&dom.document, &mut ctx)
        .expect("Conversion failed");
    assert_eq!(markdown, "deep");
}

fn nested_spans(levels: usize, text: &str) -> String {
    let mut html = String::from("<html><body>");
    for _ in 0..levels {
        html.push_str("<span>");
    }
    html.push_str(text);
    html
}

#[test]
fn test_extreme_nesting_is_depth_limit() {
    // Traversal up to the limit needs more than a default test thread stack
    let worker = std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(|| {
            let converter = MarkdownConverter::new();
            let mut results = Vec::new();
            for text in ["", "bottom"] {
                let html = nested_spans(100_000, text);
                let dom = parse_html(html.as_bytes()).expect("Parse failed");
                let mut ctx = ConversionContext::new(Duration::ZERO);
                results.push(converter.convert_with_context(&dom.document, &mut ctx));
            }
            results
        })
        .expect("spawn");

    for result in worker.join().expect("conversion thread panicked") {
        match result {
            Err(ConversionError::DepthLimit(limit)) => assert_eq!(limit, 1000),
            other => panic!("Expected DepthLimit, got: {:?}", other),
        }
    }
}

#[test]
fn test_node_count_tracking() {
    let html = large_page(250);
    let dom = parse_html(html.as_bytes()).expect("Parse failed");
    let converter = MarkdownConverter::new();

    let mut ctx = ConversionContext::new(Duration::from_secs(5));
    converter
        .convert_with_context(&dom.document, &mut ctx)
        .expect("Conversion failed");

    // 250 divs, 250 paragraphs and their text nodes at least
    assert!(ctx.node_count() > 750);
}

#[test]
fn test_elapsed_time_tracking() {
    let dom = parse_html(b"<p>Content</p>").expect("Parse failed");
    let converter = MarkdownConverter::new();

    let mut ctx = ConversionContext::new(Duration::from_secs(10));
    std::thread::sleep(Duration::from_millis(10));
    converter
        .convert_with_context(&dom.document, &mut ctx)
        .expect("Conversion failed");

    assert!(ctx.elapsed() >= Duration::from_millis(10));
}

proptest! {
    #[test]
    fn prop_cooperative_timeout_enforced_at_checkpoints(node_increments in 0u32..220) {
        let mut ctx = ConversionContext::new(Duration::from_nanos(1));
        std::thread::sleep(Duration::from_millis(1));

        let mut first_err_at: Option<u32> = None;
        for step in 1..=node_increments {
            if ctx.increment_and_check().is_err() {
                first_err_at = Some(step);
                break;
            }
        }

        if node_increments < 100 {
            prop_assert_eq!(first_err_at, None);
        } else {
            prop_assert_eq!(first_err_at, Some(100));
        }
    }
}
