//! Walk a few pages through selection, conversion and post-processing

use fetchmd::loader::load_converter;
use fetchmd::options::{ConverterOptions, HeadingStyle};
use fetchmd::parser::parse_html;
use fetchmd::postprocess::{IndentPolicy, postprocess};
use fetchmd::selector::select_content;

fn main() {
    println!("=== fetchmd - Basic Examples ===\n");

    show(
        "Main element wins over page chrome",
        b"<body><nav>Home | Docs</nav><main><h1>Welcome</h1><p>This is a test document.</p></main></body>",
        ConverterOptions::default(),
        IndentPolicy::Preserve,
    );

    show(
        "Code, line breaks and lists",
        b"<article><p>Run <code>make</code> then:<br>check the output</p><ul><li>one</li><li>two</li></ul></article>",
        ConverterOptions::default(),
        IndentPolicy::Preserve,
    );

    show(
        "Setext headings, `*` bullets, dedented code",
        b"<div class=\"post content\"><h2>Setup</h2><ul><li>clone</li></ul><pre>    cargo build\n      --release</pre></div>",
        ConverterOptions {
            heading_style: HeadingStyle::Setext,
            bullet_list_marker: '*',
            ..Default::default()
        },
        IndentPolicy::Dedent,
    );

    show(
        "Body fallback",
        b"<h1>Title</h1><script>alert('x')</script><p>Safe content</p>",
        ConverterOptions::default(),
        IndentPolicy::Preserve,
    );
}

fn show(title: &str, html: &[u8], options: ConverterOptions, indent: IndentPolicy) {
    println!("{}", title);
    println!("Input HTML:");
    println!("{}\n", String::from_utf8_lossy(html));

    let converter = load_converter(options).expect("options are valid");
    let dom = parse_html(html).expect("Parse failed");
    let selection = select_content(&dom);
    let markdown = converter.convert(&selection.node).expect("Conversion failed");

    println!("Selected: {}", selection.candidate);
    println!("Output Markdown:");
    println!("{}", postprocess(&markdown, indent));
    println!("---\n");
}
