//! End-to-end page copy tests
//!
//! These go through the public API the binary uses: load a converter, turn
//! a page into Markdown, and hand it to the clipboard writers.

use fetchmd::clipboard::{ClipboardBackend, ClipboardOutcome, CommandClipboard, write_with_fallback};
use fetchmd::config::Settings;
use fetchmd::error::ClipboardError;
use fetchmd::loader::load_converter;
use fetchmd::notifier::{NotificationSurface, Notifier, Sleeper};
use fetchmd::options::ConverterOptions;
use fetchmd::pipeline::{RunDeps, RunRequest, convert_page, run};
use fetchmd::postprocess::IndentPolicy;
use fetchmd::selector::Candidate;
use fetchmd::source::{Page, PageSource};
use std::time::Duration;

fn page(html: &[u8], content_type: Option<&str>) -> Page {
    Page {
        html: html.to_vec(),
        content_type: content_type.map(str::to_string),
        origin: "test".to_string(),
    }
}

fn copy_markdown(html: &str) -> (Candidate, String) {
    let converter = load_converter(ConverterOptions::default()).expect("defaults load");
    convert_page(
        &page(html.as_bytes(), None),
        converter.as_ref(),
        IndentPolicy::Preserve,
        None,
    )
    .expect("conversion succeeds")
}

const BLOG_POST: &str = r#"<!DOCTYPE html>
<html>
<head><title>Post</title><style>body { color: red }</style></head>
<body>
  <header><nav><a href="/">Home</a></nav></header>
  <div class="sidebar content-extra">Related</div>
  <main>
    <h1>Release notes</h1>
    <p>Version <strong>2.0</strong> is out.<br>Upgrade today.</p>
    <ul><li>Faster</li><li>Smaller</li></ul>
    <pre><code class="language-sh">cargo install fetchmd</code></pre>
  </main>
  <footer>(c) 2024</footer>
  <script>track()</script>
</body>
</html>"#;

#[test]
fn test_blog_post_main_content() {
    let (candidate, markdown) = copy_markdown(BLOG_POST);

    assert_eq!(candidate, Candidate::Main);
    assert_eq!(
        markdown,
        "# Release notes\n\nVersion **2.0** is out.\nUpgrade today.\n\n- Faster\n- Smaller\n```\ncargo install fetchmd\n```"
    );
}

#[test]
fn test_main_wins_over_everything_else() {
    let html = "<body><div class=\"content\">c</div><article>a</article><main>m</main></body>";
    let (candidate, markdown) = copy_markdown(html);
    assert_eq!(candidate, Candidate::Main);
    assert_eq!(markdown, "m");
}

#[test]
fn test_content_class_before_body() {
    let html = "<body><p>chrome</p><section class=\"page content\"><p>story</p></section></body>";
    let (candidate, markdown) = copy_markdown(html);
    assert_eq!(candidate, Candidate::ContentClass);
    assert_eq!(markdown, "story");
}

#[test]
fn test_body_fallback_keeps_page_chrome() {
    let html = "<body><nav>menu</nav><p>text</p></body>";
    let (candidate, markdown) = copy_markdown(html);
    assert_eq!(candidate, Candidate::Body);
    assert_eq!(markdown, "menu\n\ntext");
}

#[test]
fn test_nested_formatting_in_pre_is_flattened() {
    let (_, markdown) = copy_markdown("<main><pre>foo<b>bar</b></pre></main>");
    assert_eq!(markdown, "```\nfoobar\n```");
}

#[test]
fn test_legacy_charset_from_content_type() {
    let converter = load_converter(ConverterOptions::default()).expect("defaults load");
    let (_, markdown) = convert_page(
        &page(b"<main><p>caf\xe9</p></main>", Some("text/html; charset=windows-1252")),
        converter.as_ref(),
        IndentPolicy::Preserve,
        None,
    )
    .expect("conversion succeeds");
    assert_eq!(markdown, "caf\u{e9}");
}

#[test]
fn test_indent_policies_on_code_blocks() {
    let converter = load_converter(ConverterOptions::default()).expect("defaults load");
    let html = b"<main><pre>    fn a() {}\n        b();</pre></main>";

    let convert = |policy| {
        convert_page(&page(html, None), converter.as_ref(), policy, None)
            .expect("conversion succeeds")
            .1
    };

    assert_eq!(
        convert(IndentPolicy::Preserve),
        "```\n    fn a() {}\n        b();\n```"
    );
    assert_eq!(convert(IndentPolicy::Dedent), "```\nfn a() {}\n    b();\n```");
    assert_eq!(convert(IndentPolicy::Strip), "```\nfn a() {}\nb();\n```");
}

struct Unavailable;

impl ClipboardBackend for Unavailable {
    fn write_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::AccessError("no display".to_string()))
    }
}

struct Quiet(Vec<String>);
struct Instant;

impl NotificationSurface for Quiet {
    fn show(&mut self, message: &str) {
        self.0.push(message.to_string());
    }
    fn dismiss(&mut self) {}
}

impl Sleeper for Instant {
    fn sleep(&mut self, _duration: Duration) {}
}

#[cfg(unix)]
#[test]
fn test_fallback_command_receives_markdown() {
    let staging = tempfile::tempdir().expect("staging dir");
    let out = tempfile::tempdir().expect("output dir");
    let target = out.path().join("clipboard.md");
    let script = format!("cat > '{}'", target.display());
    let mut fallback =
        CommandClipboard::new("sh", &["-c", &script]).with_staging_dir(staging.path());

    let outcome = write_with_fallback(&mut Unavailable, &mut fallback, "# Copied\n");

    assert!(matches!(outcome, ClipboardOutcome::CopiedWithFallback { .. }));
    assert_eq!(std::fs::read_to_string(&target).expect("copied"), "# Copied\n");
    assert_eq!(std::fs::read_dir(staging.path()).expect("list").count(), 0);
}

#[cfg(unix)]
#[test]
fn test_failed_fallback_cleans_up_and_exits_two() {
    let staging = tempfile::tempdir().expect("staging dir");
    let page_dir = tempfile::tempdir().expect("page dir");
    let page_path = page_dir.path().join("page.html");
    std::fs::write(&page_path, "<article><p>hello</p></article>").expect("write page");

    let mut fallback =
        CommandClipboard::new("sh", &["-c", "exit 1"]).with_staging_dir(staging.path());
    let mut notifier = Notifier::new(Quiet(Vec::new()), Instant);
    let request = RunRequest {
        source: PageSource::File(page_path),
        settings: Settings::default(),
        copy: true,
    };

    let report = run(
        &request,
        RunDeps {
            primary: &mut Unavailable,
            fallback: &mut fallback,
            notifier: &mut notifier,
        },
    )
    .expect("pipeline succeeds up to the clipboard");

    assert_eq!(report.markdown, "hello");
    assert_eq!(report.exit_code(), 2);
    assert_eq!(std::fs::read_dir(staging.path()).expect("list").count(), 0);

    let shown = notifier.into_surface().0;
    assert_eq!(shown.len(), 1);
    assert!(shown[0].starts_with("✗ Markdown copy failed: Copy command error: sh exited with"));
}
