//! One invocation, start to finish
//!
//! load converter -> load page -> parse -> select -> convert -> post-process
//! -> clipboard -> notify
//!
//! Every stage before the clipboard either succeeds or stops the run with a
//! [`FetchmdError`]. The clipboard stage never errors; its result is the
//! [`ClipboardOutcome`] in the report.

use std::time::Duration;

use crate::clipboard::{ClipboardBackend, ClipboardOutcome, write_with_fallback};
use crate::config::Settings;
use crate::converter::{ConversionContext, HtmlToMarkdown};
use crate::error::FetchmdError;
use crate::loader::load_converter;
use crate::notifier::{NotificationSurface, Notifier, Sleeper};
use crate::parser::parse_html_with_charset;
use crate::postprocess::{IndentPolicy, postprocess};
use crate::selector::{Candidate, select_content};
use crate::source::{FetchOptions, Page, PageSource};

/// Exit status when both clipboard paths failed
pub const EXIT_COPY_FAILED: i32 = 2;

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub source: PageSource,
    pub settings: Settings,
    /// `false` skips the clipboard and the notification
    pub copy: bool,
}

/// The side-effecting collaborators of a run
pub struct RunDeps<'a, S: NotificationSurface, C: Sleeper> {
    pub primary: &'a mut dyn ClipboardBackend,
    pub fallback: &'a mut dyn ClipboardBackend,
    pub notifier: &'a mut Notifier<S, C>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub candidate: Candidate,
    pub markdown: String,
    /// `None` when the clipboard was skipped
    pub outcome: Option<ClipboardOutcome>,
}

impl RunReport {
    /// 0 unless the clipboard write failed on both paths
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            Some(ClipboardOutcome::Failed { .. }) => EXIT_COPY_FAILED,
            _ => 0,
        }
    }
}

pub fn run<S: NotificationSurface, C: Sleeper>(
    request: &RunRequest,
    deps: RunDeps<'_, S, C>,
) -> Result<RunReport, FetchmdError> {
    let settings = &request.settings;
    let converter = load_converter(settings.converter.clone())?;

    let fetch = FetchOptions {
        timeout: settings.fetch_timeout(),
        ..Default::default()
    };
    let page = request.source.load(&fetch)?;
    log::info!("loaded {} bytes from {}", page.html.len(), page.origin);

    let (candidate, markdown) = convert_page(
        &page,
        converter.as_ref(),
        settings.indent,
        settings.conversion_timeout(),
    )?;

    if !request.copy {
        return Ok(RunReport {
            candidate,
            markdown,
            outcome: None,
        });
    }

    let outcome = write_with_fallback(deps.primary, deps.fallback, &markdown);
    match &outcome {
        ClipboardOutcome::Copied => log::info!("copied {} bytes", markdown.len()),
        ClipboardOutcome::CopiedWithFallback { .. } => {
            log::info!("copied {} bytes with the fallback command", markdown.len())
        }
        ClipboardOutcome::Failed {
            primary_error,
            fallback_error,
        } => log::error!("copy failed: {}; fallback: {}", primary_error, fallback_error),
    }
    deps.notifier.notify(&outcome);

    Ok(RunReport {
        candidate,
        markdown,
        outcome: Some(outcome),
    })
}

/// Parse, select, convert and post-process a loaded page
///
/// `timeout` of `None` converts without a time limit.
pub fn convert_page(
    page: &Page,
    converter: &dyn HtmlToMarkdown,
    indent: IndentPolicy,
    timeout: Option<Duration>,
) -> Result<(Candidate, String), FetchmdError> {
    let dom = parse_html_with_charset(&page.html, page.content_type.as_deref())?;
    let selection = select_content(&dom);

    let mut ctx = ConversionContext::new(timeout.unwrap_or(Duration::ZERO));
    let markdown = converter.convert_with_context(&selection.node, &mut ctx)?;
    log::debug!(
        "converted {} from {} nodes in {:?}",
        selection.candidate,
        ctx.node_count(),
        ctx.elapsed()
    );

    Ok((selection.candidate, postprocess(&markdown, indent)))
}
