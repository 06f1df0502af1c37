//! fetchmd binary
//!
//! Reads a page, copies its main content to the clipboard as Markdown and
//! reports the outcome on stderr.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use fetchmd::clipboard::{CommandClipboard, SystemClipboard};
use fetchmd::config::{Settings, load_settings};
use fetchmd::notifier::Notifier;
use fetchmd::options::HeadingStyle;
use fetchmd::pipeline::{RunDeps, RunRequest, run};
use fetchmd::postprocess::IndentPolicy;
use fetchmd::source::PageSource;

/// Copy the main content of a web page to the clipboard as Markdown
#[derive(Parser, Debug)]
#[command(name = "fetchmd")]
#[command(version)]
struct Args {
    /// URL, file path, or `-` for standard input (the default)
    source: Option<String>,

    /// Settings file instead of the platform default
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Also write the Markdown to stdout
    #[arg(long)]
    print: bool,

    /// Skip the clipboard and print the Markdown instead
    #[arg(long)]
    no_clipboard: bool,

    /// Leave the banner in place instead of waiting to dismiss it
    #[arg(long)]
    no_wait: bool,

    /// Indentation inside fenced code blocks
    #[arg(long, value_name = "preserve|dedent|strip")]
    indent: Option<IndentPolicy>,

    #[arg(long, value_enum)]
    heading_style: Option<HeadingArg>,

    /// List bullet: -, + or *
    #[arg(long)]
    bullet: Option<char>,

    /// Give up converting after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Fallback copy command, e.g. "xclip -selection clipboard"
    #[arg(long, value_name = "COMMAND")]
    copy_command: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HeadingArg {
    Atx,
    Setext,
}

impl From<HeadingArg> for HeadingStyle {
    fn from(arg: HeadingArg) -> Self {
        match arg {
            HeadingArg::Atx => HeadingStyle::Atx,
            HeadingArg::Setext => HeadingStyle::Setext,
        }
    }
}

impl Args {
    /// Command-line flags win over the settings file
    fn apply(&self, settings: &mut Settings) {
        if let Some(indent) = self.indent {
            settings.indent = indent;
        }
        if let Some(style) = self.heading_style {
            settings.converter.heading_style = style.into();
        }
        if let Some(bullet) = self.bullet {
            settings.converter.bullet_list_marker = bullet;
        }
        if let Some(ms) = self.timeout_ms {
            settings.timeout_ms = Some(ms);
        }
        if let Some(command) = &self.copy_command {
            settings.copy_command = Some(command.clone());
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match try_main(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("fetchmd: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn try_main(args: &Args) -> Result<u8> {
    let mut settings = load_settings(args.config.as_deref()).context("loading settings")?;
    args.apply(&mut settings);

    let mut fallback = match settings.copy_command.as_deref() {
        Some(line) => CommandClipboard::from_command_line(line)
            .with_context(|| format!("empty copy command {:?}", line))?,
        None => CommandClipboard::platform_default(),
    };
    log::debug!("fallback copy command: {}", fallback.program());

    // Declared before the notifier so the clipboard handle outlives the banner
    let mut primary = SystemClipboard::new();

    let mut notifier = Notifier::terminal().with_delay(settings.notify_delay());
    if args.no_wait {
        notifier = notifier.without_wait();
    }

    let request = RunRequest {
        source: PageSource::from_arg(args.source.as_deref()),
        settings,
        copy: !args.no_clipboard,
    };

    let report = run(
        &request,
        RunDeps {
            primary: &mut primary,
            fallback: &mut fallback,
            notifier: &mut notifier,
        },
    )
    .with_context(|| format!("copying {}", request.source))?;

    log::info!("selected {}", report.candidate);

    if args.print || args.no_clipboard {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", report.markdown).context("writing to stdout")?;
    }

    Ok(report.exit_code() as u8)
}
