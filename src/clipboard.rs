//! Clipboard writers
//!
//! The system clipboard is tried first. When it cannot be reached (no
//! display server, a headless session, a sandbox) the text is staged in a
//! temporary file and piped into the platform's copy command instead.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use arboard::Clipboard;
use tempfile::NamedTempFile;

use crate::error::ClipboardError;

/// Something that can take ownership of a string as clipboard text
pub trait ClipboardBackend {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The desktop clipboard, through arboard
///
/// The arboard handle is opened on first write and kept until this value is
/// dropped. On Linux the process serves the selection itself, so the contents
/// only outlive the handle when a clipboard manager takes them over. Keep the
/// value alive until the run has finished reporting.
#[derive(Default)]
pub struct SystemClipboard {
    clipboard: Option<Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a handle has been opened
    pub fn is_held(&self) -> bool {
        self.clipboard.is_some()
    }

    fn handle(&mut self) -> Result<&mut Clipboard, ClipboardError> {
        let clipboard = match self.clipboard.take() {
            Some(clipboard) => clipboard,
            None => Clipboard::new().map_err(|e| ClipboardError::AccessError(e.to_string()))?,
        };
        Ok(self.clipboard.insert(clipboard))
    }
}

impl std::fmt::Debug for SystemClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemClipboard")
            .field("held", &self.is_held())
            .finish()
    }
}

impl ClipboardBackend for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.handle()?
            .set_text(text)
            .map_err(|e| ClipboardError::WriteError(e.to_string()))
    }
}

/// Copy through an external command that reads the text from stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
    staging_dir: Option<PathBuf>,
}

impl CommandClipboard {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            staging_dir: None,
        }
    }

    /// Parse a whitespace-separated command line such as `xclip -selection clipboard`
    ///
    /// Returns `None` for an empty line. Quoting is not interpreted.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self {
            program: program.to_string(),
            args: parts.map(str::to_string).collect(),
            staging_dir: None,
        })
    }

    /// The copy command for the current platform
    ///
    /// - macOS: `pbcopy`
    /// - Windows: `clip`
    /// - otherwise `wl-copy` under Wayland, `xclip -selection clipboard` elsewhere
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("pbcopy", &[])
        } else if cfg!(windows) {
            Self::new("clip", &[])
        } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            Self::new("wl-copy", &[])
        } else {
            Self::new("xclip", &["-selection", "clipboard"])
        }
    }

    /// Stage text in `dir` instead of the system temporary directory
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn stage(&self, text: &str) -> Result<NamedTempFile, ClipboardError> {
        let staged = match &self.staging_dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(|e| ClipboardError::WriteError(format!("cannot stage text: {}", e)))?;

        let mut file = staged.as_file();
        file.write_all(text.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| ClipboardError::WriteError(format!("cannot stage text: {}", e)))?;

        Ok(staged)
    }

    fn pipe(&self, staged: &Path, input: File) -> Result<(), ClipboardError> {
        log::debug!("piping {} into {}", staged.display(), self.program);

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::from(input))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ClipboardError::CommandError(format!("{}: {}", self.program, e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        Err(ClipboardError::CommandError(if stderr.is_empty() {
            format!("{} exited with {}", self.program, output.status)
        } else {
            format!("{} exited with {}: {}", self.program, output.status, stderr)
        }))
    }
}

impl ClipboardBackend for CommandClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let staged = self.stage(text)?;

        let result = staged
            .reopen()
            .map_err(|e| ClipboardError::WriteError(format!("cannot reopen staged text: {}", e)))
            .and_then(|input| self.pipe(staged.path(), input));

        // The staged file goes away whatever the command did
        if let Err(e) = staged.close() {
            log::warn!("failed to remove staged clipboard text: {}", e);
        }

        result
    }
}

/// How the clipboard write ended
#[derive(Debug, Clone, PartialEq)]
pub enum ClipboardOutcome {
    Copied,
    CopiedWithFallback {
        primary_error: ClipboardError,
    },
    Failed {
        primary_error: ClipboardError,
        fallback_error: ClipboardError,
    },
}

impl ClipboardOutcome {
    pub fn is_copied(&self) -> bool {
        !matches!(self, ClipboardOutcome::Failed { .. })
    }
}

/// Write `text` with `primary`, falling back to `fallback` only if it fails
pub fn write_with_fallback(
    primary: &mut dyn ClipboardBackend,
    fallback: &mut dyn ClipboardBackend,
    text: &str,
) -> ClipboardOutcome {
    let primary_error = match primary.write_text(text) {
        Ok(()) => return ClipboardOutcome::Copied,
        Err(e) => e,
    };
    log::warn!("{}; trying fallback copy", primary_error);

    match fallback.write_text(text) {
        Ok(()) => ClipboardOutcome::CopiedWithFallback { primary_error },
        Err(fallback_error) => ClipboardOutcome::Failed {
            primary_error,
            fallback_error,
        },
    }
}
