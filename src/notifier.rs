//! Transient copy notifications
//!
//! A banner is shown as soon as the clipboard step finishes, stays up for a
//! fixed delay and is then dismissed. Both the surface and the clock are
//! traits so the show/sleep/dismiss order can be checked without a terminal.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use crate::clipboard::ClipboardOutcome;

/// How long a banner stays up
pub const DEFAULT_BANNER_DELAY: Duration = Duration::from_secs(2);

pub trait NotificationSurface {
    fn show(&mut self, message: &str);
    fn dismiss(&mut self);
}

pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Blocks the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Banner on a terminal stream
///
/// On an interactive terminal the banner is drawn on one line and erased on
/// dismissal. Anywhere else it is written as a plain line and left alone.
#[derive(Debug)]
pub struct TerminalSurface<W: Write> {
    out: W,
    erasable: bool,
    showing: bool,
}

impl TerminalSurface<io::Stderr> {
    pub fn stderr() -> Self {
        let erasable = io::stderr().is_terminal();
        Self::new(io::stderr(), erasable)
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, erasable: bool) -> Self {
        Self {
            out,
            erasable,
            showing: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> NotificationSurface for TerminalSurface<W> {
    fn show(&mut self, message: &str) {
        // A notification that cannot be drawn is not worth failing the copy over
        let written = if self.erasable {
            write!(self.out, "\r{}", message)
        } else {
            writeln!(self.out, "{}", message)
        };
        if let Err(e) = written.and_then(|_| self.out.flush()) {
            log::debug!("notification not shown: {}", e);
            return;
        }
        self.showing = true;
    }

    fn dismiss(&mut self) {
        if !self.showing {
            return;
        }
        self.showing = false;
        if self.erasable {
            if let Err(e) = write!(self.out, "\r\x1b[2K").and_then(|_| self.out.flush()) {
                log::debug!("notification not erased: {}", e);
            }
        }
    }
}

/// Banner text for a clipboard outcome
pub fn message(outcome: &ClipboardOutcome) -> String {
    match outcome {
        ClipboardOutcome::Copied => "✓ Markdown copied".to_string(),
        ClipboardOutcome::CopiedWithFallback { .. } => "✓ Markdown copied (fallback)".to_string(),
        ClipboardOutcome::Failed { fallback_error, .. } => {
            format!("✗ Markdown copy failed: {}", fallback_error)
        }
    }
}

pub struct Notifier<S: NotificationSurface, C: Sleeper> {
    surface: S,
    sleeper: C,
    delay: Duration,
    wait: bool,
}

impl<S: NotificationSurface, C: Sleeper> Notifier<S, C> {
    pub fn new(surface: S, sleeper: C) -> Self {
        Self {
            surface,
            sleeper,
            delay: DEFAULT_BANNER_DELAY,
            wait: true,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Show banners without waiting; they are left in place rather than
    /// dismissed early
    pub fn without_wait(mut self) -> Self {
        self.wait = false;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn notify(&mut self, outcome: &ClipboardOutcome) {
        self.surface.show(&message(outcome));
        if !self.wait {
            return;
        }
        self.sleeper.sleep(self.delay);
        self.surface.dismiss();
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}

impl Notifier<TerminalSurface<io::Stderr>, ThreadSleeper> {
    pub fn terminal() -> Self {
        Self::new(TerminalSurface::stderr(), ThreadSleeper)
    }
}
