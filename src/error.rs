//! Error types for every stage of an invocation
//!
//! Each stage owns a small enum. [`FetchmdError`] wraps them so the
//! pipeline can use `?` across stage boundaries.

use std::fmt;

/// Errors that can occur during HTML to Markdown conversion
#[derive(Debug)]
pub enum ConversionError {
    /// HTML parsing failed
    ParseError(String),
    /// Character encoding error
    EncodingError(String),
    /// Conversion timeout exceeded
    Timeout,
    /// Element nesting deeper than the converter allows
    DepthLimit(usize),
    /// Invalid input data
    InvalidInput(String),
    /// Internal error
    InternalError(String),
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConversionError::EncodingError(msg) => write!(f, "Encoding error: {}", msg),
            ConversionError::Timeout => write!(f, "Conversion timeout exceeded"),
            ConversionError::DepthLimit(max) => {
                write!(f, "Nesting depth exceeds maximum of {}", max)
            }
            ConversionError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            ConversionError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ConversionError {}

/// Errors raised while resolving the converter at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// A style option has a value the converter cannot emit
    InvalidOption { option: &'static str, value: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::InvalidOption { option, value } => {
                write!(f, "Invalid converter option {}: {:?}", option, value)
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Errors raised while obtaining page bytes
#[derive(Debug)]
pub enum SourceError {
    /// Reading a local file or stdin failed
    Io { origin: String, source: std::io::Error },
    /// The HTTP request could not be made or its body could not be read
    Http { url: String, message: String },
    /// The server answered with a non-success status
    Status { url: String, status: u16 },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io { origin, source } => write!(f, "Failed to read {}: {}", origin, source),
            SourceError::Http { url, message } => write!(f, "Failed to fetch {}: {}", url, message),
            SourceError::Status { url, status } => {
                write!(f, "Fetching {} returned HTTP status {}", url, status)
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors that can occur during clipboard operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// Failed to access clipboard
    AccessError(String),
    /// Failed to set clipboard content
    WriteError(String),
    /// The staged copy command could not be prepared or run
    CommandError(String),
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardError::AccessError(msg) => write!(f, "Clipboard access error: {}", msg),
            ClipboardError::WriteError(msg) => write!(f, "Clipboard write error: {}", msg),
            ClipboardError::CommandError(msg) => write!(f, "Copy command error: {}", msg),
        }
    }
}

impl std::error::Error for ClipboardError {}

/// Errors raised while loading the settings file
#[derive(Debug)]
pub enum ConfigError {
    /// The file exists but could not be read
    Read { path: String, source: std::io::Error },
    /// The file is not valid TOML for [`crate::config::Settings`]
    Parse { path: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config {}: {}", path, source)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "Invalid config {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Any failure that stops an invocation before the clipboard step
#[derive(Debug)]
pub enum FetchmdError {
    Load(LoadError),
    Source(SourceError),
    Conversion(ConversionError),
}

impl fmt::Display for FetchmdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchmdError::Load(e) => write!(f, "{}", e),
            FetchmdError::Source(e) => write!(f, "{}", e),
            FetchmdError::Conversion(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for FetchmdError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchmdError::Load(e) => Some(e),
            FetchmdError::Source(e) => Some(e),
            FetchmdError::Conversion(e) => Some(e),
        }
    }
}

impl From<LoadError> for FetchmdError {
    fn from(err: LoadError) -> Self {
        FetchmdError::Load(err)
    }
}

impl From<SourceError> for FetchmdError {
    fn from(err: SourceError) -> Self {
        FetchmdError::Source(err)
    }
}

impl From<ConversionError> for FetchmdError {
    fn from(err: ConversionError) -> Self {
        FetchmdError::Conversion(err)
    }
}
