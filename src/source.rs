//! Where page bytes come from
//!
//! A page is either downloaded, read from a file, or read from standard
//! input. The bytes are kept undecoded along with the Content-Type so the
//! charset cascade in [`crate::charset`] can run on them.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::error::SourceError;

/// Default HTTP timeout
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("fetchmd/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    Url(String),
    File(PathBuf),
    Stdin,
}

/// Raw page bytes plus what is known about their encoding
#[derive(Debug, Clone)]
pub struct Page {
    pub html: Vec<u8>,
    pub content_type: Option<String>,
    /// URL, path or `<stdin>`
    pub origin: String,
}

/// HTTP settings for [`PageSource::Url`]
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl PageSource {
    /// Interpret a command-line argument
    ///
    /// `None` and `-` mean standard input, `http://` and `https://` prefixes
    /// mean a URL, anything else is a path.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None | Some("-") => PageSource::Stdin,
            Some(s) if is_url(s) => PageSource::Url(s.to_string()),
            Some(s) => PageSource::File(PathBuf::from(s)),
        }
    }

    pub fn load(&self, fetch: &FetchOptions) -> Result<Page, SourceError> {
        match self {
            PageSource::Url(url) => fetch_page(url, fetch),
            PageSource::File(path) => {
                let origin = path.display().to_string();
                let html = std::fs::read(path).map_err(|source| SourceError::Io {
                    origin: origin.clone(),
                    source,
                })?;
                Ok(Page {
                    html,
                    content_type: None,
                    origin,
                })
            }
            PageSource::Stdin => read_page(std::io::stdin().lock(), "<stdin>"),
        }
    }
}

impl fmt::Display for PageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSource::Url(url) => f.write_str(url),
            PageSource::File(path) => write!(f, "{}", path.display()),
            PageSource::Stdin => f.write_str("<stdin>"),
        }
    }
}

fn is_url(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Read a whole page from any reader
pub fn read_page<R: Read>(mut reader: R, origin: &str) -> Result<Page, SourceError> {
    let mut html = Vec::new();
    reader
        .read_to_end(&mut html)
        .map_err(|source| SourceError::Io {
            origin: origin.to_string(),
            source,
        })?;
    Ok(Page {
        html,
        content_type: None,
        origin: origin.to_string(),
    })
}

fn fetch_page(url: &str, fetch: &FetchOptions) -> Result<Page, SourceError> {
    let http_error = |e: reqwest::Error| SourceError::Http {
        url: url.to_string(),
        message: e.to_string(),
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(fetch.timeout)
        .user_agent(fetch.user_agent.as_str())
        .build()
        .map_err(http_error)?;

    log::debug!("fetching {}", url);
    let response = client.get(url).send().map_err(http_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let html = response.bytes().map_err(http_error)?.to_vec();

    log::debug!(
        "fetched {} bytes from {} ({})",
        html.len(),
        url,
        content_type.as_deref().unwrap_or("no content type")
    );

    Ok(Page {
        html,
        content_type,
        origin: url.to_string(),
    })
}
