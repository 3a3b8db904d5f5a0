//! Errors that can occur while fetching

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during a download or a redirect resolution
#[derive(Debug, Error)]
pub enum FetchError {
    /// The input could not be parsed as an absolute URL
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection, TLS or body transfer failure
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The redirect chain exceeded the configured cap
    #[error("too many redirects (limit {0})")]
    TooManyRedirects(usize),

    /// The final response did not carry the expected status
    #[error("HTTP error: {0}")]
    HttpStatus(u16),

    /// Filesystem failure at the destination
    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        FetchError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}
