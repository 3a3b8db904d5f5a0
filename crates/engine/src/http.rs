//! HTTP download and redirect resolution

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::filename::{self, DEFAULT_FILENAME};
use crate::FetchError;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Value of the User-Agent header
    pub user_agent: String,
    /// Number of redirect hops followed before a request is aborted
    pub max_redirects: usize,
    /// Time allowed for establishing a connection
    pub connect_timeout: Duration,
    /// Filename reported when neither headers nor URL provide one
    pub fallback_filename: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("fetchshim/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 10,
            connect_timeout: Duration::from_secs(30),
            fallback_filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

/// Outcome of following a URL's redirect chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// URL of the last response in the chain
    pub final_url: Url,
    /// Filename suggested by that response
    pub filename: String,
}

/// HTTP fetcher shared by both operations
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    /// Creates a fetcher with the default config
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(FetchConfig::default())
    }

    /// Creates a fetcher with a custom config
    pub fn with_config(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .redirect(redirect_policy(config.max_redirects))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, config })
    }

    /// Returns the active config
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Downloads a file from URL to the specified path
    ///
    /// Missing parent directories are created first. Only a final `200 OK`
    /// is accepted. A partially written file is removed on failure.
    ///
    /// # Returns
    ///
    /// Returns the total number of bytes written
    pub async fn download(&self, url: &str, path: &Path) -> Result<u64, FetchError> {
        let url = parse_url(url)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::io("create directory", parent, e))?;
        }

        let response = self.send(url).await?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let mut file = File::create(path)
            .await
            .map_err(|e| FetchError::io("create file", path, e))?;

        match stream_to_file(response, &mut file, path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes, "download complete");
                Ok(bytes)
            }
            Err(err) => {
                drop(file);
                if let Err(cleanup) = fs::remove_file(path).await {
                    debug!(path = %path.display(), error = %cleanup, "failed to remove partial file");
                }
                Err(err)
            }
        }
    }

    /// Follows the redirect chain of a URL and names its target
    ///
    /// The body of the final response is never read.
    pub async fn resolve(&self, url: &str) -> Result<Resolved, FetchError> {
        let url = parse_url(url)?;
        let response = self.send(url).await?;

        let final_url = response.url().clone();
        let filename = filename::from_response(
            response.headers(),
            &final_url,
            &self.config.fallback_filename,
        );

        debug!(%final_url, %filename, status = response.status().as_u16(), "resolved");
        Ok(Resolved {
            final_url,
            filename,
        })
    }

    async fn send(&self, url: Url) -> Result<Response, FetchError> {
        self.client.get(url).send().await.map_err(|e| {
            if e.is_redirect() {
                FetchError::TooManyRedirects(self.config.max_redirects)
            } else {
                FetchError::Network(e)
            }
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, FetchError> {
    Url::parse(raw).map_err(|source| FetchError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

// hop n (1-based) is followed while n <= max_redirects
fn redirect_policy(max_redirects: usize) -> Policy {
    Policy::custom(move |attempt| {
        let hop = attempt.previous().len();
        if hop > max_redirects {
            return attempt.error(format!("stopped after {max_redirects} redirects"));
        }
        debug!(hop, status = attempt.status().as_u16(), to = %attempt.url(), "following redirect");
        attempt.follow()
    })
}

async fn stream_to_file(response: Response, file: &mut File, path: &Path) -> Result<u64, FetchError> {
    let mut bytes_written = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;

        file.write_all(&chunk)
            .await
            .map_err(|e| FetchError::io("write", path, e))?;

        bytes_written += chunk.len() as u64;
    }

    // ensure all data is written to disk
    file.flush()
        .await
        .map_err(|e| FetchError::io("flush", path, e))?;

    Ok(bytes_written)
}
