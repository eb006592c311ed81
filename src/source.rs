use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;

/// Anything that can hand back the rendered HTML of a wiki URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Live wiki over HTTP. Collapsed table sections are present in the served
/// markup, so no client-side reveal step is needed.
pub struct HttpSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Network {
                url: String::new(),
                source,
            })?;
        Ok(HttpSource { client, timeout })
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let wrap = |source: reqwest::Error| {
            if source.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    after: self.timeout,
                }
            } else {
                FetchError::Network {
                    url: url.to_string(),
                    source,
                }
            }
        };

        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(wrap)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(wrap)
    }
}

/// Saved wiki snapshot: `<dir>/<last path segment>.html` per URL.
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirSource { dir: dir.into() }
    }

    pub fn path_for(&self, url: &str) -> Result<PathBuf, FetchError> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let page = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|p| !p.is_empty() && !p.contains(':') && *p != "." && *p != "..")
            .ok_or_else(|| FetchError::InvalidUrl {
                url: url.to_string(),
            })?;
        Ok(self.dir.join(format!("{}.html", page)))
    }
}

#[async_trait]
impl PageSource for DirSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let path = self.path_for(url)?;
        debug!("reading {} for {}", path.display(), url);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| FetchError::Io { path, source })
    }
}
