use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::model::Category;

/// Why a listing row was skipped. Never fatal for the table or the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("row has {found} cells, needs at least {required}")]
    TooFewCells { found: usize, required: usize },
    #[error("first cell has no link")]
    MissingLink,
    #[error("name cell is empty")]
    EmptyName,
}

/// A page could not be obtained from the page source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {:.1}s fetching {url}", .after.as_secs_f64())]
    Timeout { url: String, after: Duration },
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// A listing page failed, so the whole category is emitted empty.
#[derive(Debug, Error)]
#[error("{category} listing unavailable: {error}")]
pub struct CategoryFailure {
    pub category: Category,
    #[source]
    pub error: FetchError,
}
