use std::path::PathBuf;
use thiserror::Error;

/// Why a single fetch did not produce a usable response.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Unavailable(String),

    #[error("cancelled")]
    Cancelled,
}

/// Fatal errors of a page download. Failures of individual assets are not
/// errors; they are reported through [`crate::DownloadReport::failed`].
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to fetch {url}: {source}")]
    FetchFailure {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("filesystem error at {}: {source}", .path.display())]
    FilesystemFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize document: {0}")]
    Markup(#[source] std::io::Error),

    #[error("download of {url} was cancelled")]
    Cancelled { url: String },
}

impl MirrorError {
    pub(crate) fn invalid_url(url: &str, reason: impl ToString) -> Self {
        MirrorError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::FilesystemFailure {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = MirrorError> = std::result::Result<T, E>;
