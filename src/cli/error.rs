//! CLI error types and conversions

use crate::downloader::DownloadError;
use crate::fetcher::FetcherError;
use crate::range::RangeError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Bad date input; nothing was fetched
    #[error("range error: {0}")]
    RangeError(#[from] RangeError),

    /// Run aborted
    #[error("download error: {0}")]
    DownloadError(#[from] DownloadError),

    /// Source could not be constructed
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
