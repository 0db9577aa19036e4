//! Error types for the cache engine.

use thiserror::Error;

/// Error produced by a cell loader.
///
/// Loaders pull cell payloads from whatever backing store the application
/// uses (files, decoders, generators). The engine treats the failure as
/// opaque: blocking accesses surface it to the caller, background fetches
/// report it to the [`DataListener`](crate::fetcher::DataListener) and
/// leave the entry invalid.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The loader reported a failure for the requested cell.
    #[error("cell load failed: {0}")]
    Failed(String),

    /// I/O error while loading a cell.
    #[error("cell load I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Convenience constructor for message-only failures.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Errors arising from engine configuration or misuse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// A hint referenced a priority level outside the configured range.
    #[error("invalid priority {priority}: engine has {levels} priority levels")]
    InvalidPriority { priority: usize, levels: usize },

    /// The engine configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
