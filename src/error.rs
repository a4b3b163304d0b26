//! Error types for cachewire
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Unified error type for cachewire operations
#[derive(Debug, Error)]
pub enum CacheError {
    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    #[error("bad argument: {0}")]
    Argument(String),

    // -------------------------------------------------------------------------
    // Buffer Errors
    // -------------------------------------------------------------------------
    #[error("buffer overflow")]
    Overflow,

    #[error("buffer underflow")]
    Underflow,

    #[error("out of memory")]
    Alloc,

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("encoding error: {0}")]
    Encode(String),

    #[error("bad codec version")]
    Version,

    #[error("corrupt data: {0}")]
    Corrupt(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("error resolving {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: String,
        source: std::io::Error,
    },

    #[error("error connecting to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: String,
        source: std::io::Error,
    },

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("client is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server error ({0})")]
    Server(u16),
}
