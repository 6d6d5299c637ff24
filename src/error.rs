//! Error handling for the Trawl library.
//!
//! Every failure a download can run into is expressed as an [`Error`]. Since
//! the registry reports asynchronous outcomes through callbacks, these values
//! mostly reach callers as the argument of an error callback rather than as
//! the `Err` side of a returned `Result`.

use reqwest::StatusCode;
use std::io;
use thiserror::Error;

/// Errors that can happen when using Trawl.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from an underlying system.
    ///
    /// Captures failures that don't fit into other categories, such as a
    /// transfer task that stopped without reporting a terminal event.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Error from the underlying URL parser or the expected URL format.
    ///
    /// Returned when a requested URL cannot be parsed, uses a scheme other
    /// than HTTP(S), or has no path segment to derive a file name from.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// An identifier, file name or directory name that cannot be used.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The server answered with a status that does not carry the file.
    #[error("Unexpected HTTP status {status} for {url}")]
    Http { status: StatusCode, url: String },

    /// The registry was built outside of a Tokio runtime.
    #[error("A Tokio runtime is required to drive downloads")]
    NoRuntime,

    /// I/O Error.
    ///
    /// Wraps failures while creating directories, writing partial files or
    /// moving a finished file into place.
    #[error("I/O error")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    #[error("Reqwest Error")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error raised by the HTTP middleware stack (retries, tracing).
    #[error("HTTP middleware error")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },
}

/// Result type alias for operations that can fail with a Trawl error.
pub type Result<T> = std::result::Result<T, Error>;
