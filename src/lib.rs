//! Trawl coordinates concurrent, resumable HTTP downloads for an
//! application.
//!
//! A [`DownloadRegistry`] keeps at most one transfer running per download
//! identifier. Every caller asking for the same identifier registers its own
//! [`Callbacks`] and hears about progress, time remaining, completion,
//! failure and cancellation. Interrupted downloads resume from their partial
//! file.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use trawl::{Callbacks, DownloadRequest, Error, RegistryBuilder};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let registry = RegistryBuilder::new()
//!     .directory(PathBuf::from("output"))
//!     .build()?;
//!
//! let reqwest_rs = "https://github.com/seanmonstar/reqwest/archive/refs/tags/v0.11.9.zip";
//! registry.request(
//!     DownloadRequest::new(reqwest_rs).directory("sources"),
//!     Callbacks::new().on_complete(|_, path| println!("saved {:?}", path)),
//! );
//! assert!(registry.is_downloading(reqwest_rs));
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`download`] - requests, callback sets and per-download records
//! - [`registry`] - the [`DownloadRegistry`] and its [`RegistryBuilder`]
//! - [`transport`] - the [`Transport`] seam and the HTTP implementation
//! - [`files`] - mapping identifiers onto files and directories
//! - [`progress`] - fractions, transfer rates and remaining time
//! - [`error`] - centralized error handling with the `Error` enum
//! - [`http`] - HTTP client creation and middleware
//! - [`utils`] - shared header parsing helpers

pub mod download;
pub mod error;
pub mod files;
pub mod http;
pub mod progress;
pub mod registry;
pub mod transport;
pub mod utils;

pub use download::{Callbacks, DownloadRecord, DownloadRequest};
pub use error::{Error, Result};
pub use files::FileLocator;
pub use http::{create_http_client, HttpClientConfig};
pub use registry::{DownloadRegistry, RegistryBuilder, RegistryConfig};
pub use transport::{EventSink, HttpTransport, Transfer, TransferEvent, TransferHandle, Transport};
