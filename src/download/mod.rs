//! Download module containing the per-download types.
//!
//! - [`request`] - [`DownloadRequest`], what a caller asks for
//! - [`callbacks`] - [`Callbacks`], the handler set one caller registers
//! - [`record`] - [`DownloadRecord`], the registry's state for one identifier
//!
//! # Examples
//!
//! ```rust
//! use trawl::download::{Callbacks, DownloadRequest};
//!
//! let request = DownloadRequest::new("https://example.com/file.zip").directory("pkgs");
//! let callbacks = Callbacks::new()
//!     .on_progress(|id, fraction| println!("{}: {:.1}%", id, fraction * 100.0))
//!     .on_complete(|id, path| println!("{} -> {:?}", id, path));
//! # let _ = (request, callbacks);
//! ```

pub mod callbacks;
pub mod record;
pub mod request;

pub use callbacks::{
    BackgroundHandler, Callbacks, CancelCallback, CompletionCallback, ErrorCallback,
    ProgressCallback, RemainingTimeCallback,
};
pub use record::DownloadRecord;
pub use request::DownloadRequest;
