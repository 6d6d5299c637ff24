//! Callback sets registered against a download.
//!
//! A [`Callbacks`] value is the handler tuple one caller registers for one
//! request. Several callers asking for the same identifier each contribute
//! their own set; the registry notifies all of them, in registration order.
//!
//! Handlers are stored as `Arc`s so a caller can keep a clone of the exact
//! instance it registered and later ask the registry whether that specific
//! subscription is still active.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use trawl::download::{Callbacks, ProgressCallback};
//!
//! let progress: ProgressCallback = Arc::new(|id, fraction| {
//!     println!("{}: {:.0}%", id, fraction * 100.0);
//! });
//!
//! let callbacks = Callbacks::new()
//!     .with_progress(progress.clone())
//!     .on_complete(|id, path| println!("{} saved to {:?}", id, path))
//!     .on_error(|id, error| eprintln!("{} failed: {}", id, error));
//!
//! assert!(callbacks.has_progress(&progress));
//! ```

use crate::error::Error;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use tracing::error;

/// Receives `(identifier, fraction)` with the fraction in `[0, 1]`.
pub type ProgressCallback = Arc<dyn Fn(&str, f64) + Send + Sync>;
/// Receives the identifier of a canceled download.
pub type CancelCallback = Arc<dyn Fn(&str) + Send + Sync>;
/// Receives the identifier of a failed download and the failure.
pub type ErrorCallback = Arc<dyn Fn(&str, &Error) + Send + Sync>;
/// Receives `(identifier, seconds)` with the estimated time remaining.
pub type RemainingTimeCallback = Arc<dyn Fn(&str, u64) + Send + Sync>;
/// Receives the identifier and final path of a finished download.
pub type CompletionCallback = Arc<dyn Fn(&str, &Path) + Send + Sync>;
/// Invoked once every background download has reached a terminal state.
pub type BackgroundHandler = Box<dyn FnOnce() + Send>;

/// The set of handlers one caller registers for one request.
#[derive(Clone, Default)]
pub struct Callbacks {
    progress: Option<ProgressCallback>,
    cancel: Option<CancelCallback>,
    error: Option<ErrorCallback>,
    remaining_time: Option<RemainingTimeCallback>,
    complete: Option<CompletionCallback>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel.is_some())
            .field("error", &self.error.is_some())
            .field("remaining_time", &self.remaining_time.is_some())
            .field("complete", &self.complete.is_some())
            .finish()
    }
}

impl Callbacks {
    /// Creates an empty callback set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress handler.
    pub fn on_progress<F>(self, callback: F) -> Self
    where
        F: Fn(&str, f64) + Send + Sync + 'static,
    {
        self.with_progress(Arc::new(callback))
    }

    /// Set a shared progress handler.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Set the cancellation handler.
    pub fn on_cancel<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.cancel = Some(Arc::new(callback));
        self
    }

    /// Set the error handler.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &Error) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(callback));
        self
    }

    /// Set the remaining time handler.
    ///
    /// It is only called when a rate can be measured, so a stalled transfer
    /// produces no estimate rather than an infinite one.
    pub fn on_remaining_time<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, u64) + Send + Sync + 'static,
    {
        self.remaining_time = Some(Arc::new(callback));
        self
    }

    /// Set the completion handler.
    pub fn on_complete<F>(self, callback: F) -> Self
    where
        F: Fn(&str, &Path) + Send + Sync + 'static,
    {
        self.with_complete(Arc::new(callback))
    }

    /// Set a shared completion handler.
    pub fn with_complete(mut self, callback: CompletionCallback) -> Self {
        self.complete = Some(callback);
        self
    }

    /// Whether this set holds exactly the given progress handler instance.
    pub fn has_progress(&self, callback: &ProgressCallback) -> bool {
        self.progress
            .as_ref()
            .is_some_and(|own| Arc::ptr_eq(own, callback))
    }

    /// Whether this set holds exactly the given completion handler instance.
    pub fn has_complete(&self, callback: &CompletionCallback) -> bool {
        self.complete
            .as_ref()
            .is_some_and(|own| Arc::ptr_eq(own, callback))
    }

    pub(crate) fn notify_progress(&self, identifier: &str, fraction: f64) {
        if let Some(ref callback) = self.progress {
            guarded("progress", identifier, || callback(identifier, fraction));
        }
    }

    pub(crate) fn notify_remaining_time(&self, identifier: &str, seconds: u64) {
        if let Some(ref callback) = self.remaining_time {
            guarded("remaining time", identifier, || callback(identifier, seconds));
        }
    }

    pub(crate) fn notify_complete(&self, identifier: &str, path: &Path) {
        if let Some(ref callback) = self.complete {
            guarded("completion", identifier, || callback(identifier, path));
        }
    }

    pub(crate) fn notify_error(&self, identifier: &str, error: &Error) {
        if let Some(ref callback) = self.error {
            guarded("error", identifier, || callback(identifier, error));
        }
    }

    pub(crate) fn notify_cancel(&self, identifier: &str) {
        if let Some(ref callback) = self.cancel {
            guarded("cancel", identifier, || callback(identifier));
        }
    }
}

/// Runs a caller handler, containing any panic to that handler.
pub(crate) fn guarded(kind: &str, identifier: &str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!("The {} callback for {} panicked", kind, identifier);
    }
}
