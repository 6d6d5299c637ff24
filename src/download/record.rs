//! The registry's per-identifier bookkeeping.

use super::callbacks::Callbacks;
use super::request::{DownloadRequest, Target};
use crate::files::partial_path;
use crate::progress::TransferObserver;
use crate::transport::{Transfer, TransferHandle};

use reqwest::Url;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// State of one download known to the registry.
///
/// Identity and naming never change once created. The handle is `Some` only
/// while a transfer runs; a record created while an earlier transfer for the
/// same identifier is still winding down waits without one.
#[derive(Debug)]
pub struct DownloadRecord {
    identifier: String,
    url: Url,
    file_name: String,
    directory: Option<String>,
    friendly_name: Option<String>,
    destination: PathBuf,
    background: bool,
    cancelled: bool,
    handle: Option<TransferHandle>,
    observer: TransferObserver,
    subscriptions: Vec<Callbacks>,
}

impl DownloadRecord {
    pub(crate) fn new(
        request: &DownloadRequest,
        target: Target,
        callbacks: Callbacks,
        rate_window: Duration,
    ) -> Self {
        Self {
            identifier: request.identifier().to_string(),
            url: target.url,
            file_name: target.file_name,
            directory: request.directory.clone(),
            friendly_name: request.friendly_name.clone(),
            destination: target.destination,
            background: request.background,
            cancelled: false,
            handle: None,
            observer: TransferObserver::new(0, rate_window),
            subscriptions: vec![callbacks],
        }
    }

    /// The deduplication key.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The URL being fetched.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// File name on disk.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Destination directory name, `None` for the root.
    pub fn directory(&self) -> Option<&str> {
        self.directory.as_deref()
    }

    /// Display name.
    pub fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }

    /// Final path of the file.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Whether the download counts towards background completion.
    pub fn is_background(&self) -> bool {
        self.background
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Whether a transfer is running for this record.
    pub fn is_launched(&self) -> bool {
        self.handle.is_some()
    }

    /// Byte offset the current segment began at.
    pub fn start_bytes(&self) -> u64 {
        self.observer.start_bytes()
    }

    /// Whether the current segment continues a partial file.
    pub fn is_resumed(&self) -> bool {
        self.observer.is_resumed()
    }

    /// When the current segment began.
    pub fn started_at(&self) -> Instant {
        self.observer.started_at()
    }

    /// Registered callback sets, in registration order.
    pub fn subscriptions(&self) -> &[Callbacks] {
        &self.subscriptions
    }

    pub(crate) fn observer_mut(&mut self) -> &mut TransferObserver {
        &mut self.observer
    }

    pub(crate) fn subscribe(&mut self, callbacks: Callbacks) {
        self.subscriptions.push(callbacks);
    }

    /// Prepares the transfer for a segment continuing from `offset`.
    pub(crate) fn begin(&mut self, offset: u64, user_agent: Option<String>) -> Transfer {
        let window = self.observer.window();
        self.observer = TransferObserver::new(offset, window);
        Transfer {
            url: self.url.clone(),
            destination: self.destination.clone(),
            partial: partial_path(&self.destination),
            offset,
            background: self.background,
            user_agent,
        }
    }

    pub(crate) fn attach(&mut self, handle: TransferHandle) {
        self.handle = Some(handle);
    }

    /// Marks the record canceled and asks its transfer, if any, to abort.
    pub(crate) fn cancel(&mut self) {
        self.cancelled = true;
        if let Some(ref handle) = self.handle {
            handle.cancel();
        }
    }

    /// Whether `target` describes the same download as this record.
    pub(crate) fn same_target(&self, target: &Target) -> bool {
        self.url == target.url && self.destination == target.destination
    }
}
