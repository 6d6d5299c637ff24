//! The download registry.
//!
//! [`DownloadRegistry`] is the coordinator of a download session. It maps
//! identifiers to [`DownloadRecord`]s, makes sure at most one transfer runs
//! per identifier, resumes from partial files, fans transport events out to
//! every callback set registered for an identifier, and moves finished files
//! into place.
//!
//! The registry is a cheap, cloneable handle. Build one at the composition
//! root of an application and pass clones to whoever needs it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use trawl::download::{Callbacks, DownloadRequest};
//! use trawl::registry::RegistryBuilder;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), trawl::Error> {
//! let registry = RegistryBuilder::new().build()?;
//!
//! registry.request(
//!     DownloadRequest::new("https://example.com/pkgs/a.zip").directory("pkgs"),
//!     Callbacks::new()
//!         .on_progress(|id, fraction| println!("{}: {:.0}%", id, fraction * 100.0))
//!         .on_remaining_time(|id, secs| println!("{}: {}s left", id, secs))
//!         .on_complete(|id, path| println!("{} saved to {:?}", id, path))
//!         .on_error(|id, error| eprintln!("{} failed: {}", id, error)),
//! );
//! # Ok(())
//! # }
//! ```

use super::config::RegistryConfig;
use super::dispatch::{self, Dispatch};
use crate::download::{
    callbacks::guarded, BackgroundHandler, Callbacks, CompletionCallback, DownloadRecord,
    DownloadRequest, ProgressCallback,
};
use crate::error::Error;
use crate::files::FileLocator;
use crate::progress::{observer::fan_out, TransferObserver, Update};
use crate::transport::{EventSink, TransferEvent, TransferId, Transport};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, warn};

/// Coordinator of concurrent downloads.
///
/// Create one via [`RegistryBuilder`](super::RegistryBuilder):
///
/// ```rust
/// # #[tokio::main]
/// # async fn main() {
/// use trawl::registry::RegistryBuilder;
///
/// let registry = RegistryBuilder::new().build().unwrap();
/// assert!(registry.current_downloads().is_empty());
/// # }
/// ```
#[derive(Clone)]
pub struct DownloadRegistry {
    shared: Arc<Shared>,
}

/// State shared by every clone of a registry and its dispatcher.
pub(crate) struct Shared {
    config: RegistryConfig,
    locator: FileLocator,
    transport: Arc<dyn Transport>,
    runtime: Handle,
    tx: UnboundedSender<Dispatch>,
    next_id: AtomicU64,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// Identifiers with a live record. What queries see.
    active: BTreeMap<String, TransferId>,
    /// Live records plus canceled ones still waiting for their transport.
    records: HashMap<TransferId, DownloadRecord>,
    background_outstanding: usize,
    background_handler: Option<BackgroundHandler>,
    user_agent: Option<String>,
}

impl State {
    /// Whether a canceled transfer for `identifier`, or one writing into
    /// `destination`, is still running.
    fn is_retiring(&self, identifier: &str, destination: &Path) -> bool {
        self.records.values().any(|r| {
            r.is_cancelled()
                && r.is_launched()
                && (r.identifier() == identifier || r.destination() == destination)
        })
    }

    /// The live record of another identifier that owns `destination`.
    fn owner_of(&self, destination: &Path, identifier: &str) -> Option<&DownloadRecord> {
        self.active
            .iter()
            .filter(|(key, _)| key.as_str() != identifier)
            .filter_map(|(_, id)| self.records.get(id))
            .find(|r| r.destination() == destination)
    }

    fn live(&self, identifier: &str) -> Option<&DownloadRecord> {
        self.active
            .get(identifier)
            .and_then(|id| self.records.get(id))
    }
}

/// How a transfer ended, from the callers' point of view.
enum Outcome {
    Completed,
    Failed(Error),
    Cancelled,
}

impl fmt::Debug for DownloadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadRegistry")
            .field("config", &self.shared.config)
            .field("current_downloads", &self.current_downloads())
            .finish()
    }
}

impl DownloadRegistry {
    /// Creates a registry and spawns its dispatcher on `runtime`.
    pub(crate) fn new(config: RegistryConfig, transport: Arc<dyn Transport>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = State {
            user_agent: config.user_agent.clone(),
            ..State::default()
        };
        let shared = Arc::new(Shared {
            locator: FileLocator::new(config.directory.clone()),
            config,
            transport,
            runtime: runtime.clone(),
            tx,
            next_id: AtomicU64::new(1),
            state: Mutex::new(state),
        });
        runtime.spawn(dispatch::run(Arc::downgrade(&shared), rx));
        Self { shared }
    }

    /// Gets the root download directory.
    pub fn directory(&self) -> &Path {
        self.shared.locator.root()
    }

    /// Gets the file locator rooted at the download directory.
    pub fn locator(&self) -> &FileLocator {
        &self.shared.locator
    }

    /// Gets the configuration the registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }

    /// Requests a download.
    ///
    /// If the identifier already has a live download, `callbacks` is attached
    /// to it and receives its future events; no second transfer starts, and
    /// the rest of the request is not looked at.
    /// Otherwise a transfer starts, resuming from a partial file if one
    /// exists. Results arrive only through `callbacks`, including the error
    /// for an invalid request.
    ///
    /// Two identifiers never share a destination: a request whose file is
    /// already being downloaded under another identifier fails with
    /// [`Error::InvalidIdentifier`]. One whose file is still held by a
    /// canceled transfer waits for that transfer to stop.
    pub fn request(&self, request: DownloadRequest, callbacks: Callbacks) {
        let shared = &self.shared;
        let identifier = request.identifier().to_string();
        let resolved = request.resolve(&shared.locator);

        let mut guard = shared.lock();
        let state = &mut *guard;

        let existing = state.active.get(&identifier).copied();
        if let Some(record) = existing.and_then(|id| state.records.get_mut(&id)) {
            match resolved {
                Ok(ref target) if !record.same_target(target) => warn!(
                    "{} is already downloading {} to {:?}; attaching instead of fetching {}",
                    identifier,
                    record.url(),
                    record.destination(),
                    target.url
                ),
                Err(ref e) => warn!("Attaching to {} despite an invalid request: {}", identifier, e),
                _ => {}
            }
            debug!("Attaching to the running download {}", identifier);
            record.subscribe(callbacks);
            return;
        }

        let target = match resolved {
            Ok(target) => target,
            Err(error) => {
                warn!("Rejecting download {}: {}", identifier, error);
                shared.reject(&identifier, callbacks, error);
                return;
            }
        };

        if let Some(owner) = state.owner_of(&target.destination, &identifier) {
            let error = Error::InvalidIdentifier(format!(
                "{} is already being downloaded as {}",
                target.destination.display(),
                owner.identifier()
            ));
            warn!("Rejecting download {}: {}", identifier, error);
            shared.reject(&identifier, callbacks, error);
            return;
        }

        let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
        let mut record = DownloadRecord::new(&request, target, callbacks, shared.config.rate_window);

        if state.is_retiring(&identifier, record.destination()) {
            debug!("Deferring {} until a canceled transfer stops", identifier);
        } else {
            shared.launch(id, &mut record, state.user_agent.clone());
        }

        if record.is_background() {
            state.background_outstanding += 1;
        }
        state.active.insert(identifier, id);
        state.records.insert(id, record);
    }

    /// Requests `url` with default options.
    pub fn download(&self, url: &str, callbacks: Callbacks) {
        self.request(DownloadRequest::new(url), callbacks);
    }

    /// Cancels the download of `identifier`.
    ///
    /// The identifier stops being reported as downloading right away; the
    /// cancel callbacks run once the transport confirms. Unknown identifiers
    /// are ignored.
    pub fn cancel(&self, identifier: &str) {
        let mut guard = self.shared.lock();
        let state = &mut *guard;

        let Some(id) = state.active.remove(identifier) else {
            debug!("Nothing to cancel for {}", identifier);
            return;
        };
        if let Some(record) = state.records.get_mut(&id) {
            debug!("Canceling {}", identifier);
            record.cancel();
            if !record.is_launched() {
                // Never started: there is no transport to confirm.
                let _ = self.shared.tx.send(Dispatch::Transfer {
                    id,
                    event: TransferEvent::Cancelled,
                });
            }
        }
    }

    /// Cancels every download live at the time of the call.
    pub fn cancel_all(&self) {
        let identifiers = self.current_downloads();
        for identifier in identifiers {
            self.cancel(&identifier);
        }
    }

    /// Whether a download of `identifier` is live.
    pub fn is_downloading(&self, identifier: &str) -> bool {
        self.shared.lock().active.contains_key(identifier)
    }

    /// Whether the live download of `identifier` has `progress` registered.
    pub fn is_downloading_with_progress(&self, identifier: &str, progress: &ProgressCallback) -> bool {
        self.shared
            .lock()
            .live(identifier)
            .is_some_and(|r| r.subscriptions().iter().any(|c| c.has_progress(progress)))
    }

    /// Whether the live download of `identifier` has one callback set holding
    /// both `progress` and `complete`.
    pub fn is_downloading_with(
        &self,
        identifier: &str,
        progress: &ProgressCallback,
        complete: &CompletionCallback,
    ) -> bool {
        self.shared.lock().live(identifier).is_some_and(|r| {
            r.subscriptions()
                .iter()
                .any(|c| c.has_progress(progress) && c.has_complete(complete))
        })
    }

    /// Identifiers with a live download at the time of the call.
    pub fn current_downloads(&self) -> BTreeSet<String> {
        self.shared.lock().active.keys().cloned().collect()
    }

    /// Display name of the live download of `identifier`.
    pub fn friendly_name(&self, identifier: &str) -> Option<String> {
        self.shared
            .lock()
            .live(identifier)
            .and_then(|r| r.friendly_name().map(String::from))
    }

    /// Where the file for `identifier` is, or will be, stored.
    ///
    /// A live download answers with its own destination; otherwise the path
    /// is derived from the identifier.
    pub fn local_path(&self, identifier: &str, directory: Option<&str>) -> Option<PathBuf> {
        if let Some(record) = self.shared.lock().live(identifier) {
            if directory.is_none() || directory == record.directory() {
                return Some(record.destination().to_path_buf());
            }
        }
        self.shared.locator.local_path(identifier, directory).ok()
    }

    /// Whether a finished download of `url` exists in `directory`.
    pub fn file_exists_for_url(&self, url: &str, directory: Option<&str>) -> bool {
        let locator = &self.shared.locator;
        locator
            .path_for_url(url, directory)
            .is_ok_and(|path| locator.exists(&path))
    }

    /// Whether a file called `name` exists in `directory`.
    pub fn file_exists_with_name(&self, name: &str, directory: Option<&str>) -> bool {
        let locator = &self.shared.locator;
        locator
            .path_for_name(name, directory)
            .is_ok_and(|path| locator.exists(&path))
    }

    /// Deletes the download of `url` in `directory`, with its partial file.
    ///
    /// Returns true iff a file was removed. A running transfer is not
    /// canceled; cancel it first.
    pub fn delete_file_for_url(&self, url: &str, directory: Option<&str>) -> bool {
        let locator = &self.shared.locator;
        locator
            .path_for_url(url, directory)
            .is_ok_and(|path| locator.delete(&path))
    }

    /// Deletes the file called `name` in `directory`, with its partial file.
    pub fn delete_file_with_name(&self, name: &str, directory: Option<&str>) -> bool {
        let locator = &self.shared.locator;
        locator
            .path_for_name(name, directory)
            .is_ok_and(|path| locator.delete(&path))
    }

    /// Removes everything inside the named directory.
    pub fn clean_directory(&self, directory: &str) -> bool {
        self.shared.locator.clean_directory(directory)
    }

    /// Current user agent override.
    pub fn user_agent(&self) -> Option<String> {
        self.shared.lock().user_agent.clone()
    }

    /// Sets the user agent override for downloads started from now on.
    pub fn set_user_agent(&self, user_agent: Option<String>) {
        self.shared.lock().user_agent = user_agent;
    }

    /// Sets the handler run once every background download has ended.
    ///
    /// It runs at most once and is cleared afterwards. When no background
    /// download is outstanding it waits for the next batch to drain.
    pub fn set_background_completion_handler<F>(&self, handler: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.lock().background_handler = Some(Box::new(handler));
    }

    /// Number of background downloads that have not ended yet.
    pub fn background_outstanding(&self) -> usize {
        self.shared.lock().background_outstanding
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reject(&self, identifier: &str, callbacks: Callbacks, error: Error) {
        let _ = self.tx.send(Dispatch::Rejected {
            identifier: identifier.to_string(),
            callbacks,
            error,
        });
    }

    /// Starts the transfer of `record`, resuming from its partial file.
    fn launch(&self, id: TransferId, record: &mut DownloadRecord, user_agent: Option<String>) {
        let offset = self.locator.partial_len(record.destination());
        let transfer = record.begin(offset, user_agent);
        if offset > 0 {
            debug!("Resuming {} from byte {}", record.identifier(), offset);
        } else {
            debug!("Starting {}", record.identifier());
        }

        let sink = EventSink::new(id, self.tx.clone());
        let _guard = self.runtime.enter();
        let handle = self.transport.start(transfer, sink);
        record.attach(handle);
    }

    /// Handles one message on the notification context.
    pub(crate) fn dispatch(&self, message: Dispatch) {
        match message {
            Dispatch::Rejected {
                identifier,
                callbacks,
                error,
            } => callbacks.notify_error(&identifier, &error),
            Dispatch::Transfer { id, event } => match event {
                TransferEvent::Started { offset, expected } => {
                    self.progress(id, |o| o.started(offset, expected))
                }
                TransferEvent::Progress { received } => self.progress(id, |o| o.progress(received)),
                TransferEvent::Finished => self.finish(id, Ok(())),
                TransferEvent::Failed(error) => self.finish(id, Err(Some(error))),
                TransferEvent::Cancelled => self.finish(id, Err(None)),
            },
        }
    }

    fn progress(&self, id: TransferId, step: impl FnOnce(&mut TransferObserver) -> Update) {
        let (identifier, subscriptions, update) = {
            let mut state = self.lock();
            let Some(record) = state.records.get_mut(&id) else {
                debug!("Ignoring progress of ended transfer {}", id);
                return;
            };
            if record.is_cancelled() {
                return;
            }
            let update = step(record.observer_mut());
            (
                record.identifier().to_string(),
                record.subscriptions().to_vec(),
                update,
            )
        };
        fan_out(&identifier, &subscriptions, update);
    }

    /// Ends transfer `id`. `Err(None)` is a cancellation.
    fn finish(&self, id: TransferId, result: Result<(), Option<Error>>) {
        let (record, outcome, background_handler) = {
            let mut guard = self.lock();
            let state = &mut *guard;

            let Some(record) = state.records.remove(&id) else {
                debug!("Ignoring terminal event of ended transfer {}", id);
                return;
            };
            if state.active.get(record.identifier()) == Some(&id) {
                state.active.remove(record.identifier());
            }

            // Settle the file before any successor reads the partial length.
            let outcome = self.settle(&record, result);

            let mut background_handler = None;
            if record.is_background() {
                state.background_outstanding = state.background_outstanding.saturating_sub(1);
                if state.background_outstanding == 0 {
                    background_handler = state.background_handler.take();
                }
            }

            self.launch_deferred(state, record.identifier(), record.destination());
            (record, outcome, background_handler)
        };

        let identifier = record.identifier();
        match outcome {
            Outcome::Completed => {
                debug!("{} finished at {:?}", identifier, record.destination());
                for callbacks in record.subscriptions() {
                    callbacks.notify_complete(identifier, record.destination());
                }
            }
            Outcome::Failed(error) => {
                warn!("{} failed: {}", identifier, error);
                for callbacks in record.subscriptions() {
                    callbacks.notify_error(identifier, &error);
                }
            }
            Outcome::Cancelled => {
                debug!("{} canceled", identifier);
                for callbacks in record.subscriptions() {
                    callbacks.notify_cancel(identifier);
                }
            }
        }

        if let Some(handler) = background_handler {
            debug!("All background downloads ended");
            guarded("background completion", identifier, handler);
        }
    }

    fn settle(&self, record: &DownloadRecord, result: Result<(), Option<Error>>) -> Outcome {
        match result {
            Ok(()) => match self.locator.finalize(record.destination()) {
                Ok(()) if record.is_cancelled() => Outcome::Cancelled,
                Ok(()) => Outcome::Completed,
                Err(e) if record.is_cancelled() => {
                    warn!("Could not keep canceled {}: {}", record.identifier(), e);
                    Outcome::Cancelled
                }
                Err(e) => Outcome::Failed(e.into()),
            },
            Err(_) if record.is_cancelled() => Outcome::Cancelled,
            Err(Some(error)) => Outcome::Failed(error),
            Err(None) => Outcome::Cancelled,
        }
    }

    /// Launches the records deferred behind a transfer for `identifier` or
    /// into `destination` that has just ended.
    fn launch_deferred(&self, state: &mut State, identifier: &str, destination: &Path) {
        let waiting: Vec<TransferId> = state
            .active
            .values()
            .copied()
            .filter(|id| {
                state.records.get(id).is_some_and(|r| {
                    !r.is_launched()
                        && !r.is_cancelled()
                        && (r.identifier() == identifier || r.destination() == destination)
                })
            })
            .collect();

        for next in waiting {
            let blocked = state
                .records
                .get(&next)
                .is_some_and(|r| state.is_retiring(r.identifier(), r.destination()));
            if blocked {
                continue;
            }
            let user_agent = state.user_agent.clone();
            if let Some(record) = state.records.get_mut(&next) {
                self.launch(next, record, user_agent);
            }
        }
    }
}
