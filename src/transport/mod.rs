//! Transport module: the network side of a download.
//!
//! The registry never talks to the network itself. It hands a [`Transfer`]
//! to a [`Transport`], which moves bytes into the transfer's partial file and
//! reports what happens through an [`EventSink`]. The registry keeps the
//! returned [`TransferHandle`] to request cancellation.
//!
//! - [`http`] - the reqwest-based [`HttpTransport`]
//!
//! # Event contract
//!
//! A transport reports, for each transfer, zero or one
//! [`TransferEvent::Started`], then any number of
//! [`TransferEvent::Progress`], then exactly one terminal event
//! ([`TransferEvent::Finished`], [`TransferEvent::Failed`] or
//! [`TransferEvent::Cancelled`]). Once the handle's token is canceled the
//! transport must stop writing and report [`TransferEvent::Cancelled`].

pub mod http;

pub use http::HttpTransport;

use crate::error::Error;
use crate::registry::dispatch::Dispatch;

use reqwest::Url;
use std::fmt::Debug;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Identifies one transfer for the lifetime of a registry.
pub type TransferId = u64;

/// Everything a transport needs to run one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Where to fetch from.
    pub url: Url,
    /// Final location of the file once finished.
    pub destination: PathBuf,
    /// File receiving the bytes while the transfer runs.
    pub partial: PathBuf,
    /// Bytes already in `partial`; the transfer should continue from here.
    pub offset: u64,
    /// The download was requested in background mode.
    pub background: bool,
    /// User agent to send instead of the client default.
    pub user_agent: Option<String>,
}

/// Raw events reported by a transport.
#[derive(Debug)]
pub enum TransferEvent {
    /// The segment begins at `offset` (0 if the server ignored the range)
    /// and should deliver `expected` more bytes.
    Started { offset: u64, expected: Option<u64> },
    /// `received` bytes of this segment were written so far.
    Progress { received: u64 },
    /// All bytes are in the partial file.
    Finished,
    /// The transfer stopped on an error. The partial file is kept.
    Failed(Error),
    /// The transfer stopped after a cancellation request.
    Cancelled,
}

impl TransferEvent {
    /// Whether this event ends the transfer.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferEvent::Finished | TransferEvent::Failed(_) | TransferEvent::Cancelled
        )
    }
}

/// Where a transport reports the events of one transfer.
#[derive(Debug, Clone)]
pub struct EventSink {
    id: TransferId,
    tx: UnboundedSender<Dispatch>,
}

impl EventSink {
    pub(crate) fn new(id: TransferId, tx: UnboundedSender<Dispatch>) -> Self {
        Self { id, tx }
    }

    /// The transfer this sink reports for.
    pub fn id(&self) -> TransferId {
        self.id
    }

    /// Reports an event. Events sent after the registry is gone are dropped.
    pub fn send(&self, event: TransferEvent) {
        let _ = self.tx.send(Dispatch::Transfer {
            id: self.id,
            event,
        });
    }
}

/// Owner-side handle of a running transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferHandle {
    token: CancellationToken,
}

impl TransferHandle {
    /// Creates a handle with a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// The token the transport watches.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Asks the transport to abort.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Something able to run transfers.
///
/// `start` is called with the registry's lock held and from inside its
/// runtime context: spawn the work and return immediately.
pub trait Transport: Send + Sync + Debug + 'static {
    /// Begins `transfer`, reporting into `sink`.
    fn start(&self, transfer: Transfer, sink: EventSink) -> TransferHandle;
}
