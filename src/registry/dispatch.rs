//! The registry's notification context.
//!
//! Every transport event and every rejected request travels through one
//! unbounded channel to a single task. That task is the only place caller
//! callbacks run, so they never race each other and arrive in the order the
//! transports reported them.

use super::registry::Shared;
use crate::download::Callbacks;
use crate::error::Error;
use crate::transport::{TransferEvent, TransferId};

use std::sync::Weak;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

/// A message for the dispatcher task.
#[derive(Debug)]
pub(crate) enum Dispatch {
    /// An event reported by a transport.
    Transfer { id: TransferId, event: TransferEvent },
    /// A request refused before any record was created.
    Rejected {
        identifier: String,
        callbacks: Callbacks,
        error: Error,
    },
}

/// Drains the channel until the registry is dropped.
pub(crate) async fn run(shared: Weak<Shared>, mut rx: UnboundedReceiver<Dispatch>) {
    while let Some(message) = rx.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.dispatch(message);
    }
    debug!("Download dispatcher stopped");
}
