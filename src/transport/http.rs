//! HTTP(S) transport with range-request resumption.
//!
//! Each transfer runs as its own Tokio task:
//!
//! 1. create the destination directory,
//! 2. `GET` the URL, with `Range: bytes=<offset>-` when a partial file exists,
//! 3. append to the partial file on `206 Partial Content`, start over on a
//!    plain `200`, and treat `416` for an offset equal to the full size as a
//!    download that was already complete; any other `416` empties the
//!    partial file and asks again from byte 0,
//! 4. stream the body chunk by chunk, reporting progress after each write.
//!
//! Cancellation races the whole fetch against the handle's token.

use super::{EventSink, Transfer, TransferEvent, TransferHandle, Transport};
use crate::error::{Error, Result};
use crate::http::{create_http_client, HttpClientConfig};
use crate::utils::content_length::{content_range_total, segment_length};

use futures::StreamExt;
use reqwest::{
    header::{RANGE, USER_AGENT},
    StatusCode,
};
use reqwest_middleware::ClientWithMiddleware;
use std::fmt;
use tokio::{fs, fs::OpenOptions, io::AsyncWriteExt};
use tracing::debug;

/// Transport fetching files over HTTP(S) with `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    client: ClientWithMiddleware,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Creates a transport with a client built from `config`.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        Ok(Self::with_client(create_http_client(config)?))
    }

    /// Creates a transport around an existing client.
    pub fn with_client(client: ClientWithMiddleware) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn start(&self, transfer: Transfer, sink: EventSink) -> TransferHandle {
        let handle = TransferHandle::new();
        let token = handle.token();
        let client = self.client.clone();

        if transfer.background {
            debug!("Starting background transfer {} for {}", sink.id(), transfer.url);
        }

        tokio::spawn(async move {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => TransferEvent::Cancelled,
                result = fetch(&client, &transfer, &sink) => match result {
                    Ok(()) => TransferEvent::Finished,
                    Err(e) => TransferEvent::Failed(e),
                },
            };
            debug!("Transfer {} for {} ended: {:?}", sink.id(), transfer.url, event);
            sink.send(event);
        });

        handle
    }
}

/// Fetches the file into its partial path.
async fn fetch(client: &ClientWithMiddleware, transfer: &Transfer, sink: &EventSink) -> Result<()> {
    if let Some(dir) = transfer.partial.parent() {
        debug!("Creating destination directory {:?}", dir);
        fs::create_dir_all(dir).await?;
    }

    let mut resume_from = transfer.offset;
    let (res, offset) = loop {
        debug!("Fetching {}", transfer.url);
        let mut req = client.get(transfer.url.clone());
        if resume_from > 0 {
            req = req.header(RANGE, format!("bytes={}-", resume_from));
        }
        if let Some(ref user_agent) = transfer.user_agent {
            req = req.header(USER_AGENT, user_agent.as_str());
        }

        let res = req.send().await?;
        let status = res.status();

        match status {
            StatusCode::PARTIAL_CONTENT if resume_from > 0 => break (res, resume_from),
            StatusCode::RANGE_NOT_SATISFIABLE if resume_from > 0 => {
                if content_range_total(res.headers()) == Some(resume_from) {
                    debug!("{} was already fully downloaded", transfer.url);
                    sink.send(TransferEvent::Started {
                        offset: resume_from,
                        expected: Some(0),
                    });
                    return Ok(());
                }
                // The partial file does not match the resource any more.
                debug!(
                    "{} rejected the range from byte {}, discarding {:?} and starting over",
                    transfer.url, resume_from, transfer.partial
                );
                fs::File::create(&transfer.partial).await?;
                resume_from = 0;
            }
            s if s.is_success() => {
                if resume_from > 0 {
                    debug!("{} ignored the range request, starting over", transfer.url);
                }
                break (res, 0);
            }
            _ => {
                return Err(Error::Http {
                    status,
                    url: transfer.url.to_string(),
                })
            }
        }
    };

    let expected = segment_length(res.headers(), offset);

    debug!("Opening {:?} at offset {}", transfer.partial, offset);
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(offset > 0)
        .truncate(offset == 0)
        .open(&transfer.partial)
        .await?;

    sink.send(TransferEvent::Started { offset, expected });

    let mut received: u64 = 0;
    let mut stream = res.bytes_stream();
    while let Some(item) = stream.next().await {
        let chunk = item?;
        file.write_all(&chunk).await?;
        received += chunk.len() as u64;
        sink.send(TransferEvent::Progress { received });
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
