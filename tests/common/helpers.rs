use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use trawl::transport::{EventSink, Transfer, TransferEvent, TransferHandle, Transport};
use trawl::{Callbacks, DownloadRegistry, RegistryBuilder};

// Common test constants
pub const TEST_DOMAIN: &str = "http://domain.com/file.zip";
pub const TEST_USER_AGENT: &str = "trawl-test-agent";

/// How long a test waits for an expected event before failing.
pub const PATIENCE: Duration = Duration::from_secs(5);

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates a temporary file with the given content
pub fn create_temp_file(dir: &Path, filename: &str, content: &[u8]) -> PathBuf {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&file_path, content).expect("Failed to write temporary file");
    file_path
}

/// Creates a test URL for download testing
pub fn create_test_url(filename: &str) -> String {
    format!("https://example.com/{}", filename)
}

/// Creates test file content of specified size
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Asserts that a file exists at the given path
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "File should exist at path: {:?}", path);
}

/// Asserts that a file has the expected size
pub fn assert_file_size(path: &Path, expected_size: u64) {
    let metadata = fs::metadata(path).expect("Failed to get file metadata");
    assert_eq!(
        metadata.len(),
        expected_size,
        "File size mismatch at path: {:?}",
        path
    );
}

// === Scripted transport ===

/// One call to [`ScriptedTransport::start`].
#[derive(Debug, Clone)]
pub struct Started {
    pub transfer: Transfer,
    pub sink: EventSink,
    pub handle: TransferHandle,
}

/// A transport driven by the test instead of the network.
///
/// Every started transfer is recorded; the test then plays its events through
/// the recorded sink.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    started: Arc<Mutex<Vec<Started>>>,
    confirm_cancel: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every cancellation with [`TransferEvent::Cancelled`] by itself.
    pub fn confirming_cancel() -> Self {
        Self {
            confirm_cancel: true,
            ..Self::default()
        }
    }

    /// Number of transfers started so far.
    pub fn count(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    pub fn get(&self, i: usize) -> Started {
        self.started.lock().unwrap()[i].clone()
    }

    pub fn send(&self, i: usize, event: TransferEvent) {
        self.get(i).sink.send(event);
    }

    /// Writes `content` into transfer `i`'s partial file and reports a
    /// complete, successful segment.
    pub fn complete(&self, i: usize, content: &[u8]) {
        let started = self.get(i);
        let transfer = &started.transfer;
        if let Some(parent) = transfer.partial.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&transfer.partial)
            .unwrap();
        file.write_all(content).unwrap();

        let sink = &started.sink;
        sink.send(TransferEvent::Started {
            offset: transfer.offset,
            expected: Some(content.len() as u64),
        });
        sink.send(TransferEvent::Progress {
            received: content.len() as u64,
        });
        sink.send(TransferEvent::Finished);
    }
}

impl Transport for ScriptedTransport {
    fn start(&self, transfer: Transfer, sink: EventSink) -> TransferHandle {
        let handle = TransferHandle::new();
        if self.confirm_cancel {
            let token = handle.token();
            let sink = sink.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                sink.send(TransferEvent::Cancelled);
            });
        }
        self.started.lock().unwrap().push(Started {
            transfer,
            sink,
            handle: handle.clone(),
        });
        handle
    }
}

/// Builds a registry rooted at `dir` on top of `transport`.
pub fn scripted_registry(dir: &Path, transport: &ScriptedTransport) -> DownloadRegistry {
    RegistryBuilder::new()
        .directory(dir.to_path_buf())
        .transport(transport.clone())
        .build()
        .expect("Failed to build registry")
}

// === Callback recording ===

/// What a callback set observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Progress(String, f64),
    Remaining(String, u64),
    Complete(String, PathBuf),
    Error(String, String),
    Cancel(String),
}

impl Seen {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Seen::Complete(..) | Seen::Error(..) | Seen::Cancel(_))
    }
}

/// Stream of everything one callback set observed.
pub struct Recorder {
    rx: UnboundedReceiver<Seen>,
}

/// Creates a callback set reporting every notification into a [`Recorder`].
pub fn recorder() -> (Callbacks, Recorder) {
    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tx.clone();
    let remaining = tx.clone();
    let complete = tx.clone();
    let error = tx.clone();
    let callbacks = Callbacks::new()
        .on_progress(move |id, f| {
            let _ = progress.send(Seen::Progress(id.to_string(), f));
        })
        .on_remaining_time(move |id, s| {
            let _ = remaining.send(Seen::Remaining(id.to_string(), s));
        })
        .on_complete(move |id, path| {
            let _ = complete.send(Seen::Complete(id.to_string(), path.to_path_buf()));
        })
        .on_error(move |id, e| {
            let _ = error.send(Seen::Error(id.to_string(), e.to_string()));
        })
        .on_cancel(move |id| {
            let _ = tx.send(Seen::Cancel(id.to_string()));
        });
    (callbacks, Recorder { rx })
}

impl Recorder {
    /// Next notification, failing the test if none arrives in time.
    pub async fn next(&mut self) -> Seen {
        tokio::time::timeout(PATIENCE, self.rx.recv())
            .await
            .expect("Timed out waiting for a callback")
            .expect("Callback channel closed")
    }

    /// Collects notifications up to and including the first terminal one.
    pub async fn until_terminal(&mut self) -> (Vec<Seen>, Seen) {
        let mut seen = Vec::new();
        loop {
            let event = self.next().await;
            if event.is_terminal() {
                return (seen, event);
            }
            seen.push(event);
        }
    }

    /// Asserts that nothing further is reported for a little while.
    pub async fn assert_quiet(&mut self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Ok(event) = self.rx.try_recv() {
            panic!("Unexpected callback: {:?}", event);
        }
    }
}

/// Polls `condition` until it holds, failing the test after [`PATIENCE`].
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(PATIENCE, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "Timed out waiting for condition");
}
