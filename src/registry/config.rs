//! Configuration structures and defaults for the registry.
//!
//! [`RegistryConfig`] holds everything [`RegistryBuilder`](super::RegistryBuilder)
//! collects. Its defaults store files under `./downloads`, retry transient
//! HTTP failures three times and measure rates over a three second window.

use crate::progress::DEFAULT_WINDOW;
use crate::transport::Transport;

use reqwest::header::HeaderMap;
use std::env::current_dir;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Name of the default root download directory.
pub const DEFAULT_DIRECTORY: &str = "downloads";

/// Configuration structure for the registry.
#[derive(Clone)]
pub struct RegistryConfig {
    /// Root directory; named destination directories live below it.
    pub directory: PathBuf,
    /// Initial user agent override for every request.
    pub user_agent: Option<String>,
    /// Number of retries for transient HTTP failures.
    pub retries: u32,
    /// Custom HTTP headers.
    pub headers: Option<HeaderMap>,
    /// Optional proxy configuration.
    pub proxy: Option<reqwest::Proxy>,
    /// Span of the sliding window used for rate estimation.
    pub rate_window: Duration,
    /// Transport replacing the default HTTP one.
    pub transport: Option<Arc<dyn Transport>>,
}

impl std::fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("directory", &self.directory)
            .field("user_agent", &self.user_agent)
            .field("retries", &self.retries)
            .field("headers", &self.headers)
            .field("proxy", &self.proxy.is_some())
            .field("rate_window", &self.rate_window)
            .field("transport", &self.transport)
            .finish()
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            directory: current_dir().unwrap_or_default().join(DEFAULT_DIRECTORY),
            user_agent: None,
            retries: 3,
            headers: None,
            proxy: None,
            rate_window: DEFAULT_WINDOW,
            transport: None,
        }
    }
}
