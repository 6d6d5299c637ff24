//! Builder pattern implementation for creating registry instances.
//!
//! # Examples
//!
//! ```rust
//! use trawl::registry::RegistryBuilder;
//! use std::path::PathBuf;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), trawl::Error> {
//! let registry = RegistryBuilder::new()
//!     .directory(PathBuf::from("./downloads"))
//!     .user_agent("my-app/1.0")
//!     .retries(5)
//!     .build()?;
//! # let _ = registry;
//! # Ok(())
//! # }
//! ```

use super::{config::RegistryConfig, registry::DownloadRegistry};
use crate::error::{Error, Result};
use crate::http::HttpClientConfig;
use crate::transport::{HttpTransport, Transport};

use reqwest::header::{HeaderMap, HeaderValue, IntoHeaderName};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::runtime::Handle;

/// A builder used to create a [`DownloadRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    config: RegistryConfig,
    runtime: Option<Handle>,
}

impl RegistryBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        RegistryBuilder::default()
    }

    /// Sets the root directory downloads are stored under.
    pub fn directory(mut self, directory: PathBuf) -> Self {
        self.config.directory = directory;
        self
    }

    /// Sets the initial user agent override.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Set the number of retries for transient HTTP failures.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Route HTTP traffic through a proxy.
    pub fn proxy(mut self, proxy: reqwest::Proxy) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    /// Set the span of the rate estimation window.
    pub fn rate_window(mut self, window: Duration) -> Self {
        self.config.rate_window = window;
        self
    }

    /// Use `transport` instead of the default [`HttpTransport`].
    pub fn transport<T: Transport>(mut self, transport: T) -> Self {
        self.config.transport = Some(Arc::new(transport));
        self
    }

    /// Drive downloads on `runtime` instead of the current one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    fn new_header(&self) -> HeaderMap {
        match self.config.headers {
            Some(ref h) => h.to_owned(),
            _ => HeaderMap::new(),
        }
    }

    /// Add http headers sent with every request.
    ///
    /// Calling `.headers()` several times merges all maps into one.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut new = self.new_header();
        new.extend(headers);

        self.config.headers = Some(new);
        self
    }

    /// Add one http header sent with every request.
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        let mut new = self.new_header();

        new.insert(name, value);

        self.config.headers = Some(new);
        self
    }

    /// Create the [`DownloadRegistry`] with the specified options.
    ///
    /// Fails with [`Error::NoRuntime`] when called outside a Tokio runtime
    /// without [`RegistryBuilder::runtime`].
    pub fn build(self) -> Result<DownloadRegistry> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| Error::NoRuntime)?,
        };

        let transport: Arc<dyn Transport> = match self.config.transport.clone() {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(HttpClientConfig {
                retries: self.config.retries,
                proxy: self.config.proxy.clone(),
                headers: self.config.headers.clone(),
                ..HttpClientConfig::default()
            })?),
        };

        Ok(DownloadRegistry::new(self.config, transport, runtime))
    }
}
