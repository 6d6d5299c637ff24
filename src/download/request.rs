//! Describes a file to be downloaded.
//!
//! # Examples
//!
//! ```rust
//! use trawl::download::DownloadRequest;
//!
//! let request = DownloadRequest::new("https://example.com/pkgs/a.zip")
//!     .directory("pkgs")
//!     .friendly_name("Package A")
//!     .background(true);
//! assert_eq!(request.identifier(), "https://example.com/pkgs/a.zip");
//!
//! let job = DownloadRequest::new("https://example.com/a.zip").id("job1");
//! assert_eq!(job.identifier(), "job1");
//! ```

use crate::error::{Error, Result};
use crate::files::{file_name_for_url, parse_url, FileLocator};

use reqwest::Url;
use std::path::PathBuf;

/// A request for one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// URL of the file to download.
    pub url: String,
    /// File name used on disk. Derived from the URL when `None`.
    pub file_name: Option<String>,
    /// Destination directory below the registry root. The root itself when `None`.
    pub directory: Option<String>,
    /// Display name for presentation layers.
    pub friendly_name: Option<String>,
    /// Explicit identifier, for several logical downloads of one URL.
    pub id: Option<String>,
    /// Count this download towards the background completion handler.
    pub background: bool,
}

/// Where a request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
    pub url: Url,
    pub file_name: String,
    pub destination: PathBuf,
}

impl DownloadRequest {
    /// Creates a request for `url` with every option unset.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: None,
            directory: None,
            friendly_name: None,
            id: None,
            background: false,
        }
    }

    /// Sets the file name used on disk.
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Sets the destination directory name.
    pub fn directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Sets the display name.
    pub fn friendly_name(mut self, friendly_name: impl Into<String>) -> Self {
        self.friendly_name = Some(friendly_name.into());
        self
    }

    /// Sets an explicit identifier.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the background flag.
    pub fn background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    /// The deduplication key: the explicit id if any, else the URL.
    pub fn identifier(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.url)
    }

    /// Validates the request and resolves its destination below `locator`.
    pub(crate) fn resolve(&self, locator: &FileLocator) -> Result<Target> {
        if self.identifier().trim().is_empty() {
            return Err(Error::InvalidIdentifier(
                "a download needs a non-empty identifier".into(),
            ));
        }

        let url = parse_url(&self.url)?;
        let file_name = match self.file_name {
            Some(ref name) => name.clone(),
            None => file_name_for_url(&url)?,
        };
        let destination = locator.path_for_name(&file_name, self.directory.as_deref())?;

        Ok(Target {
            url,
            file_name,
            destination,
        })
    }
}

impl From<&str> for DownloadRequest {
    fn from(url: &str) -> Self {
        DownloadRequest::new(url)
    }
}
