//! Destination path resolution and file management.
//!
//! A [`FileLocator`] maps an identifier or file name, plus an optional
//! directory name, onto a path below a root download directory. It also
//! answers existence checks, deletes files and empties directories. None of
//! these operations look at running transfers: deleting a file whose download
//! is still active does not cancel it, so cancel first, then delete.
//!
//! # Layout
//!
//! ```text
//! <root>/<directory>/<file_name>        finished download
//! <root>/<directory>/<file_name>.part   bytes received so far
//! ```
//!
//! # Examples
//!
//! ```rust
//! use trawl::files::FileLocator;
//!
//! let locator = FileLocator::new("downloads");
//! let path = locator.path_for_url("https://example.com/pkgs/a.zip", Some("pkgs")).unwrap();
//! assert!(path.ends_with("pkgs/a.zip"));
//! ```

use crate::error::{Error, Result};

use percent_encoding::percent_decode_str;
use reqwest::Url;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extension appended to the destination of a transfer in progress.
pub const PARTIAL_EXTENSION: &str = "part";

/// Resolves on-disk locations below a root download directory.
#[derive(Debug, Clone)]
pub struct FileLocator {
    root: PathBuf,
}

impl FileLocator {
    /// Creates a locator rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Gets the root download directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the named destination directory, or the root when `None`.
    pub fn directory_path(&self, directory: Option<&str>) -> Result<PathBuf> {
        match directory {
            Some(name) => Ok(self.root.join(checked_component(name)?)),
            None => Ok(self.root.clone()),
        }
    }

    /// Path of the file called `name` inside `directory`.
    pub fn path_for_name(&self, name: &str, directory: Option<&str>) -> Result<PathBuf> {
        Ok(self.directory_path(directory)?.join(checked_component(name)?))
    }

    /// Path of the file a download of `url` is saved to inside `directory`.
    pub fn path_for_url(&self, url: &str, directory: Option<&str>) -> Result<PathBuf> {
        let url = parse_url(url)?;
        self.path_for_name(&file_name_for_url(&url)?, directory)
    }

    /// Path for an identifier.
    ///
    /// URL identifiers resolve like [`FileLocator::path_for_url`]; anything
    /// else is taken to be the file name itself.
    pub fn local_path(&self, identifier: &str, directory: Option<&str>) -> Result<PathBuf> {
        match Url::parse(identifier) {
            Ok(url) => self.path_for_name(&file_name_for_url(&url)?, directory),
            Err(_) => self.path_for_name(identifier, directory),
        }
    }

    /// Whether a finished file exists at `path`.
    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Length of the partial file kept for `destination`, 0 when there is none.
    pub fn partial_len(&self, destination: &Path) -> u64 {
        fs::metadata(partial_path(destination))
            .map(|m| if m.is_file() { m.len() } else { 0 })
            .unwrap_or(0)
    }

    /// Moves the partial file of `destination` into place.
    pub fn finalize(&self, destination: &Path) -> io::Result<()> {
        let partial = partial_path(destination);
        debug!("Moving {:?} to {:?}", partial, destination);
        fs::rename(&partial, destination)
    }

    /// Deletes the file at `destination` and any partial file next to it.
    ///
    /// Returns true iff something was removed.
    pub fn delete(&self, destination: &Path) -> bool {
        let removed_file = remove_if_present(destination);
        let removed_partial = remove_if_present(&partial_path(destination));
        removed_file || removed_partial
    }

    /// Removes every entry of the named directory, keeping the directory.
    ///
    /// Returns false if the directory could not be read or an entry could not
    /// be removed. A missing directory counts as clean.
    pub fn clean_directory(&self, directory: &str) -> bool {
        let dir = match self.directory_path(Some(directory)) {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Refusing to clean {:?}: {}", directory, e);
                return false;
            }
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return true,
            Err(e) => {
                warn!("Cannot read {:?}: {}", dir, e);
                return false;
            }
        };

        let mut clean = true;
        for entry in entries {
            let result = entry.and_then(|entry| {
                let path = entry.path();
                if entry.file_type()?.is_dir() {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                }
            });
            if let Err(e) = result {
                warn!("Failed to clean an entry of {:?}: {}", dir, e);
                clean = false;
            }
        }
        clean
    }
}

/// Path of the partial file kept while `destination` is being downloaded.
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(PARTIAL_EXTENSION);
    destination.with_file_name(name)
}

/// Parses a download URL, accepting HTTP(S) only.
pub fn parse_url(value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::InvalidUrl(format!(
            "The url \"{}\" uses the unsupported scheme \"{}\"",
            value, scheme
        ))),
    }
}

/// Derives the file name of a download from the last segment of its URL.
pub fn file_name_for_url(url: &Url) -> Result<String> {
    let segment = url
        .path_segments()
        .ok_or_else(|| {
            Error::InvalidUrl(format!("The url \"{}\" does not contain a valid path", url))
        })?
        .next_back()
        .unwrap_or_default();

    let name = percent_decode_str(segment).decode_utf8().map_err(|_| {
        Error::InvalidUrl(format!("The url \"{}\" has a filename that is not UTF-8", url))
    })?;

    if name.is_empty() {
        return Err(Error::InvalidUrl(format!(
            "The url \"{}\" does not contain a filename",
            url
        )));
    }
    checked_component(&name)
        .map(String::from)
        .map_err(|_| Error::InvalidUrl(format!("The url \"{}\" has an unusable filename", url)))
}

/// Accepts a single, non-empty path component.
fn checked_component(name: &str) -> Result<&str> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        Err(Error::InvalidIdentifier(format!(
            "\"{}\" is not a plain file or directory name",
            name
        )))
    } else {
        Ok(name)
    }
}

fn remove_if_present(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Deleted {:?}", path);
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to delete {:?}: {}", path, e);
            false
        }
    }
}
