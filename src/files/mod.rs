//! Files module mapping downloads onto the filesystem.
//!
//! - [`locator`] - path resolution, existence checks, deletion and cleanup

pub mod locator;

pub use locator::{file_name_for_url, parse_url, partial_path, FileLocator, PARTIAL_EXTENSION};
