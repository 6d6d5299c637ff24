//! Registry module coordinating downloads.
//!
//! - [`builder`] - [`RegistryBuilder`] for configuring a registry
//! - [`config`] - [`RegistryConfig`] and its defaults
//! - [`registry`] - the [`DownloadRegistry`] itself

pub mod builder;
pub mod config;
pub(crate) mod dispatch;
pub mod registry;

pub use builder::RegistryBuilder;
pub use config::{RegistryConfig, DEFAULT_DIRECTORY};
pub use registry::DownloadRegistry;
