//! Shared utility functions.
//!
//! - [`content_length`] - body and resource sizes from response headers

pub mod content_length;

pub use content_length::{content_range_total, parse_content_range_total, segment_length};
