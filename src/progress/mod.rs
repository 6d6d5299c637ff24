//! Progress module turning byte counts into fractions, rates and ETAs.
//!
//! - [`estimator`] - sliding-window [`RateEstimator`]
//! - [`observer`] - per-transfer [`TransferObserver`]

pub mod estimator;
pub mod observer;

pub use estimator::{RateEstimator, DEFAULT_WINDOW};
pub use observer::{TransferObserver, Update};
