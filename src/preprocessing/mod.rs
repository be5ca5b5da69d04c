//! Bar-level preprocessing of message-level OFI.
//!
//! - **Bars**: bucket per-message OFI into fixed-duration, epoch-aligned bars
//! - **Normalization**: divide summed OFI by average resting depth (Eq. 3)
//!
//! # Example
//!
//! ```ignore
//! use ofi_features::preprocessing::{BarAggregator, DepthScope};
//!
//! let aggregator = BarAggregator::new(60_000_000_000, 10)?
//!     .with_depth_scope(DepthScope::PerLevel);
//! let bars = aggregator.aggregate(&messages, &flows)?;
//! ```

pub mod bars;
pub mod normalization;

pub use bars::{format_frequency, parse_frequency, Bar, BarAggregator, NS_PER_MIN, NS_PER_SEC};
pub use normalization::{
    normalize_by_depth, normalize_levels, pooled_depth, DepthNormalizer, DepthScope,
};
