//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use ofi_features::prelude::*;
//!
//! let pipeline = OfiPipeline::from_config(PipelineConfig::default())?;
//! let messages = load_messages("book.csv", 10)?;
//! let output = pipeline.process(&messages)?;
//! ```
//!
//! # What's Included
//!
//! ## Core Pipeline
//! - [`OfiPipeline`], [`PipelineBuilder`], [`PipelineConfig`], [`PipelineOutput`]
//!
//! ## Stages
//! - [`MultiLevelOfiExtractor`] - Message-level OFI
//! - [`BarAggregator`] - Time bars with depth normalization
//! - [`IntegratedOfiReducer`] - First-component projection
//! - [`MultiAssetAligner`] - Design matrix
//!
//! ## I/O
//! - [`load_messages`], [`NumpyExporter`], [`CsvExporter`]

pub use crate::alignment::{BarFrame, DesignMatrix, MultiAssetAligner};
pub use crate::builder::PipelineBuilder;
pub use crate::config::{BarConfig, PipelineConfig, ReductionConfig};
pub use crate::error::{OfiError, Result};
pub use crate::export::{CsvExporter, NumpyExporter};
pub use crate::features::order_flow::{LevelFlow, MultiLevelOfiExtractor};
pub use crate::loader::{load_messages, read_messages};
pub use crate::pipeline::{OfiPipeline, PipelineOutput};
pub use crate::preprocessing::{parse_frequency, Bar, BarAggregator, DepthScope};
pub use crate::reduction::{IntegratedOfiReducer, LoadingNorm};
pub use crate::types::{BookLevel, BookMessage, EventKind};
