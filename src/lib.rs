//! OFI Features
//!
//! Multi-level and integrated order-flow-imbalance (OFI) features from limit
//! order book messages.
//!
//! # Overview
//!
//! A finite batch of book messages is turned into bar-level features in four
//! stages, run per symbol and then combined:
//!
//! 1. **Order flow** (Eq. 1-2): per-message, per-level bid/ask flow and OFI
//! 2. **Bars** (Eq. 3): fixed-duration bars of summed OFI, divided by depth
//! 3. **Integrated OFI** (Eq. 4): projection onto the first principal axis
//! 4. **Alignment**: outer join of all symbols into one design matrix
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         OFI Features                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  types/         - Book messages and levels (fixed-point prices) │
//! │  loader/        - CSV ingestion                                 │
//! │  validation/    - Book and timestamp checks                     │
//! │  features/      - Message-level order flow and OFI              │
//! │  preprocessing/ - Time bars and depth normalization             │
//! │  reduction/     - First principal component, integrated OFI     │
//! │  alignment/     - Multi-asset design matrix                     │
//! │  export/        - NumPy, JSON and CSV output                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ofi_features::prelude::*;
//!
//! let pipeline = PipelineBuilder::new()
//!     .frequency("1min")?
//!     .symbols(["AAPL", "MSFT"])
//!     .build()?;
//!
//! let output = pipeline.process_file("book.csv")?;
//! NumpyExporter::new("out").export(&output)?;
//! ```

pub mod alignment;
pub mod builder;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod loader;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod reduction;
pub mod types;
pub mod validation;

// Re-exports - Core types
pub use error::{OfiError, Result};
pub use types::{BookLevel, BookMessage, EventKind, MAX_LEVELS};

// Re-exports - Config
pub use config::{
    AlignmentConfig, BarConfig, ExperimentMetadata, PipelineConfig, ReductionConfig,
    ValidationSwitches,
};

// Re-exports - Stages
pub use alignment::{BarFrame, DesignMatrix, MultiAssetAligner};
pub use features::order_flow::{extract_level_flows, LevelFlow, MultiLevelOfiExtractor};
pub use preprocessing::{parse_frequency, Bar, BarAggregator, DepthScope};
pub use reduction::{correlation_matrix, IntegratedOfi, IntegratedOfiReducer, LoadingNorm};

// Re-exports - I/O
pub use export::{export_to_numpy, CsvExporter, NumpyExporter};
pub use loader::{load_messages, read_messages};

// Re-exports - Validation
pub use validation::{validate_timestamps, BookValidator, ValidationConfig, ValidationResult};

// Re-exports - Pipeline
pub use builder::PipelineBuilder;
pub use pipeline::{OfiPipeline, PipelineOutput};
