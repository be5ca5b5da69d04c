//! Fluent builder for pipeline configuration.
//!
//! # Quick Start
//!
//! ```ignore
//! use ofi_features::PipelineBuilder;
//!
//! // Defaults: 10 levels, 1-minute bars, per-level depth, L2 loadings
//! let pipeline = PipelineBuilder::new().build()?;
//! let output = pipeline.process_file("book.csv")?;
//! ```
//!
//! # Common Configurations
//!
//! ## Paper-style normalization
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .frequency("1min")?
//!     .depth_scope(DepthScope::Pooled)
//!     .loading_norm(LoadingNorm::L1)
//!     .build()?;
//! ```
//!
//! ## Multi-asset design matrix with level columns
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .symbols(["AAPL", "MSFT", "JPM"])
//!     .include_levels(true)
//!     .build()?;
//! ```

use crate::config::{ExperimentMetadata, PipelineConfig};
use crate::error::{OfiError, Result};
use crate::pipeline::OfiPipeline;
use crate::preprocessing::bars::{format_frequency, parse_frequency};
use crate::preprocessing::normalization::DepthScope;
use crate::reduction::LoadingNorm;

/// Fluent builder for [`OfiPipeline`].
///
/// Every setter overrides one field of a default [`PipelineConfig`]; the
/// result is validated once in [`PipelineBuilder::build_config`].
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a new pipeline builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Number of book levels (1..=10).
    pub fn levels(mut self, levels: usize) -> Self {
        self.config.levels = levels;
        self
    }

    /// Symbols to process, in design-matrix column order.
    pub fn symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.with_symbols(symbols);
        self
    }

    /// Bar width in nanoseconds.
    pub fn bar_duration_ns(mut self, duration_ns: u64) -> Self {
        self.config.bars.duration_ns = duration_ns;
        self
    }

    /// Bar width from a frequency string (`"1min"`, `"30s"`, `"5T"`).
    pub fn frequency(mut self, freq: &str) -> Result<Self> {
        self.config.bars.duration_ns = parse_frequency(freq)?;
        Ok(self)
    }

    /// Turn depth normalization on or off.
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.config.bars.normalize = normalize;
        self
    }

    pub fn depth_scope(mut self, scope: DepthScope) -> Self {
        self.config.bars.depth_scope = scope;
        self
    }

    pub fn loading_norm(mut self, norm: LoadingNorm) -> Self {
        self.config.reduction.loading_norm = norm;
        self
    }

    /// Add per-level normalized OFI columns to the design matrix.
    pub fn include_levels(mut self, include: bool) -> Self {
        self.config.alignment.include_levels = include;
        self
    }

    /// Run (or skip) per-message book checks.
    pub fn check_book(mut self, check: bool) -> Self {
        self.config.validation.check_book = check;
        self
    }

    pub fn max_gap_secs(mut self, secs: f64) -> Self {
        self.config.validation.max_gap_secs = secs;
        self
    }

    /// Set experiment metadata.
    ///
    /// Automatically sets created_at to current time.
    pub fn experiment(mut self, name: &str, description: &str) -> Self {
        self.config.metadata = Some(ExperimentMetadata {
            name: name.to_string(),
            description: Some(description.to_string()),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            version: None,
            tags: None,
        });
        self
    }

    /// Set experiment metadata with full control.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.config.metadata = Some(metadata);
        self
    }

    /// Build and validate the configuration.
    pub fn build_config(self) -> std::result::Result<PipelineConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build a ready-to-use pipeline.
    pub fn build(self) -> Result<OfiPipeline> {
        let config = self.build_config().map_err(OfiError::Config)?;
        OfiPipeline::from_config(config)
    }

    /// Get a summary of the current configuration.
    pub fn summary(&self) -> String {
        let symbols = if self.config.symbols.is_empty() {
            "all".to_string()
        } else {
            self.config.symbols.join(", ")
        };
        let normalization = if self.config.bars.normalize {
            format!("{:?}", self.config.bars.depth_scope)
        } else {
            "off".to_string()
        };

        format!(
            "PipelineBuilder Summary:\n\
             - Levels: {}\n\
             - Bars: {}\n\
             - Depth normalization: {}\n\
             - Loadings: {:?}\n\
             - Symbols: {}\n\
             - Level columns: {}",
            self.config.levels,
            format_frequency(self.config.bars.duration_ns),
            normalization,
            self.config.reduction.loading_norm,
            symbols,
            self.config.alignment.include_levels,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let config = PipelineBuilder::new().build_config().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_builder_overrides() {
        let config = PipelineBuilder::new()
            .levels(5)
            .frequency("30s")
            .unwrap()
            .depth_scope(DepthScope::Pooled)
            .loading_norm(LoadingNorm::L1)
            .include_levels(true)
            .symbols(["AAPL", "MSFT"])
            .build_config()
            .unwrap();

        assert_eq!(config.levels, 5);
        assert_eq!(config.bars.duration_ns, 30_000_000_000);
        assert_eq!(config.bars.depth_scope, DepthScope::Pooled);
        assert_eq!(config.reduction.loading_norm, LoadingNorm::L1);
        assert!(config.alignment.include_levels);
        assert_eq!(config.symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_builder_rejects_invalid() {
        assert!(PipelineBuilder::new().levels(11).build().is_err());
        assert!(PipelineBuilder::new().bar_duration_ns(0).build().is_err());
        assert!(PipelineBuilder::new().frequency("fortnight").is_err());
    }

    #[test]
    fn test_experiment_metadata() {
        let config = PipelineBuilder::new()
            .experiment("ofi_baseline", "first run")
            .build_config()
            .unwrap();
        let metadata = config.metadata.unwrap();
        assert_eq!(metadata.name, "ofi_baseline");
        assert!(metadata.created_at.is_some());
    }

    #[test]
    fn test_summary() {
        let summary = PipelineBuilder::new().normalize(false).summary();
        assert!(summary.contains("Levels: 10"));
        assert!(summary.contains("Bars: 1min"));
        assert!(summary.contains("Depth normalization: off"));
    }
}
