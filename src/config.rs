//! Pipeline configuration management.
//!
//! One serializable struct drives every stage of OFI construction, so a run
//! can be reproduced from a TOML or JSON file.
//!
//! # Example
//!
//! ```ignore
//! use ofi_features::config::PipelineConfig;
//!
//! let config = PipelineConfig::default()
//!     .with_frequency("5min")?
//!     .with_symbols(["AAPL", "MSFT"]);
//!
//! config.save_toml("experiment.toml")?;
//! let loaded = PipelineConfig::load_toml("experiment.toml")?;
//! ```

use crate::error::{OfiError, Result};
use crate::preprocessing::bars::{parse_frequency, NS_PER_MIN};
use crate::preprocessing::normalization::DepthScope;
use crate::reduction::LoadingNorm;
use crate::types::MAX_LEVELS;
use std::fs;
use std::path::Path;

/// Unified pipeline configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// Number of book levels to use (1..=10)
    #[serde(default = "default_levels")]
    pub levels: usize,

    /// Symbols to process. Empty means every symbol in the input.
    #[serde(default)]
    pub symbols: Vec<String>,

    /// Bar aggregation
    #[serde(default)]
    pub bars: BarConfig,

    /// Integrated OFI reduction
    #[serde(default)]
    pub reduction: ReductionConfig,

    /// Multi-asset alignment
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Input checks
    #[serde(default)]
    pub validation: ValidationSwitches,

    /// Experiment metadata (optional)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<ExperimentMetadata>,
}

/// Bar aggregation settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BarConfig {
    /// Bar width in nanoseconds
    #[serde(default = "default_duration")]
    pub duration_ns: u64,

    /// Divide summed OFI by average depth (Eq. 3)
    #[serde(default = "default_true")]
    pub normalize: bool,

    /// Depth denominator used when normalizing
    #[serde(default)]
    pub depth_scope: DepthScope,
}

/// Integrated OFI settings.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReductionConfig {
    /// Scaling of the first principal axis
    #[serde(default)]
    pub loading_norm: LoadingNorm,
}

/// Design matrix settings.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlignmentConfig {
    /// Add `{SYMBOL}.ofi_NN` columns next to the integrated OFI
    #[serde(default)]
    pub include_levels: bool,
}

/// Which input checks the pipeline runs.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValidationSwitches {
    /// Check quotes and level ordering of every message (warnings only)
    #[serde(default = "default_true")]
    pub check_book: bool,

    /// Log a warning for gaps between messages longer than this (seconds)
    #[serde(default = "default_max_gap")]
    pub max_gap_secs: f64,
}

/// Experiment metadata for tracking and reproducibility.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<String>,

    /// Version or git commit
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tags: Option<Vec<String>>,
}

fn default_levels() -> usize {
    MAX_LEVELS
}

fn default_duration() -> u64 {
    NS_PER_MIN
}

fn default_true() -> bool {
    true
}

fn default_max_gap() -> f64 {
    60.0
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            levels: MAX_LEVELS,
            symbols: Vec::new(),
            bars: BarConfig::default(),
            reduction: ReductionConfig::default(),
            alignment: AlignmentConfig::default(),
            validation: ValidationSwitches::default(),
            metadata: None,
        }
    }
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            duration_ns: default_duration(),
            normalize: true,
            depth_scope: DepthScope::PerLevel,
        }
    }
}

impl Default for ValidationSwitches {
    fn default() -> Self {
        Self {
            check_book: true,
            max_gap_secs: default_max_gap(),
        }
    }
}

impl BarConfig {
    /// Bar config from a frequency string such as `"1min"` or `"30s"`.
    pub fn from_frequency(freq: &str) -> Result<Self> {
        Ok(Self {
            duration_ns: parse_frequency(freq)?,
            ..Default::default()
        })
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_bars(mut self, bars: BarConfig) -> Self {
        self.bars = bars;
        self
    }

    /// Set the bar width from a frequency string.
    pub fn with_frequency(mut self, freq: &str) -> Result<Self> {
        self.bars.duration_ns = parse_frequency(freq)?;
        Ok(self)
    }

    pub fn with_reduction(mut self, reduction: ReductionConfig) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_alignment(mut self, alignment: AlignmentConfig) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Validate the configuration.
    ///
    /// Returns Ok(()) if valid, Err(msg) otherwise.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.levels == 0 || self.levels > MAX_LEVELS {
            return Err(format!(
                "levels must be in 1..={MAX_LEVELS}, got {}",
                self.levels
            ));
        }

        if self.bars.duration_ns == 0 {
            return Err("bars.duration_ns must be > 0".to_string());
        }

        if self.validation.max_gap_secs.is_nan() || self.validation.max_gap_secs < 0.0 {
            return Err("validation.max_gap_secs must be >= 0".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for symbol in &self.symbols {
            if symbol.trim().is_empty() {
                return Err("symbols must not contain empty names".to_string());
            }
            if !seen.insert(symbol.as_str()) {
                return Err(format!("symbol {symbol:?} listed twice"));
            }
        }

        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load and validate configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&contents)?;
        config.validate().map_err(OfiError::Config)?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load and validate configuration from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&contents)?;
        config.validate().map_err(OfiError::Config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.levels, 10);
        assert_eq!(config.bars.duration_ns, 60_000_000_000);
        assert!(config.bars.normalize);
        assert!(config.symbols.is_empty());
    }

    #[test]
    fn test_invalid_levels() {
        assert!(PipelineConfig::default().with_levels(0).validate().is_err());
        assert!(PipelineConfig::default().with_levels(11).validate().is_err());
        assert!(PipelineConfig::default().with_levels(5).validate().is_ok());
    }

    #[test]
    fn test_duplicate_symbols_rejected() {
        let config = PipelineConfig::default().with_symbols(["AAPL", "AAPL"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_frequency() {
        let config = PipelineConfig::default().with_frequency("5s").unwrap();
        assert_eq!(config.bars.duration_ns, 5_000_000_000);
        assert!(PipelineConfig::default().with_frequency("0min").is_err());
    }

    #[test]
    fn test_save_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = PipelineConfig::default()
            .with_symbols(["AAPL", "JPM"])
            .with_reduction(ReductionConfig {
                loading_norm: LoadingNorm::L1,
            })
            .with_metadata(ExperimentMetadata {
                name: "ofi_test".to_string(),
                description: Some("Test configuration".to_string()),
                created_at: None,
                version: Some("0.1.0".to_string()),
                tags: Some(vec!["test".to_string()]),
            });

        config.save_toml(&path).unwrap();
        let loaded = PipelineConfig::load_toml(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = PipelineConfig::default().with_levels(5);
        config.bars.depth_scope = DepthScope::Pooled;
        config.save_json(&path).unwrap();

        let loaded = PipelineConfig::load_json(&path).unwrap();
        assert_eq!(loaded.levels, 5);
        assert_eq!(loaded.bars.depth_scope, DepthScope::Pooled);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            symbols = ["AAPL"]

            [bars]
            duration_ns = 5000000000
            "#,
        )
        .unwrap();
        assert_eq!(config.levels, 10);
        assert!(config.bars.normalize);
        assert_eq!(config.reduction.loading_norm, LoadingNorm::L2);
    }

    #[test]
    fn test_bars_table_without_duration() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [bars]
            normalize = false
            "#,
        )
        .unwrap();
        assert_eq!(config.bars.duration_ns, NS_PER_MIN);
        assert!(!config.bars.normalize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "levels = 0\n").unwrap();
        assert!(matches!(
            PipelineConfig::load_toml(&path),
            Err(OfiError::Config(_))
        ));
    }
}
