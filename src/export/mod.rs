//! Data Export Module
//!
//! Export bar frames and design matrices for downstream research.
//!
//! # Supported Formats
//!
//! - NumPy (.npy) - For Python/pandas integration
//! - JSON - For metadata
//! - CSV - see [`csv_export`]
//!
//! # Files
//!
//! | File | Shape | Description |
//! |------|-------|-------------|
//! | `{SYM}_bar_start_ns.npy` | `[bars]` u64 | Bar start timestamps |
//! | `{SYM}_ofi.npy` | `[bars, levels + 1]` f64 | Normalized OFI per level, then integrated |
//! | `{SYM}_raw_ofi.npy` | `[bars, levels]` f64 | Summed OFI before normalization |
//! | `{SYM}_depth.npy` | `[bars, levels]` f64 | Average depth per level |
//! | `{SYM}_corr.npy` | `[levels, levels]` f64 | Correlation of normalized OFI between levels |
//! | `{SYM}_metadata.json` | | Columns, loadings, counts |
//! | `design_matrix.npy` | `[rows, cols]` f64 | NaN where a symbol has no bar |
//! | `design_mask.npy` | `[rows, cols]` u8 | 1 where a value is present |
//! | `design_index.npy` | `[rows]` u64 | Row bar start timestamps |
//! | `design_metadata.json` | | Column names, gap count |
//!
//! # Example
//!
//! ```ignore
//! use ofi_features::export::NumpyExporter;
//!
//! let exporter = NumpyExporter::new(output_dir);
//! exporter.export(&pipeline_output)?;
//! ```

pub mod csv_export;

pub use csv_export::{read_design, read_design_csv, CsvExporter};

use crate::alignment::{level_column, BarFrame, DesignMatrix, INTEGRATED_COLUMN};
use crate::error::Result;
use crate::pipeline::PipelineOutput;
use ndarray::{Array1, Array2};
use ndarray_npy::WriteNpyExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// File-name-safe form of a symbol (`BRK/B` -> `BRK_B`).
pub fn file_stem(symbol: &str) -> String {
    symbol
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Metadata written next to a symbol's arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub symbol: String,

    /// Book levels per bar
    pub levels: usize,

    /// Number of bars
    pub n_bars: usize,

    /// Bars without any message
    pub n_empty_bars: usize,

    /// Bar width (ns), if any bar exists
    pub bar_duration_ns: Option<u64>,

    /// Column names of `{SYM}_ofi.npy`
    pub columns: Vec<String>,

    /// First-component weights
    pub loadings: Vec<f64>,

    pub explained_variance_ratio: f64,

    /// Zero-variance fallback used
    pub degenerate: bool,

    /// Messages behind the frame
    pub messages_processed: usize,

    /// Message count per bar
    pub message_counts: Vec<usize>,

    /// Export timestamp
    pub export_timestamp: String,
}

impl FrameMetadata {
    pub fn from_frame(frame: &BarFrame) -> Self {
        let mut columns: Vec<String> = (0..frame.levels).map(level_column).collect();
        columns.push(INTEGRATED_COLUMN.to_string());

        Self {
            symbol: frame.symbol.clone(),
            levels: frame.levels,
            n_bars: frame.len(),
            n_empty_bars: frame.bars.iter().filter(|b| b.is_empty()).count(),
            bar_duration_ns: frame.bars.first().map(|b| b.end_ns - b.start_ns),
            columns,
            loadings: frame.loadings.clone(),
            explained_variance_ratio: frame.explained_variance_ratio,
            degenerate: frame.degenerate,
            messages_processed: frame.messages_processed,
            message_counts: frame.bars.iter().map(|b| b.message_count).collect(),
            export_timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Metadata written next to the design matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignMetadata {
    pub n_rows: usize,
    pub n_cols: usize,

    /// Column names of `design_matrix.npy`
    pub columns: Vec<String>,

    /// Number of missing cells
    pub missing_count: usize,

    /// Rows without any missing cell
    pub complete_rows: usize,

    /// Export timestamp
    pub export_timestamp: String,
}

impl DesignMetadata {
    pub fn from_design(design: &DesignMatrix) -> Self {
        Self {
            n_rows: design.n_rows(),
            n_cols: design.n_cols(),
            columns: design.columns().to_vec(),
            missing_count: design.missing_count(),
            complete_rows: design.complete_rows().len(),
            export_timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// NumPy exporter - exports to .npy files for Python
pub struct NumpyExporter {
    output_dir: PathBuf,
}

impl NumpyExporter {
    /// Create new NumPy exporter
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export every frame and the design matrix.
    pub fn export(&self, output: &PipelineOutput) -> Result<()> {
        for frame in &output.frames {
            self.export_frame(frame)?;
        }
        self.export_design(&output.design)
    }

    /// Export one symbol's bars.
    pub fn export_frame(&self, frame: &BarFrame) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        let stem = file_stem(&frame.symbol);
        let rows = frame.len();
        let levels = frame.levels;

        let starts = Array1::from_vec(frame.index());
        self.write(&format!("{stem}_bar_start_ns.npy"), &starts)?;

        let ofi = Array2::from_shape_fn((rows, levels + 1), |(r, c)| {
            let bar = &frame.bars[r];
            if c < levels {
                bar.normalized_ofi.get(c).copied().unwrap_or(0.0)
            } else {
                bar.integrated_ofi
            }
        });
        self.write(&format!("{stem}_ofi.npy"), &ofi)?;

        let raw = Array2::from_shape_fn((rows, levels), |(r, c)| {
            frame.bars[r].ofi.get(c).copied().unwrap_or(0.0)
        });
        self.write(&format!("{stem}_raw_ofi.npy"), &raw)?;

        let depth = Array2::from_shape_fn((rows, levels), |(r, c)| {
            frame.bars[r].avg_depth.get(c).copied().unwrap_or(0.0)
        });
        self.write(&format!("{stem}_depth.npy"), &depth)?;

        self.write(&format!("{stem}_corr.npy"), &frame.level_correlation()?)?;

        self.write_json(
            &format!("{stem}_metadata.json"),
            &FrameMetadata::from_frame(frame),
        )?;

        log::info!(
            "exported {} [{} bars × {} levels] to {}",
            frame.symbol,
            rows,
            levels,
            self.output_dir.display()
        );
        Ok(())
    }

    /// Export the aligned design matrix.
    pub fn export_design(&self, design: &DesignMatrix) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;

        self.write("design_matrix.npy", &design.to_array())?;
        self.write("design_mask.npy", &design.presence_mask())?;
        self.write("design_index.npy", &Array1::from_vec(design.index().to_vec()))?;
        self.write_json("design_metadata.json", &DesignMetadata::from_design(design))?;

        log::info!(
            "exported design matrix [{} rows × {} columns, {} gaps] to {}",
            design.n_rows(),
            design.n_cols(),
            design.missing_count(),
            self.output_dir.display()
        );
        Ok(())
    }

    fn write<T: WriteNpyExt>(&self, name: &str, array: &T) -> Result<()> {
        let path = self.output_dir.join(name);
        let file = File::create(&path)?;
        array.write_npy(file)?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.output_dir.join(name);
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, value)?;
        Ok(())
    }
}

/// Convenience function for direct export
pub fn export_to_numpy<P: AsRef<Path>>(output: &PipelineOutput, output_dir: P) -> Result<()> {
    NumpyExporter::new(output_dir).export(output)
}

/// Read a metadata file written by [`NumpyExporter`].
pub fn read_frame_metadata<P: AsRef<Path>>(path: P) -> Result<FrameMetadata> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}
