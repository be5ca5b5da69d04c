//! Multi-asset alignment of bar-level OFI.
//!
//! Joins per-symbol bar frames on bar start time into a single
//! [`DesignMatrix`]. The row index is the sorted, deduplicated union of every
//! symbol's bar timestamps (an outer join).
//!
//! # Missing vs. Zero
//!
//! A symbol without a bar at some row (its session did not cover that bucket)
//! gets `None` in that cell. Zero is a meaningful "no net flow" value and is
//! never used as a stand-in for missing data.
//!
//! # Columns
//!
//! For each symbol, in input order:
//!
//! - `{SYMBOL}.ofi_integrated`
//! - `{SYMBOL}.ofi_00` .. `{SYMBOL}.ofi_NN` (normalized levels, optional)

use crate::error::{OfiError, Result};
use crate::preprocessing::bars::Bar;
use crate::reduction::{bars_to_matrix, correlation_matrix};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Column name of the integrated OFI.
pub const INTEGRATED_COLUMN: &str = "ofi_integrated";

/// Column name of normalized OFI at level `m` (`ofi_00`, `ofi_01`, ...).
pub fn level_column(m: usize) -> String {
    format!("ofi_{m:02}")
}

/// Namespace a column with its symbol.
pub fn qualified_column(symbol: &str, column: &str) -> String {
    format!("{symbol}.{column}")
}

/// All bars of one symbol plus the fitted reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarFrame {
    pub symbol: String,

    /// Number of book levels in each bar
    pub levels: usize,

    /// Bars in increasing start order
    pub bars: Vec<Bar>,

    /// First-component weights used for the integrated OFI
    pub loadings: Vec<f64>,

    /// Variance share of the first component
    pub explained_variance_ratio: f64,

    /// Whether the zero-variance fallback was used
    pub degenerate: bool,

    /// Messages that produced the frame
    pub messages_processed: usize,
}

impl BarFrame {
    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bar start timestamps.
    pub fn index(&self) -> Vec<u64> {
        self.bars.iter().map(|b| b.start_ns).collect()
    }

    pub fn integrated(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.integrated_ofi).collect()
    }

    /// Bar starting at `start_ns`, if any.
    pub fn get(&self, start_ns: u64) -> Option<&Bar> {
        self.bars
            .binary_search_by_key(&start_ns, |b| b.start_ns)
            .ok()
            .map(|i| &self.bars[i])
    }

    /// Normalized OFI as a `bars × levels` matrix.
    pub fn normalized_matrix(&self) -> Result<Array2<f64>> {
        bars_to_matrix(&self.bars)
    }

    /// Correlation between levels of normalized OFI (`levels × levels`).
    pub fn level_correlation(&self) -> Result<Array2<f64>> {
        if self.bars.is_empty() {
            return Ok(Array2::zeros((self.levels, self.levels)));
        }
        Ok(correlation_matrix(&self.normalized_matrix()?))
    }
}

/// Aligned multi-asset feature matrix with explicit gaps.
///
/// Stored column-major; `None` marks a missing symbol/bar combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignMatrix {
    index: Vec<u64>,
    columns: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

impl DesignMatrix {
    /// Build a matrix, checking its invariants.
    ///
    /// The index must be strictly increasing, column names unique and every
    /// column as long as the index.
    pub fn new(index: Vec<u64>, columns: Vec<String>, values: Vec<Vec<Option<f64>>>) -> Result<Self> {
        if let Some(w) = index.windows(2).find(|w| w[1] <= w[0]) {
            return Err(OfiError::generic(format!(
                "design index not strictly increasing: {} then {}",
                w[0], w[1]
            )));
        }
        if columns.len() != values.len() {
            return Err(OfiError::ShapeMismatch(format!(
                "{} column names for {} columns",
                columns.len(),
                values.len()
            )));
        }
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(OfiError::generic(format!("duplicate column {name:?}")));
            }
        }
        if let Some((name, col)) = columns
            .iter()
            .zip(values.iter())
            .find(|(_, c)| c.len() != index.len())
        {
            return Err(OfiError::ShapeMismatch(format!(
                "column {name:?} has {} rows, index has {}",
                col.len(),
                index.len()
            )));
        }
        Ok(Self {
            index,
            columns,
            values,
        })
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn index(&self) -> &[u64] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of a column by name.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.column_position(name).map(|i| self.values[i].as_slice())
    }

    /// Cell at `(row, col)`; `None` if missing or out of range.
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(col).and_then(|c| c.get(row)).copied().flatten()
    }

    /// Cell for column `name` at bar start `ts`.
    pub fn value_at(&self, ts: u64, name: &str) -> Option<f64> {
        let row = self.index.binary_search(&ts).ok()?;
        let col = self.column_position(name)?;
        self.value(row, col)
    }

    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        self.value(row, col).is_none()
    }

    pub fn row(&self, row: usize) -> Vec<Option<f64>> {
        self.values.iter().map(|c| c.get(row).copied().flatten()).collect()
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.values.iter().flatten().filter(|v| v.is_none()).count()
    }

    /// Rows without any missing cell (inner-join view).
    pub fn complete_rows(&self) -> Vec<usize> {
        (0..self.n_rows())
            .filter(|&r| self.values.iter().all(|c| c[r].is_some()))
            .collect()
    }

    /// Dense `rows × columns` array with NaN at gaps.
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.n_rows(), self.n_cols()), |(r, c)| {
            self.values[c][r].unwrap_or(f64::NAN)
        })
    }

    /// `rows × columns` mask, 1 where a value is present.
    pub fn presence_mask(&self) -> Array2<u8> {
        Array2::from_shape_fn((self.n_rows(), self.n_cols()), |(r, c)| {
            u8::from(self.values[c][r].is_some())
        })
    }
}

/// Outer-joins per-symbol frames on bar start time.
#[derive(Debug, Clone, Default)]
pub struct MultiAssetAligner {
    include_levels: bool,
}

impl MultiAssetAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also emit the normalized per-level columns of each symbol.
    pub fn with_levels(mut self, include_levels: bool) -> Self {
        self.include_levels = include_levels;
        self
    }

    pub fn align(&self, frames: &[BarFrame]) -> Result<DesignMatrix> {
        let mut symbols = HashSet::new();
        for frame in frames {
            if !symbols.insert(frame.symbol.as_str()) {
                return Err(OfiError::generic(format!(
                    "symbol {} appears in more than one frame",
                    frame.symbol
                )));
            }
            if let Some(w) = frame.bars.windows(2).find(|w| w[1].start_ns <= w[0].start_ns) {
                return Err(OfiError::generic(format!(
                    "{}: bar starts not strictly increasing ({} then {})",
                    frame.symbol, w[0].start_ns, w[1].start_ns
                )));
            }
        }

        let index: Vec<u64> = frames
            .iter()
            .flat_map(|f| f.bars.iter().map(|b| b.start_ns))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut columns = Vec::new();
        let mut values = Vec::new();

        for frame in frames {
            let rows: Vec<usize> = frame
                .bars
                .iter()
                .map(|b| index.binary_search(&b.start_ns).unwrap_or_else(|i| i))
                .collect();

            let mut integrated = vec![None; index.len()];
            for (&row, bar) in rows.iter().zip(frame.bars.iter()) {
                integrated[row] = Some(bar.integrated_ofi);
            }
            columns.push(qualified_column(&frame.symbol, INTEGRATED_COLUMN));
            values.push(integrated);

            if self.include_levels {
                for m in 0..frame.levels {
                    let mut level = vec![None; index.len()];
                    for (&row, bar) in rows.iter().zip(frame.bars.iter()) {
                        level[row] = bar.normalized_ofi.get(m).copied();
                    }
                    columns.push(qualified_column(&frame.symbol, &level_column(m)));
                    values.push(level);
                }
            }
        }

        let design = DesignMatrix::new(index, columns, values)?;
        log::info!(
            "aligned {} symbols: {} rows × {} columns, {} gaps",
            frames.len(),
            design.n_rows(),
            design.n_cols(),
            design.missing_count()
        );
        Ok(design)
    }
}
