//! Integrated OFI (Eq. 4).
//!
//! Compresses the per-level normalized OFI of a symbol's bars into a single
//! scalar per bar: the projection of the bar's level vector onto the first
//! principal axis of the full bar history.
//!
//! # Policy
//!
//! - Batch fit: loadings are fit once over every bar of the symbol and reused
//!   for all of them. There is no train/test split at this stage.
//! - Projection is the raw dot product `integrated = Σ_m w_m · ofi_norm_m`,
//!   so bars without messages stay exactly zero.
//! - Degenerate history (fewer than two bars, or every level constant):
//!   integrated OFI is zero for every bar.
//!
//! # Example
//!
//! ```ignore
//! use ofi_features::reduction::{IntegratedOfiReducer, LoadingNorm};
//!
//! let reducer = IntegratedOfiReducer::new().with_loading_norm(LoadingNorm::L1);
//! let fit = reducer.reduce(&mut bars)?;
//! println!("explained variance: {:.1}%", fit.explained_variance_ratio * 100.0);
//! ```

pub mod pca;

pub use pca::{correlation_matrix, first_component, FirstComponent};

use crate::config::ReductionConfig;
use crate::error::{OfiError, Result};
use crate::preprocessing::bars::Bar;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Scaling applied to the sign-normalized first principal axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadingNorm {
    /// Unit Euclidean length (orthogonal projection).
    #[default]
    L2,

    /// Absolute loadings sum to one.
    L1,
}

/// Result of fitting and applying the reducer to one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratedOfi {
    /// Weights applied to each level (all zero when degenerate)
    pub loadings: Vec<f64>,

    /// Integrated OFI per bar
    pub values: Vec<f64>,

    /// Share of total variance captured by the first component
    pub explained_variance_ratio: f64,

    /// Whether the zero-variance fallback was used
    pub degenerate: bool,
}

/// Fits the first principal component and projects bars onto it.
#[derive(Debug, Clone, Default)]
pub struct IntegratedOfiReducer {
    loading_norm: LoadingNorm,
}

impl IntegratedOfiReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ReductionConfig) -> Self {
        Self::new().with_loading_norm(config.loading_norm)
    }

    pub fn with_loading_norm(mut self, norm: LoadingNorm) -> Self {
        self.loading_norm = norm;
        self
    }

    pub fn loading_norm(&self) -> LoadingNorm {
        self.loading_norm
    }

    /// Fit on `x` (`bars × levels`) and project every row.
    pub fn fit_transform(&self, x: &Array2<f64>) -> IntegratedOfi {
        let levels = x.ncols();
        let Some(pc) = first_component(x) else {
            log::warn!(
                "degenerate OFI matrix ({} × {}): integrated OFI set to zero",
                x.nrows(),
                levels
            );
            return IntegratedOfi {
                loadings: vec![0.0; levels],
                values: vec![0.0; x.nrows()],
                explained_variance_ratio: 0.0,
                degenerate: true,
            };
        };

        let weights = self.scale(pc.loadings);
        let values = x.dot(&weights).to_vec();

        IntegratedOfi {
            loadings: weights.to_vec(),
            values,
            explained_variance_ratio: pc.explained_variance_ratio,
            degenerate: false,
        }
    }

    /// Fit on the bars' normalized OFI and write `integrated_ofi` into each bar.
    pub fn reduce(&self, bars: &mut [Bar]) -> Result<IntegratedOfi> {
        let x = bars_to_matrix(bars)?;
        let fit = self.fit_transform(&x);
        for (bar, &value) in bars.iter_mut().zip(fit.values.iter()) {
            bar.integrated_ofi = value;
        }
        Ok(fit)
    }

    fn scale(&self, w: Array1<f64>) -> Array1<f64> {
        match self.loading_norm {
            LoadingNorm::L2 => w,
            LoadingNorm::L1 => {
                let l1: f64 = w.iter().map(|v| v.abs()).sum();
                if l1 > 0.0 {
                    w / l1
                } else {
                    w
                }
            }
        }
    }
}

/// Stack the bars' normalized OFI into a `bars × levels` matrix.
pub fn bars_to_matrix(bars: &[Bar]) -> Result<Array2<f64>> {
    let levels = bars.first().map_or(0, |b| b.normalized_ofi.len());
    if let Some(bar) = bars.iter().find(|b| b.normalized_ofi.len() != levels) {
        return Err(OfiError::ShapeMismatch(format!(
            "bar at {} has {} levels, expected {}",
            bar.start_ns,
            bar.normalized_ofi.len(),
            levels
        )));
    }

    let flat: Vec<f64> = bars
        .iter()
        .flat_map(|b| b.normalized_ofi.iter().copied())
        .collect();
    Array2::from_shape_vec((bars.len(), levels), flat)
        .map_err(|e| OfiError::ShapeMismatch(format!("failed to build OFI matrix: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn bar(start: u64, values: &[f64]) -> Bar {
        let mut bar = Bar::empty("TEST", start, start + 60, values.len());
        bar.normalized_ofi = values.to_vec();
        bar.message_count = 1;
        bar
    }

    #[test]
    fn test_degenerate_gives_zeros() {
        let mut bars = vec![bar(0, &[0.5, 0.5]), bar(60, &[0.5, 0.5]), bar(120, &[0.5, 0.5])];
        let fit = IntegratedOfiReducer::new().reduce(&mut bars).unwrap();
        assert!(fit.degenerate);
        assert!(fit.values.iter().all(|&v| v == 0.0));
        assert!(bars.iter().all(|b| b.integrated_ofi == 0.0));
    }

    #[test]
    fn test_projection_uses_loadings() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [-1.0, -1.0], [0.0, 0.0]];
        let fit = IntegratedOfiReducer::new().fit_transform(&x);
        let w = 1.0 / 2f64.sqrt();
        assert!((fit.loadings[0] - w).abs() < 1e-9);
        assert!((fit.values[1] - 4.0 * w).abs() < 1e-9);
        assert_eq!(fit.values[3], 0.0);
    }

    #[test]
    fn test_l1_loadings_sum_to_one() {
        let x = array![[1.0, 3.0], [2.0, 5.0], [-1.0, -4.0], [0.5, 0.0]];
        let fit = IntegratedOfiReducer::new()
            .with_loading_norm(LoadingNorm::L1)
            .fit_transform(&x);
        let l1: f64 = fit.loadings.iter().map(|v| v.abs()).sum();
        assert!((l1 - 1.0).abs() < 1e-12);
        assert!(fit.loadings[0] > 0.0);
    }

    #[test]
    fn test_empty_bars_stay_zero() {
        let mut bars = vec![
            bar(0, &[1.0, 0.5]),
            Bar::empty("TEST", 60, 120, 2),
            bar(120, &[-2.0, -0.7]),
            bar(180, &[0.3, 0.9]),
        ];
        IntegratedOfiReducer::new().reduce(&mut bars).unwrap();
        assert_eq!(bars[1].integrated_ofi, 0.0);
        assert_ne!(bars[0].integrated_ofi, 0.0);
    }

    #[test]
    fn test_ragged_bars_rejected() {
        let bars = vec![bar(0, &[1.0, 2.0]), bar(60, &[1.0])];
        assert!(matches!(
            bars_to_matrix(&bars),
            Err(OfiError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_no_bars() {
        let mut bars: Vec<Bar> = Vec::new();
        let fit = IntegratedOfiReducer::new().reduce(&mut bars).unwrap();
        assert!(fit.degenerate);
        assert!(fit.values.is_empty());
    }
}
