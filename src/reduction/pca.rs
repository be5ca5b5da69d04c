//! First principal component of the level-wise OFI matrix.
//!
//! The covariance of the `bars × levels` matrix is decomposed with a dense
//! symmetric eigen-solver; the eigenvector of the largest eigenvalue is the
//! first principal axis.
//!
//! # Sign Convention
//!
//! Eigenvectors are only defined up to sign. The returned axis is flipped so
//! that its first non-negligible loading (level 0 in practice) is positive,
//! which makes repeated fits and fits across symbols comparable.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, Axis};

/// Loadings with magnitude below this are treated as zero when fixing the sign.
pub const LOADING_EPS: f64 = 1e-12;

/// First principal axis of a data matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct FirstComponent {
    /// Unit-length, sign-normalized axis (one entry per column)
    pub loadings: Array1<f64>,

    /// Column means used to center the covariance
    pub mean: Array1<f64>,

    /// Largest eigenvalue of the covariance
    pub explained_variance: f64,

    /// `explained_variance / total variance`
    pub explained_variance_ratio: f64,
}

/// Whether every column of `x` is constant (zero variance everywhere).
pub fn is_constant(x: &Array2<f64>) -> bool {
    let Some(first) = x.outer_iter().next() else {
        return true;
    };
    x.outer_iter().all(|row| row == first)
}

/// Column means and sample covariance (`n - 1` denominator).
///
/// Returns `None` for fewer than two rows.
pub fn covariance(x: &Array2<f64>) -> Option<(Array1<f64>, Array2<f64>)> {
    let n = x.nrows();
    if n < 2 {
        return None;
    }
    let mean = x.mean_axis(Axis(0))?;
    let centered = x - &mean;
    let cov = centered.t().dot(&centered) / (n as f64 - 1.0);
    Some((mean, cov))
}

/// Flip `w` so its first non-negligible entry is positive.
pub fn normalize_sign(w: &mut Array1<f64>) {
    if let Some(&pivot) = w.iter().find(|v| v.abs() > LOADING_EPS) {
        if pivot < 0.0 {
            w.mapv_inplace(|v| -v);
        }
    }
}

/// Fit the first principal component of `x` (`rows × columns`).
///
/// Returns `None` when the matrix is degenerate: fewer than two rows, no
/// columns, or zero variance in every column.
pub fn first_component(x: &Array2<f64>) -> Option<FirstComponent> {
    let p = x.ncols();
    if p == 0 || x.nrows() < 2 || is_constant(x) {
        return None;
    }

    let (mean, cov) = covariance(x)?;
    let total: f64 = cov.diag().sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }

    let eigen = SymmetricEigen::new(DMatrix::from_fn(p, p, |i, j| cov[[i, j]]));

    // Largest eigenvalue; ties resolve to the lowest index.
    let (best, &lambda) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .fold(None, |acc: Option<(usize, &f64)>, (i, v)| match acc {
            Some((_, best)) if best >= v => acc,
            _ => Some((i, v)),
        })?;

    let mut loadings: Array1<f64> = eigen.eigenvectors.column(best).iter().copied().collect();
    let norm = loadings.dot(&loadings).sqrt();
    if !(norm > 0.0) {
        return None;
    }
    loadings /= norm;
    normalize_sign(&mut loadings);

    let explained_variance = lambda.max(0.0);
    Some(FirstComponent {
        loadings,
        mean,
        explained_variance,
        explained_variance_ratio: explained_variance / total,
    })
}

/// Pearson correlation between the columns of `x`.
///
/// Columns with zero variance correlate as `0.0` with everything, including
/// themselves. Fewer than two rows gives an all-zero matrix.
pub fn correlation_matrix(x: &Array2<f64>) -> Array2<f64> {
    let p = x.ncols();
    let Some((_, cov)) = covariance(x) else {
        return Array2::zeros((p, p));
    };
    let std: Vec<f64> = cov.diag().iter().map(|v| v.max(0.0).sqrt()).collect();

    Array2::from_shape_fn((p, p), |(i, j)| {
        let denom = std[i] * std[j];
        if denom > 0.0 {
            (cov[[i, j]] / denom).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_constant_matrix_is_degenerate() {
        let x = array![[1.0, 2.0], [1.0, 2.0], [1.0, 2.0]];
        assert!(is_constant(&x));
        assert!(first_component(&x).is_none());
    }

    #[test]
    fn test_single_row_is_degenerate() {
        let x = array![[1.0, 2.0, 3.0]];
        assert!(first_component(&x).is_none());
    }

    #[test]
    fn test_perfectly_correlated_columns() {
        // Column 1 = 2 × column 0: axis is (1, 2)/√5
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [-1.0, -2.0]];
        let pc = first_component(&x).unwrap();
        let expected = [1.0 / 5f64.sqrt(), 2.0 / 5f64.sqrt()];
        assert!((pc.loadings[0] - expected[0]).abs() < 1e-9);
        assert!((pc.loadings[1] - expected[1]).abs() < 1e-9);
        assert!((pc.explained_variance_ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sign_is_normalized() {
        // Negatively related columns: level 0 loading must still be positive.
        let x = array![[1.0, -1.0], [2.0, -2.1], [3.0, -2.9], [4.0, -4.2]];
        let pc = first_component(&x).unwrap();
        assert!(pc.loadings[0] > 0.0);
        assert!(pc.loadings[1] < 0.0);
    }

    #[test]
    fn test_sign_pivot_skips_zero_loading() {
        let mut w = array![0.0, -0.6, 0.8];
        normalize_sign(&mut w);
        assert_eq!(w, array![-0.0, 0.6, -0.8]);
    }

    #[test]
    fn test_refit_is_deterministic() {
        let x = array![
            [0.3, 0.1, -0.2],
            [-0.5, -0.4, 0.1],
            [0.9, 0.7, 0.3],
            [0.0, 0.2, -0.6],
            [-0.1, -0.3, 0.4]
        ];
        let a = first_component(&x).unwrap();
        let b = first_component(&x).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_correlation_matrix() {
        let x = array![[1.0, 2.0, 5.0], [2.0, 4.0, 5.0], [3.0, 6.0, 5.0]];
        let c = correlation_matrix(&x);
        assert!((c[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((c[[0, 1]] - 1.0).abs() < 1e-12);
        assert_eq!(c[[2, 2]], 0.0);
        assert_eq!(c[[0, 2]], 0.0);
    }
}
