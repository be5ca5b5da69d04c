//! Depth normalization of bar-level OFI (Eq. 3).
//!
//! Summed OFI over a bar is divided by the average resting depth observed in
//! that bar, which controls for the liquidity scale of each level:
//!
//! ```text
//! ofi_norm_m = OFI_m / Q_m        Q_m = mean over messages of (q^bid_m + q^ask_m)
//! ```
//!
//! Two scopes are supported:
//!
//! - [`DepthScope::PerLevel`]: each level uses its own `Q_m`.
//! - [`DepthScope::Pooled`]: every level uses the pooled
//!   `Q = mean_m(Q_m) / 2`, the form used in the paper's Eq. 3.
//!
//! A zero (or non-finite) denominator yields `0.0`, never NaN.

use serde::{Deserialize, Serialize};

/// Which depth figure divides each level's OFI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DepthScope {
    /// Level `m` is divided by its own average depth.
    #[default]
    PerLevel,

    /// All levels are divided by half the mean of per-level average depths.
    Pooled,
}

/// Running mean of resting depth over one bar.
#[derive(Debug, Clone, Default)]
pub struct DepthNormalizer {
    depth_sum: f64,
    count: usize,
}

impl DepthNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average depth seen so far (0 when empty).
    pub fn mean_depth(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.depth_sum / self.count as f64
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Record the resting depth of one message.
    #[inline]
    pub fn update(&mut self, depth: f64) {
        self.depth_sum += depth;
        self.count += 1;
    }
}

/// `value / depth`, or `0.0` when `depth` is not strictly positive and finite.
#[inline]
pub fn normalize_by_depth(value: f64, depth: f64) -> f64 {
    if depth > 0.0 && depth.is_finite() {
        value / depth
    } else {
        0.0
    }
}

/// Pooled denominator: half the mean of per-level average depths.
pub fn pooled_depth(avg_depth: &[f64]) -> f64 {
    if avg_depth.is_empty() {
        return 0.0;
    }
    avg_depth.iter().sum::<f64>() / avg_depth.len() as f64 / 2.0
}

/// Normalize summed per-level OFI by average depth under `scope`.
pub fn normalize_levels(raw_ofi: &[f64], avg_depth: &[f64], scope: DepthScope) -> Vec<f64> {
    match scope {
        DepthScope::PerLevel => raw_ofi
            .iter()
            .zip(avg_depth.iter())
            .map(|(&s, &d)| normalize_by_depth(s, d))
            .collect(),
        DepthScope::Pooled => {
            let d = pooled_depth(avg_depth);
            raw_ofi.iter().map(|&s| normalize_by_depth(s, d)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_depth_is_zero() {
        assert_eq!(normalize_by_depth(42.0, 0.0), 0.0);
        assert_eq!(normalize_by_depth(42.0, f64::NAN), 0.0);
        assert_eq!(normalize_by_depth(-3.0, -1.0), 0.0);
    }

    #[test]
    fn test_depth_normalizer_mean() {
        let mut n = DepthNormalizer::new();
        assert_eq!(n.mean_depth(), 0.0);

        n.update(100.0);
        n.update(300.0);
        assert_eq!(n.count(), 2);
        assert!((n.mean_depth() - 200.0).abs() < 1e-12);
        assert!((normalize_by_depth(50.0, n.mean_depth()) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_per_level_scope() {
        let out = normalize_levels(&[10.0, 10.0, 5.0], &[100.0, 20.0, 0.0], DepthScope::PerLevel);
        assert_eq!(out, vec![0.1, 0.5, 0.0]);
    }

    #[test]
    fn test_pooled_scope() {
        // mean depth = 100, pooled = 50
        let out = normalize_levels(&[10.0, -25.0], &[150.0, 50.0], DepthScope::Pooled);
        assert!((out[0] - 0.2).abs() < 1e-12);
        assert!((out[1] + 0.5).abs() < 1e-12);
    }
}
