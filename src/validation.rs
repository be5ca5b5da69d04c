//! Input validation for book messages.
//!
//! Detects book anomalies before they reach the OFI computation.
//!
//! # Validation Categories
//!
//! 1. **Quote Consistency**: crossed quotes (error), locked quotes (warning)
//! 2. **Price Ordering**: bids decreasing and asks increasing across levels
//! 3. **Level Count**: more levels than the configured maximum
//! 4. **Timestamp Ordering**: monotonic timestamps, gap detection
//!
//! # Usage
//!
//! ```ignore
//! use ofi_features::validation::{BookValidator, validate_timestamps};
//!
//! let validator = BookValidator::default();
//! let result = validator.validate_message(&msg);
//! for warning in result.warnings() {
//!     log::warn!("{}", warning);
//! }
//! ```

use crate::types::{fixed_to_price, BookMessage, MAX_LEVELS};
use std::fmt;

/// Validation result for a single check.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    /// Data is valid
    Valid,
    /// Data has minor issues (warnings)
    Warning(String),
    /// Data has serious issues (errors)
    Error(String),
}

impl ValidationLevel {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationLevel::Valid)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationLevel::Warning(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationLevel::Error(_))
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Valid => write!(f, "Valid"),
            ValidationLevel::Warning(msg) => write!(f, "Warning: {msg}"),
            ValidationLevel::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Aggregated validation result.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    results: Vec<(String, ValidationLevel)>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation result.
    pub fn add(&mut self, check_name: &str, level: ValidationLevel) {
        self.results.push((check_name.to_string(), level));
    }

    /// Check if all validations passed (no errors or warnings).
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|(_, level)| level.is_valid())
    }

    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_error())
    }

    pub fn has_warnings(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_warning())
    }

    /// All warnings as `"check: message"`.
    pub fn warnings(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Warning(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    /// All errors as `"check: message"`.
    pub fn errors(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Error(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    pub fn all_results(&self) -> &[(String, ValidationLevel)] {
        &self.results
    }

    pub fn check_count(&self) -> usize {
        self.results.len()
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|(_, l)| l.is_valid()).count()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passed = self.passed_count();
        let total = self.check_count();
        writeln!(f, "Validation: {passed}/{total} checks passed")?;

        for (name, level) in &self.results {
            if !level.is_valid() {
                writeln!(f, "  - {name}: {level}")?;
            }
        }

        Ok(())
    }
}

/// Configuration for book validation.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Maximum number of levels a message may carry
    pub max_levels: usize,

    /// Check for crossed quotes (bid > ask)
    pub check_crossed_quotes: bool,

    /// Check for locked quotes (bid == ask)
    pub check_locked_quotes: bool,

    /// Check bids decrease and asks increase across levels
    pub check_price_ordering: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_levels: MAX_LEVELS,
            check_crossed_quotes: true,
            check_locked_quotes: true,
            check_price_ordering: true,
        }
    }
}

/// Validator for individual book messages.
#[derive(Debug, Clone, Default)]
pub struct BookValidator {
    config: ValidationConfig,
}

impl BookValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate one message.
    pub fn validate_message(&self, msg: &BookMessage) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.config.check_crossed_quotes || self.config.check_locked_quotes {
            self.validate_quote_consistency(msg, &mut result);
        }

        if self.config.check_price_ordering {
            self.validate_price_ordering(msg, &mut result);
        }

        if msg.levels.len() > self.config.max_levels {
            result.add(
                "level_count",
                ValidationLevel::Warning(format!(
                    "{} levels, only {} used",
                    msg.levels.len(),
                    self.config.max_levels
                )),
            );
        }

        result
    }

    fn validate_quote_consistency(&self, msg: &BookMessage, result: &mut ValidationResult) {
        match (msg.best_bid(), msg.best_ask()) {
            (Some(bid), Some(ask)) => {
                if bid > ask && self.config.check_crossed_quotes {
                    result.add(
                        "crossed_quotes",
                        ValidationLevel::Error(format!(
                            "Crossed quotes: bid {} > ask {}",
                            fixed_to_price(bid),
                            fixed_to_price(ask)
                        )),
                    );
                } else if bid == ask && self.config.check_locked_quotes {
                    result.add(
                        "locked_quotes",
                        ValidationLevel::Warning(format!(
                            "Locked quotes: bid == ask = {}",
                            fixed_to_price(bid)
                        )),
                    );
                } else {
                    result.add("quote_consistency", ValidationLevel::Valid);
                }
            }
            (None, None) => result.add(
                "quote_consistency",
                ValidationLevel::Warning("No quotes available".to_string()),
            ),
            (Some(_), None) => result.add(
                "quote_consistency",
                ValidationLevel::Warning("No ask quote available".to_string()),
            ),
            (None, Some(_)) => result.add(
                "quote_consistency",
                ValidationLevel::Warning("No bid quote available".to_string()),
            ),
        }
    }

    fn validate_price_ordering(&self, msg: &BookMessage, result: &mut ValidationResult) {
        let levels = msg.levels.len().min(self.config.max_levels);
        let book = &msg.levels[..levels];

        let bid_ordered = book.windows(2).all(|w| {
            !(w[0].has_bid() && w[1].has_bid()) || w[1].bid_price < w[0].bid_price
        });
        let ask_ordered = book.windows(2).all(|w| {
            !(w[0].has_ask() && w[1].has_ask()) || w[1].ask_price > w[0].ask_price
        });

        if bid_ordered {
            result.add("bid_price_ordering", ValidationLevel::Valid);
        } else {
            result.add(
                "bid_price_ordering",
                ValidationLevel::Warning("Bid prices not in decreasing order".to_string()),
            );
        }

        if ask_ordered {
            result.add("ask_price_ordering", ValidationLevel::Valid);
        } else {
            result.add(
                "ask_price_ordering",
                ValidationLevel::Warning("Ask prices not in increasing order".to_string()),
            );
        }
    }
}

/// Validate timestamp ordering and report large gaps.
///
/// A decrease is an error; a gap longer than `max_gap_secs` is a warning.
pub fn validate_timestamps(timestamps: &[u64], max_gap_secs: f64) -> ValidationResult {
    let mut result = ValidationResult::new();

    if timestamps.is_empty() {
        result.add(
            "timestamps",
            ValidationLevel::Warning("No timestamps to validate".to_string()),
        );
        return result;
    }

    let mut max_gap_ns = 0u64;
    for (i, w) in timestamps.windows(2).enumerate() {
        if w[1] < w[0] {
            result.add(
                "timestamp_ordering",
                ValidationLevel::Error(format!(
                    "Non-monotonic timestamp at index {}: {} < {}",
                    i + 1,
                    w[1],
                    w[0]
                )),
            );
            return result;
        }
        max_gap_ns = max_gap_ns.max(w[1] - w[0]);
    }
    result.add("timestamp_ordering", ValidationLevel::Valid);

    let max_gap_s = max_gap_ns as f64 / 1e9;
    if max_gap_s > max_gap_secs {
        result.add(
            "timestamp_gaps",
            ValidationLevel::Warning(format!("Large gap detected: {max_gap_s:.1}s")),
        );
    } else {
        result.add("timestamp_gaps", ValidationLevel::Valid);
    }

    result
}

/// Index of the first timestamp that decreases, if any.
pub fn first_out_of_order(timestamps: &[u64]) -> Option<usize> {
    timestamps.windows(2).position(|w| w[1] < w[0]).map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BookLevel, EventKind};

    const BID: i64 = 100_000_000_000;
    const ASK: i64 = 100_010_000_000;
    const TICK: i64 = 10_000_000;

    fn message(levels: Vec<BookLevel>) -> BookMessage {
        BookMessage::new(1, "TEST", EventKind::Add, levels)
    }

    #[test]
    fn test_valid_book() {
        let msg = message(vec![
            BookLevel::new(BID, 100, ASK, 100),
            BookLevel::new(BID - TICK, 200, ASK + TICK, 200),
        ]);
        let result = BookValidator::new().validate_message(&msg);
        assert!(result.is_valid(), "{result}");
    }

    #[test]
    fn test_crossed_quotes_error() {
        let msg = message(vec![BookLevel::new(ASK, 100, BID, 100)]);
        let result = BookValidator::new().validate_message(&msg);
        assert!(result.has_errors());
        assert!(result.errors()[0].contains("Crossed"));
    }

    #[test]
    fn test_locked_quotes_warning() {
        let msg = message(vec![BookLevel::new(BID, 100, BID, 100)]);
        let result = BookValidator::new().validate_message(&msg);
        assert!(!result.has_errors());
        assert!(result.has_warnings());
    }

    #[test]
    fn test_price_ordering_warning() {
        let msg = message(vec![
            BookLevel::new(BID, 100, ASK, 100),
            BookLevel::new(BID + TICK, 200, ASK - TICK, 200),
        ]);
        let result = BookValidator::new().validate_message(&msg);
        assert_eq!(result.warnings().len(), 2);
    }

    #[test]
    fn test_empty_levels_ignored_for_ordering() {
        let msg = message(vec![BookLevel::new(BID, 100, ASK, 100), BookLevel::default()]);
        let result = BookValidator::new().validate_message(&msg);
        assert!(result.is_valid());
    }

    #[test]
    fn test_timestamps_monotonic() {
        let result = validate_timestamps(&[1, 2, 2, 5], 60.0);
        assert!(result.is_valid());
        assert_eq!(first_out_of_order(&[1, 2, 2, 5]), None);
    }

    #[test]
    fn test_timestamps_decrease() {
        let result = validate_timestamps(&[1, 3, 2], 60.0);
        assert!(result.has_errors());
        assert_eq!(first_out_of_order(&[1, 3, 2]), Some(2));
    }

    #[test]
    fn test_timestamps_gap_warning() {
        let result = validate_timestamps(&[0, 120_000_000_000], 60.0);
        assert!(!result.has_errors());
        assert!(result.has_warnings());
    }
}
