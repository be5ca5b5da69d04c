//! Error types for OFI feature construction.
//!
//! Every failure in the core is fatal to the batch: stages return
//! [`OfiError`] and the pipeline never emits partial output.
//!
//! Zero depth, zero variance and alignment gaps are *not* errors. They are
//! resolved by the zero-fallback policies of the aggregator and reducer and by
//! explicit missing cells in the design matrix.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, OfiError>;

/// Errors raised while loading, validating or transforming book messages.
#[derive(Debug, Error)]
pub enum OfiError {
    /// A row is missing a required field (timestamp, symbol) or the field
    /// could not be parsed. `row` is the 1-based data row number.
    #[error("malformed input at row {row}: missing or invalid field `{field}`")]
    MalformedInput { row: usize, field: String },

    /// Messages of one symbol are not sorted by timestamp.
    #[error("messages for {symbol} out of order at index {index}: {curr} < {prev}")]
    OutOfOrder {
        symbol: String,
        index: usize,
        prev: u64,
        curr: u64,
    },

    /// A per-symbol stage received messages from more than one symbol.
    #[error("expected messages for a single symbol, found {expected} and {found}")]
    MixedSymbols { expected: String, found: String },

    /// A requested symbol has no messages in the input.
    #[error("symbol {0:?} not found in input")]
    UnknownSymbol(String),

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Two inputs that must line up do not.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("NumPy write error: {0}")]
    Npy(#[from] ndarray_npy::WriteNpyError),

    #[error("{0}")]
    Generic(String),
}

impl OfiError {
    /// Build a free-form error.
    pub fn generic(msg: impl Into<String>) -> Self {
        OfiError::Generic(msg.into())
    }

    /// Build a [`OfiError::MalformedInput`].
    pub fn malformed(row: usize, field: impl Into<String>) -> Self {
        OfiError::MalformedInput {
            row,
            field: field.into(),
        }
    }
}

impl From<String> for OfiError {
    fn from(msg: String) -> Self {
        OfiError::Generic(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = OfiError::malformed(3, "symbol");
        assert_eq!(
            err.to_string(),
            "malformed input at row 3: missing or invalid field `symbol`"
        );
    }

    #[test]
    fn test_io_conversion() {
        fn open() -> Result<()> {
            std::fs::File::open("/definitely/not/here.csv")?;
            Ok(())
        }
        assert!(matches!(open(), Err(OfiError::Io(_))));
    }
}
