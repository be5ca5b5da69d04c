//! End-to-end OFI pipeline.
//!
//! Connects the four stages and runs them per symbol, then joins the symbols:
//!
//! ```text
//! BookMessage ─┬─> MultiLevelOfiExtractor ─> BarAggregator ─> IntegratedOfiReducer ─> BarFrame ─┐
//!  (per symbol)│        (per message)          (Eq. 3)             (Eq. 4)                    │
//!              └─ ... one chain per symbol ...                                                 ├─> MultiAssetAligner ─> DesignMatrix
//!                                                                                              ┘
//! ```
//!
//! # Batch Semantics
//!
//! The whole input is a finite, static batch. Any stage error aborts the run;
//! no partial output is returned. Book anomalies found by validation are only
//! logged; out-of-order timestamps are fatal.
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
//! let messages = load_messages("book.csv", 10)?;
//! let output = pipeline.process(&messages)?;
//! println!("{} rows, {} gaps", output.design.n_rows(), output.design.missing_count());
//! ```

use crate::alignment::{BarFrame, DesignMatrix, MultiAssetAligner};
use crate::config::PipelineConfig;
use crate::error::{OfiError, Result};
use crate::features::order_flow::extract_level_flows;
use crate::loader::load_messages;
use crate::preprocessing::bars::{format_frequency, BarAggregator};
use crate::reduction::IntegratedOfiReducer;
use crate::types::BookMessage;
use crate::validation::{first_out_of_order, validate_timestamps, BookValidator};
use std::collections::BTreeMap;
use std::path::Path;

/// Output from pipeline processing.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// One frame per symbol, in processing order
    pub frames: Vec<BarFrame>,

    /// Outer-joined multi-asset features
    pub design: DesignMatrix,

    /// Messages consumed across all processed symbols
    pub messages_processed: usize,
}

impl PipelineOutput {
    /// Frame for `symbol`, if it was processed.
    pub fn frame(&self, symbol: &str) -> Option<&BarFrame> {
        self.frames.iter().find(|f| f.symbol == symbol)
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.symbol.as_str()).collect()
    }

    pub fn total_bars(&self) -> usize {
        self.frames.iter().map(|f| f.len()).sum()
    }
}

/// Batch OFI pipeline.
#[derive(Debug, Clone)]
pub struct OfiPipeline {
    config: PipelineConfig,
    aggregator: BarAggregator,
    reducer: IntegratedOfiReducer,
    aligner: MultiAssetAligner,
    validator: BookValidator,
}

impl OfiPipeline {
    /// Create pipeline from configuration.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate().map_err(OfiError::Config)?;

        let aggregator = BarAggregator::from_config(&config.bars, config.levels)?;
        let reducer = IntegratedOfiReducer::from_config(&config.reduction);
        let aligner = MultiAssetAligner::new().with_levels(config.alignment.include_levels);
        // Messages may carry more levels than `config.levels` uses.
        let validator = BookValidator::new();

        Ok(Self {
            config,
            aggregator,
            reducer,
            aligner,
            validator,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the per-symbol chain on one symbol's messages.
    ///
    /// Messages must belong to a single symbol and be sorted by timestamp.
    pub fn process_symbol(&self, messages: &[BookMessage]) -> Result<BarFrame> {
        let first = messages
            .first()
            .ok_or_else(|| OfiError::generic("no messages to process"))?;
        let symbol = first.symbol.clone();

        self.check(&symbol, messages)?;

        let flows = extract_level_flows(messages, self.config.levels)?;
        let mut bars = self.aggregator.aggregate(messages, &flows)?;
        let fit = self.reducer.reduce(&mut bars)?;

        log::info!(
            "{}: {} messages -> {} bars of {}, explained variance {:.1}%{}",
            symbol,
            messages.len(),
            bars.len(),
            format_frequency(self.aggregator.duration_ns()),
            fit.explained_variance_ratio * 100.0,
            if fit.degenerate { " (degenerate)" } else { "" }
        );

        Ok(BarFrame {
            symbol,
            levels: self.config.levels,
            bars,
            loadings: fit.loadings,
            explained_variance_ratio: fit.explained_variance_ratio,
            degenerate: fit.degenerate,
            messages_processed: messages.len(),
        })
    }

    /// Run every symbol and align the results.
    ///
    /// Messages of different symbols may be interleaved; each symbol's
    /// subsequence must be sorted. With no configured symbols every symbol in
    /// the input is processed in lexicographic order; otherwise the configured
    /// order is kept and a configured symbol absent from the input is an error.
    pub fn process(&self, messages: &[BookMessage]) -> Result<PipelineOutput> {
        let mut by_symbol: BTreeMap<&str, Vec<BookMessage>> = BTreeMap::new();
        for msg in messages {
            by_symbol
                .entry(msg.symbol.as_str())
                .or_default()
                .push(msg.clone());
        }

        let symbols: Vec<String> = if self.config.symbols.is_empty() {
            by_symbol.keys().map(|s| s.to_string()).collect()
        } else {
            self.config.symbols.clone()
        };

        let mut frames = Vec::with_capacity(symbols.len());
        let mut messages_processed = 0;
        for symbol in &symbols {
            let subset = by_symbol
                .get(symbol.as_str())
                .ok_or_else(|| OfiError::UnknownSymbol(symbol.clone()))?;
            let frame = self.process_symbol(subset)?;
            messages_processed += frame.messages_processed;
            frames.push(frame);
        }

        let design = self.aligner.align(&frames)?;

        Ok(PipelineOutput {
            frames,
            design,
            messages_processed,
        })
    }

    /// Load a CSV file and run [`OfiPipeline::process`] on it.
    pub fn process_file<P: AsRef<Path>>(&self, path: P) -> Result<PipelineOutput> {
        let messages = load_messages(path, self.config.levels)?;
        self.process(&messages)
    }

    fn check(&self, symbol: &str, messages: &[BookMessage]) -> Result<()> {
        let timestamps: Vec<u64> = messages.iter().map(|m| m.ts_event).collect();
        let result = validate_timestamps(&timestamps, self.config.validation.max_gap_secs);
        if result.has_errors() {
            let index = first_out_of_order(&timestamps).unwrap_or(0);
            return Err(OfiError::OutOfOrder {
                symbol: symbol.to_string(),
                index,
                prev: timestamps[index.saturating_sub(1)],
                curr: timestamps[index],
            });
        }
        for warning in result.warnings() {
            log::warn!("{symbol}: {warning}");
        }

        if self.config.validation.check_book {
            let flagged = self.book_check_failures(symbol, messages);
            if flagged > 0 {
                log::warn!("{symbol}: {flagged} of {} messages failed book checks", messages.len());
            }
        }

        Ok(())
    }

    /// Number of messages flagged by the book checks; the first is logged.
    fn book_check_failures(&self, symbol: &str, messages: &[BookMessage]) -> usize {
        let mut flagged = 0usize;
        for msg in messages {
            let result = self.validator.validate_message(msg);
            if result.has_errors() || result.has_warnings() {
                if flagged == 0 {
                    log::warn!("{symbol} at {}: {}", msg.ts_event, result);
                }
                flagged += 1;
            }
        }
        flagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BookLevel, EventKind, MAX_LEVELS};

    fn msg(ts: u64, symbol: &str, bid_size: u32) -> BookMessage {
        BookMessage::new(
            ts,
            symbol,
            EventKind::Add,
            vec![BookLevel::new(100_000_000_000, bid_size, 100_010_000_000, 10)],
        )
    }

    fn pipeline(symbols: &[&str]) -> OfiPipeline {
        let config = PipelineConfig::default()
            .with_levels(1)
            .with_symbols(symbols.iter().copied());
        OfiPipeline::from_config(config).unwrap()
    }

    #[test]
    fn test_book_checks_accept_unused_levels() {
        let levels: Vec<BookLevel> = (0..MAX_LEVELS as i64)
            .map(|i| {
                BookLevel::new(
                    100_000_000_000 - i * 10_000_000,
                    10,
                    100_010_000_000 + i * 10_000_000,
                    10,
                )
            })
            .collect();
        let messages: Vec<BookMessage> = (1..=3)
            .map(|ts| BookMessage::new(ts, "A", EventKind::Add, levels.clone()))
            .collect();

        let pipeline = OfiPipeline::from_config(PipelineConfig::default().with_levels(5)).unwrap();
        assert_eq!(pipeline.book_check_failures("A", &messages), 0);

        let frame = pipeline.process_symbol(&messages).unwrap();
        assert_eq!(frame.levels, 5);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig::default().with_levels(0);
        assert!(matches!(
            OfiPipeline::from_config(config),
            Err(OfiError::Config(_))
        ));
    }

    #[test]
    fn test_process_symbol_counts() {
        let messages = vec![msg(1, "A", 10), msg(2, "A", 15), msg(61_000_000_000, "A", 12)];
        let frame = pipeline(&[]).process_symbol(&messages).unwrap();
        assert_eq!(frame.symbol, "A");
        assert_eq!(frame.messages_processed, 3);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.bars[0].ofi, vec![5.0]);
        assert_eq!(frame.bars[1].ofi, vec![-3.0]);
    }

    #[test]
    fn test_process_symbol_empty() {
        assert!(pipeline(&[]).process_symbol(&[]).is_err());
    }

    #[test]
    fn test_out_of_order_rejected() {
        let messages = vec![msg(5, "A", 10), msg(3, "A", 11)];
        match pipeline(&[]).process_symbol(&messages) {
            Err(OfiError::OutOfOrder { index, prev, curr, .. }) => {
                assert_eq!((index, prev, curr), (1, 5, 3));
            }
            other => panic!("expected OutOfOrder, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_symbol() {
        let messages = vec![msg(1, "A", 10)];
        let err = pipeline(&["A", "B"]).process(&messages).unwrap_err();
        assert!(matches!(err, OfiError::UnknownSymbol(s) if s == "B"));
    }

    #[test]
    fn test_all_symbols_sorted_when_unconfigured() {
        let messages = vec![msg(1, "B", 10), msg(2, "A", 10), msg(3, "B", 11)];
        let output = pipeline(&[]).process(&messages).unwrap();
        assert_eq!(output.symbols(), vec!["A", "B"]);
        assert_eq!(output.messages_processed, 3);
        assert_eq!(output.frame("B").map(|f| f.messages_processed), Some(2));
    }

    #[test]
    fn test_configured_order_kept() {
        let messages = vec![msg(1, "A", 10), msg(2, "B", 10)];
        let output = pipeline(&["B", "A"]).process(&messages).unwrap();
        assert_eq!(output.symbols(), vec!["B", "A"]);
        assert_eq!(
            output.design.columns(),
            &["B.ofi_integrated".to_string(), "A.ofi_integrated".to_string()]
        );
    }

    #[test]
    fn test_unconfigured_symbols_ignored() {
        let messages = vec![msg(1, "A", 10), msg(2, "B", 10)];
        let output = pipeline(&["A"]).process(&messages).unwrap();
        assert_eq!(output.messages_processed, 1);
    }
}
