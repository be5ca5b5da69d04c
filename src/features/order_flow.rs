//! Per-message multi-level order flow (OF) and order flow imbalance (OFI).
//!
//! Implements the level-wise order flow of Cont, Cucuringu & Zhang,
//! "Cross-impact of order flow imbalance in equity markets" (Eq. 1).
//!
//! # Formula
//!
//! For side `s` at level `m` between consecutive messages `n-1` and `n`:
//!
//! ```text
//!            ⎧  q_n              if P_n > P_{n-1}
//! OF^s_n,m = ⎨  q_n - q_{n-1}    if P_n = P_{n-1}
//!            ⎩ -q_n              if P_n < P_{n-1}
//!
//! OFI_n,m = OF^bid_n,m - OF^ask_n,m
//! ```
//!
//! The same price-direction rule is applied to both sides. A price change
//! takes precedence over a size change in the same message.
//!
//! # Edge Cases
//!
//! - The first message of a symbol has no predecessor: all flows are zero.
//! - A side contributes only when it is populated in both the previous and
//!   the current message. Missing levels are zero-flow.
//!
//! # Example
//!
//! ```ignore
//! use ofi_features::features::order_flow::MultiLevelOfiExtractor;
//!
//! let mut extractor = MultiLevelOfiExtractor::new(10);
//! for msg in &messages {
//!     let flow = extractor.update(msg);
//!     println!("OFI level 0: {}", flow.ofi[0]);
//! }
//! ```

use crate::error::{OfiError, Result};
use crate::types::{BookLevel, BookMessage, MAX_LEVELS};
use std::cmp::Ordering;

/// Signed order-flow contribution of one side of one level.
///
/// Price increase: new liquidity (`+curr_size`). Same price: size delta.
/// Price decrease: liquidity withdrawn (`-curr_size`).
#[inline]
pub fn side_flow(prev_price: i64, prev_size: u32, curr_price: i64, curr_size: u32) -> f64 {
    match curr_price.cmp(&prev_price) {
        Ordering::Greater => curr_size as f64,
        Ordering::Equal => curr_size as f64 - prev_size as f64,
        Ordering::Less => -(curr_size as f64),
    }
}

/// Order flow of one message, per level.
///
/// Transient: produced by the extractor and consumed by bar aggregation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LevelFlow {
    /// Bid-side OF per level
    pub of_bid: Vec<f64>,

    /// Ask-side OF per level
    pub of_ask: Vec<f64>,

    /// OFI per level (`of_bid - of_ask`)
    pub ofi: Vec<f64>,
}

impl LevelFlow {
    /// All-zero flow over `levels` levels.
    pub fn zeros(levels: usize) -> Self {
        Self {
            of_bid: vec![0.0; levels],
            of_ask: vec![0.0; levels],
            ofi: vec![0.0; levels],
        }
    }

    #[inline]
    pub fn levels(&self) -> usize {
        self.ofi.len()
    }

    pub fn is_zero(&self) -> bool {
        self.ofi.iter().all(|&v| v == 0.0)
            && self.of_bid.iter().all(|&v| v == 0.0)
            && self.of_ask.iter().all(|&v| v == 0.0)
    }
}

/// Multi-level OF/OFI extractor.
///
/// Keeps a one-message lookback; memory is O(levels).
#[derive(Debug, Clone)]
pub struct MultiLevelOfiExtractor {
    /// Number of levels to track
    levels: usize,

    /// Previous snapshot of the tracked levels
    prev: Option<Vec<BookLevel>>,

    /// Number of messages processed
    update_count: u64,
}

impl MultiLevelOfiExtractor {
    /// Create an extractor over `levels` levels (clamped to 1..=10).
    pub fn new(levels: usize) -> Self {
        let levels = levels.clamp(1, MAX_LEVELS);
        Self {
            levels,
            prev: None,
            update_count: 0,
        }
    }

    /// Process one message and return its per-level flow.
    #[inline]
    pub fn update(&mut self, msg: &BookMessage) -> LevelFlow {
        let curr: Vec<BookLevel> = (0..self.levels).map(|i| msg.level(i)).collect();
        self.update_count += 1;

        let mut flow = LevelFlow::zeros(self.levels);
        if let Some(prev) = &self.prev {
            for (i, (p, c)) in prev.iter().zip(curr.iter()).enumerate() {
                if p.has_bid() && c.has_bid() {
                    flow.of_bid[i] = side_flow(p.bid_price, p.bid_size, c.bid_price, c.bid_size);
                }
                if p.has_ask() && c.has_ask() {
                    flow.of_ask[i] = side_flow(p.ask_price, p.ask_size, c.ask_price, c.ask_size);
                }
                flow.ofi[i] = flow.of_bid[i] - flow.of_ask[i];
            }
        }

        self.prev = Some(curr);
        flow
    }

    #[inline]
    pub fn levels(&self) -> usize {
        self.levels
    }

    #[inline]
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Forget the previous snapshot (next message is a cold start).
    pub fn reset(&mut self) {
        self.prev = None;
        self.update_count = 0;
    }
}

impl Default for MultiLevelOfiExtractor {
    fn default() -> Self {
        Self::new(MAX_LEVELS)
    }
}

/// Extract per-message flows for one symbol's ordered messages.
///
/// Output is aligned 1:1 with `messages`.
///
/// # Errors
///
/// - [`OfiError::MixedSymbols`] if more than one symbol is present
/// - [`OfiError::OutOfOrder`] if a timestamp decreases
pub fn extract_level_flows(messages: &[BookMessage], levels: usize) -> Result<Vec<LevelFlow>> {
    let mut extractor = MultiLevelOfiExtractor::new(levels);
    let mut flows = Vec::with_capacity(messages.len());

    for (i, msg) in messages.iter().enumerate() {
        if i > 0 {
            let prev = &messages[i - 1];
            if msg.symbol != prev.symbol {
                return Err(OfiError::MixedSymbols {
                    expected: prev.symbol.clone(),
                    found: msg.symbol.clone(),
                });
            }
            if msg.ts_event < prev.ts_event {
                return Err(OfiError::OutOfOrder {
                    symbol: msg.symbol.clone(),
                    index: i,
                    prev: prev.ts_event,
                    curr: msg.ts_event,
                });
            }
        }
        flows.push(extractor.update(msg));
    }

    Ok(flows)
}
