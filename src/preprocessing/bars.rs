//! Fixed-duration time bars.
//!
//! Message-level OFI is bucketed into bars on an epoch-aligned grid:
//!
//! ```text
//! bar_start = ts - ts % duration        interval = [bar_start, bar_start + duration)
//! ```
//!
//! Intervals are half-open, so a message stamped exactly on a boundary
//! belongs to the bar it opens. Every bucket between the first and last
//! message is emitted, including buckets without messages, so that all
//! symbols share a regular grid for alignment.
//!
//! # Example
//!
//! ```ignore
//! use ofi_features::preprocessing::bars::{BarAggregator, parse_frequency};
//!
//! let aggregator = BarAggregator::new(parse_frequency("1min")?, 10)?;
//! let bars = aggregator.aggregate(&messages, &flows)?;
//! ```

use super::normalization::{normalize_levels, DepthNormalizer, DepthScope};
use crate::config::BarConfig;
use crate::error::{OfiError, Result};
use crate::features::order_flow::LevelFlow;
use crate::types::{BookMessage, MAX_LEVELS};
use serde::{Deserialize, Serialize};

/// Nanoseconds per second.
pub const NS_PER_SEC: u64 = 1_000_000_000;

/// Nanoseconds per minute (default bar width).
pub const NS_PER_MIN: u64 = 60 * NS_PER_SEC;

/// One time bar for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,

    /// Inclusive bar start (ns)
    pub start_ns: u64,

    /// Exclusive bar end (ns)
    pub end_ns: u64,

    /// Messages falling in `[start_ns, end_ns)`
    pub message_count: usize,

    /// Trade/fill messages in the bar
    pub trade_count: usize,

    /// Summed OFI per level (before normalization)
    pub ofi: Vec<f64>,

    /// Average resting depth (bid + ask size) per level
    pub avg_depth: Vec<f64>,

    /// Depth-normalized OFI per level
    pub normalized_ofi: Vec<f64>,

    /// Integrated OFI, filled in by the reducer
    pub integrated_ofi: f64,
}

impl Bar {
    /// Bar with no messages: every feature is zero.
    pub fn empty(symbol: impl Into<String>, start_ns: u64, end_ns: u64, levels: usize) -> Self {
        Self {
            symbol: symbol.into(),
            start_ns,
            end_ns,
            message_count: 0,
            trade_count: 0,
            ofi: vec![0.0; levels],
            avg_depth: vec![0.0; levels],
            normalized_ofi: vec![0.0; levels],
            integrated_ofi: 0.0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.message_count == 0
    }

    #[inline]
    pub fn levels(&self) -> usize {
        self.ofi.len()
    }
}

/// Accumulates one bar while messages stream in.
struct BarAccumulator {
    start_ns: u64,
    message_count: usize,
    trade_count: usize,
    ofi: Vec<f64>,
    depth: Vec<DepthNormalizer>,
}

impl BarAccumulator {
    fn new(start_ns: u64, levels: usize) -> Self {
        Self {
            start_ns,
            message_count: 0,
            trade_count: 0,
            ofi: vec![0.0; levels],
            depth: vec![DepthNormalizer::new(); levels],
        }
    }

    fn push(&mut self, msg: &BookMessage, flow: &LevelFlow) {
        self.message_count += 1;
        if msg.event.is_execution() {
            self.trade_count += 1;
        }
        for (m, (sum, depth)) in self.ofi.iter_mut().zip(self.depth.iter_mut()).enumerate() {
            *sum += flow.ofi[m];
            depth.update(msg.level(m).depth());
        }
    }

    fn finish(self, symbol: &str, duration_ns: u64, normalize: bool, scope: DepthScope) -> Bar {
        let avg_depth: Vec<f64> = self.depth.iter().map(|d| d.mean_depth()).collect();
        let normalized_ofi = if normalize {
            normalize_levels(&self.ofi, &avg_depth, scope)
        } else {
            self.ofi.clone()
        };

        Bar {
            symbol: symbol.to_string(),
            start_ns: self.start_ns,
            end_ns: self.start_ns.saturating_add(duration_ns),
            message_count: self.message_count,
            trade_count: self.trade_count,
            ofi: self.ofi,
            avg_depth,
            normalized_ofi,
            integrated_ofi: 0.0,
        }
    }
}

/// Buckets per-message OFI into fixed-duration bars.
#[derive(Debug, Clone)]
pub struct BarAggregator {
    duration_ns: u64,
    levels: usize,
    normalize: bool,
    depth_scope: DepthScope,
}

impl BarAggregator {
    /// Create an aggregator with `duration_ns` wide bars over `levels` levels.
    pub fn new(duration_ns: u64, levels: usize) -> Result<Self> {
        if duration_ns == 0 {
            return Err(OfiError::Config("bar duration must be > 0".to_string()));
        }
        if levels == 0 || levels > MAX_LEVELS {
            return Err(OfiError::Config(format!(
                "levels must be in 1..={MAX_LEVELS}, got {levels}"
            )));
        }
        Ok(Self {
            duration_ns,
            levels,
            normalize: true,
            depth_scope: DepthScope::PerLevel,
        })
    }

    pub fn from_config(config: &BarConfig, levels: usize) -> Result<Self> {
        Ok(Self::new(config.duration_ns, levels)?
            .with_normalize(config.normalize)
            .with_depth_scope(config.depth_scope))
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_depth_scope(mut self, scope: DepthScope) -> Self {
        self.depth_scope = scope;
        self
    }

    #[inline]
    pub fn duration_ns(&self) -> u64 {
        self.duration_ns
    }

    #[inline]
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Start of the bar containing `ts`.
    #[inline]
    pub fn bucket_start(&self, ts: u64) -> u64 {
        ts - ts % self.duration_ns
    }

    /// Aggregate one symbol's messages and their flows into bars.
    ///
    /// `flows[i]` must be the flow of `messages[i]`. Returns an empty vector
    /// for empty input.
    pub fn aggregate(&self, messages: &[BookMessage], flows: &[LevelFlow]) -> Result<Vec<Bar>> {
        if messages.len() != flows.len() {
            return Err(OfiError::ShapeMismatch(format!(
                "{} messages but {} flows",
                messages.len(),
                flows.len()
            )));
        }
        if let Some(flow) = flows.iter().find(|f| f.levels() != self.levels) {
            return Err(OfiError::ShapeMismatch(format!(
                "flow has {} levels, aggregator expects {}",
                flow.levels(),
                self.levels
            )));
        }

        let Some(first) = messages.first() else {
            return Ok(Vec::new());
        };
        let symbol = first.symbol.as_str();

        let mut bars = Vec::new();
        let mut current = BarAccumulator::new(self.bucket_start(first.ts_event), self.levels);
        let mut prev_ts = first.ts_event;

        for (i, (msg, flow)) in messages.iter().zip(flows.iter()).enumerate() {
            if msg.symbol != symbol {
                return Err(OfiError::MixedSymbols {
                    expected: symbol.to_string(),
                    found: msg.symbol.clone(),
                });
            }
            if msg.ts_event < prev_ts {
                return Err(OfiError::OutOfOrder {
                    symbol: symbol.to_string(),
                    index: i,
                    prev: prev_ts,
                    curr: msg.ts_event,
                });
            }
            prev_ts = msg.ts_event;

            let start = self.bucket_start(msg.ts_event);
            while current.start_ns < start {
                let next = BarAccumulator::new(current.start_ns + self.duration_ns, self.levels);
                let done = std::mem::replace(&mut current, next);
                bars.push(done.finish(symbol, self.duration_ns, self.normalize, self.depth_scope));
            }
            current.push(msg, flow);
        }
        bars.push(current.finish(symbol, self.duration_ns, self.normalize, self.depth_scope));

        log::debug!(
            "{}: {} messages -> {} bars ({} empty)",
            symbol,
            messages.len(),
            bars.len(),
            bars.iter().filter(|b| b.is_empty()).count()
        );

        Ok(bars)
    }
}

/// Parse a bar frequency such as `"1min"`, `"5s"`, `"250ms"` into nanoseconds.
///
/// Accepted units: `ns`, `us`, `ms`, `s`, `min`, `h`, `d` and the pandas
/// aliases `N`, `U`, `L`, `S`, `T`, `H`, `D`. A missing count means 1.
pub fn parse_frequency(freq: &str) -> Result<u64> {
    let freq = freq.trim();
    let split = freq
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(freq.len());
    let (count, unit) = freq.split_at(split);

    let count: u64 = if count.is_empty() {
        1
    } else {
        count
            .parse()
            .map_err(|_| OfiError::Config(format!("invalid frequency count in {freq:?}")))?
    };

    let unit_ns: u64 = match unit.trim() {
        "ns" | "N" => 1,
        "us" | "U" => 1_000,
        "ms" | "L" => 1_000_000,
        "s" | "S" | "sec" => NS_PER_SEC,
        "min" | "T" | "m" => NS_PER_MIN,
        "h" | "H" => 60 * NS_PER_MIN,
        "d" | "D" => 24 * 60 * NS_PER_MIN,
        other => {
            return Err(OfiError::Config(format!(
                "unknown frequency unit {other:?} in {freq:?}"
            )))
        }
    };

    let ns = count
        .checked_mul(unit_ns)
        .ok_or_else(|| OfiError::Config(format!("frequency {freq:?} overflows")))?;
    if ns == 0 {
        return Err(OfiError::Config("bar duration must be > 0".to_string()));
    }
    Ok(ns)
}

/// Format a duration with the largest unit that divides it exactly.
pub fn format_frequency(duration_ns: u64) -> String {
    const UNITS: [(u64, &str); 6] = [
        (24 * 60 * NS_PER_MIN, "d"),
        (60 * NS_PER_MIN, "h"),
        (NS_PER_MIN, "min"),
        (NS_PER_SEC, "s"),
        (1_000_000, "ms"),
        (1_000, "us"),
    ];
    for (unit_ns, name) in UNITS {
        if duration_ns >= unit_ns && duration_ns % unit_ns == 0 {
            return format!("{}{}", duration_ns / unit_ns, name);
        }
    }
    format!("{duration_ns}ns")
}
