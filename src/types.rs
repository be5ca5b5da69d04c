//! Core book types.
//!
//! Prices are fixed-point `i64` with 9 implied decimals ($100.00 =
//! `100_000_000_000`), sizes are `u32` shares, timestamps are nanoseconds
//! since the Unix epoch.
//!
//! A price of [`EMPTY_PRICE`] marks an unpopulated side of a level.

use serde::{Deserialize, Serialize};

/// Maximum number of book levels carried per message.
pub const MAX_LEVELS: usize = 10;

/// Fixed-point scale for prices.
pub const PRICE_SCALE: f64 = 1e9;

/// Sentinel for an unpopulated price.
pub const EMPTY_PRICE: i64 = 0;

/// Convert a decimal price to fixed-point.
#[inline]
pub fn price_to_fixed(price: f64) -> i64 {
    (price * PRICE_SCALE).round() as i64
}

/// Convert a fixed-point price to decimal.
#[inline]
pub fn fixed_to_price(price: i64) -> f64 {
    price as f64 / PRICE_SCALE
}

/// Book event that produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventKind {
    Add,
    Cancel,
    Modify,
    Trade,
    Fill,
    Clear,
    #[default]
    None,
}

impl EventKind {
    /// Parse a single-letter action code (`A`, `C`, `M`, `T`, `F`, `R`, `N`).
    ///
    /// Unknown codes map to `None`.
    pub fn from_action(code: &str) -> Self {
        match code.trim() {
            "A" | "a" => EventKind::Add,
            "C" | "c" => EventKind::Cancel,
            "M" | "m" => EventKind::Modify,
            "T" | "t" => EventKind::Trade,
            "F" | "f" => EventKind::Fill,
            "R" | "r" => EventKind::Clear,
            _ => EventKind::None,
        }
    }

    /// Single-letter action code.
    pub fn as_code(&self) -> char {
        match self {
            EventKind::Add => 'A',
            EventKind::Cancel => 'C',
            EventKind::Modify => 'M',
            EventKind::Trade => 'T',
            EventKind::Fill => 'F',
            EventKind::Clear => 'R',
            EventKind::None => 'N',
        }
    }

    /// Whether the event is an execution.
    pub fn is_execution(&self) -> bool {
        matches!(self, EventKind::Trade | EventKind::Fill)
    }
}

/// One price level of the book (both sides).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookLevel {
    pub bid_price: i64,
    pub bid_size: u32,
    pub ask_price: i64,
    pub ask_size: u32,
}

impl BookLevel {
    pub fn new(bid_price: i64, bid_size: u32, ask_price: i64, ask_size: u32) -> Self {
        Self {
            bid_price,
            bid_size,
            ask_price,
            ask_size,
        }
    }

    #[inline]
    pub fn has_bid(&self) -> bool {
        self.bid_price != EMPTY_PRICE
    }

    #[inline]
    pub fn has_ask(&self) -> bool {
        self.ask_price != EMPTY_PRICE
    }

    /// Resting depth at this level: bid size + ask size.
    #[inline]
    pub fn depth(&self) -> f64 {
        self.bid_size as f64 + self.ask_size as f64
    }
}

/// One limit-order-book update.
///
/// `levels[0]` is the inside quote. Messages may carry fewer than
/// [`MAX_LEVELS`] levels; absent levels behave as unpopulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookMessage {
    /// Event timestamp (ns since epoch).
    pub ts_event: u64,
    pub symbol: String,
    pub event: EventKind,
    pub levels: Vec<BookLevel>,
}

impl BookMessage {
    pub fn new(
        ts_event: u64,
        symbol: impl Into<String>,
        event: EventKind,
        levels: Vec<BookLevel>,
    ) -> Self {
        Self {
            ts_event,
            symbol: symbol.into(),
            event,
            levels,
        }
    }

    /// Level `i`, or an empty level if the message does not carry it.
    #[inline]
    pub fn level(&self, i: usize) -> BookLevel {
        self.levels.get(i).copied().unwrap_or_default()
    }

    /// Number of levels with at least one populated side.
    pub fn populated_levels(&self) -> usize {
        self.levels
            .iter()
            .filter(|l| l.has_bid() || l.has_ask())
            .count()
    }

    pub fn best_bid(&self) -> Option<i64> {
        self.levels.first().filter(|l| l.has_bid()).map(|l| l.bid_price)
    }

    pub fn best_ask(&self) -> Option<i64> {
        self.levels.first().filter(|l| l.has_ask()).map(|l| l.ask_price)
    }

    /// Mid price in decimal units, if both sides of the inside quote exist.
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => Some((fixed_to_price(b) + fixed_to_price(a)) / 2.0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_round_trip() {
        assert_eq!(price_to_fixed(100.01), 100_010_000_000);
        assert!((fixed_to_price(100_010_000_000) - 100.01).abs() < 1e-12);
    }

    #[test]
    fn test_missing_level_is_empty() {
        let msg = BookMessage::new(
            1,
            "AAPL",
            EventKind::Add,
            vec![BookLevel::new(100_000_000_000, 10, 100_010_000_000, 20)],
        );
        assert_eq!(msg.level(0).depth(), 30.0);
        assert_eq!(msg.level(5), BookLevel::default());
        assert!(!msg.level(5).has_bid());
        assert_eq!(msg.populated_levels(), 1);
    }

    #[test]
    fn test_event_codes() {
        assert_eq!(EventKind::from_action("T"), EventKind::Trade);
        assert_eq!(EventKind::from_action("?"), EventKind::None);
        assert_eq!(EventKind::Clear.as_code(), 'R');
        assert!(EventKind::Fill.is_execution());
    }

    #[test]
    fn test_mid_price() {
        let msg = BookMessage::new(
            1,
            "AAPL",
            EventKind::None,
            vec![BookLevel::new(100_000_000_000, 1, 100_020_000_000, 1)],
        );
        assert!((msg.mid_price().unwrap() - 100.01).abs() < 1e-9);
    }
}
