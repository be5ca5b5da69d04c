//! Shared builders for integration tests.

#![allow(dead_code)]

use ofi_features::{BookLevel, BookMessage, EventKind};

/// $100.00 in fixed-point.
pub const BASE_PRICE: i64 = 100_000_000_000;

/// $0.01 in fixed-point.
pub const TICK: i64 = 10_000_000;

pub const SEC: u64 = 1_000_000_000;
pub const MIN: u64 = 60 * SEC;

/// Single-level message with the given inside sizes.
pub fn top(ts: u64, symbol: &str, bid_size: u32, ask_size: u32) -> BookMessage {
    BookMessage::new(
        ts,
        symbol,
        EventKind::Add,
        vec![BookLevel::new(BASE_PRICE, bid_size, BASE_PRICE + TICK, ask_size)],
    )
}

/// Deterministic multi-level message stream with drifting prices.
pub fn synthetic(symbol: &str, count: usize, levels: usize, step_ns: u64) -> Vec<BookMessage> {
    (0..count)
        .map(|seq| {
            let offset = ((seq * 7 % 11) as i64 - 5) * TICK;
            let book = (0..levels)
                .map(|i| {
                    BookLevel::new(
                        BASE_PRICE + offset - i as i64 * TICK,
                        ((100 + seq * 13 + i * 37) % 400 + 10) as u32,
                        BASE_PRICE + offset + (i as i64 + 1) * TICK,
                        ((150 + seq * 17 + i * 29) % 300 + 10) as u32,
                    )
                })
                .collect();
            let event = if seq % 5 == 0 {
                EventKind::Trade
            } else {
                EventKind::Add
            };
            BookMessage::new(seq as u64 * step_ns, symbol, event, book)
        })
        .collect()
}
