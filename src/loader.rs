//! CSV loader for book messages.
//!
//! # Format
//!
//! One message per row with a header. Required columns:
//!
//! - `ts_event`: integer nanoseconds since epoch, or an RFC 3339 timestamp
//! - `symbol`
//!
//! Optional columns:
//!
//! - `action`: single-letter event code (`A`, `C`, `M`, `T`, `F`, `R`, `N`)
//! - `bid_px_NN`, `bid_sz_NN`, `ask_px_NN`, `ask_sz_NN` for `NN` in `00..`
//!
//! Prices are decimal and stored fixed-point. An empty price cell marks an
//! unpopulated side; an empty size cell reads as zero.
//!
//! Messages come back stably sorted by `ts_event`.

use crate::error::{OfiError, Result};
use crate::types::{price_to_fixed, BookLevel, BookMessage, EventKind, MAX_LEVELS};
use chrono::DateTime;
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column positions for one book level.
#[derive(Debug, Clone, Copy, Default)]
struct LevelColumns {
    bid_px: Option<usize>,
    bid_sz: Option<usize>,
    ask_px: Option<usize>,
    ask_sz: Option<usize>,
}

/// Header-resolved column positions.
#[derive(Debug, Clone)]
struct Schema {
    ts_event: Option<usize>,
    symbol: Option<usize>,
    action: Option<usize>,
    levels: Vec<LevelColumns>,
}

impl Schema {
    fn from_headers(headers: &StringRecord, levels: usize) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let levels = (0..levels)
            .map(|m| LevelColumns {
                bid_px: find(&format!("bid_px_{m:02}")),
                bid_sz: find(&format!("bid_sz_{m:02}")),
                ask_px: find(&format!("ask_px_{m:02}")),
                ask_sz: find(&format!("ask_sz_{m:02}")),
            })
            .collect();

        Self {
            ts_event: find("ts_event"),
            symbol: find("symbol"),
            action: find("action"),
            levels,
        }
    }
}

/// Load book messages from a CSV file.
pub fn load_messages<P: AsRef<Path>>(path: P, levels: usize) -> Result<Vec<BookMessage>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let messages = read_messages(file, levels)?;
    log::info!("loaded {} messages from {}", messages.len(), path.display());
    Ok(messages)
}

/// Read book messages from any CSV source.
///
/// `levels` is clamped to `1..=MAX_LEVELS`; level columns beyond it are
/// ignored.
pub fn read_messages<R: Read>(reader: R, levels: usize) -> Result<Vec<BookMessage>> {
    let levels = levels.clamp(1, MAX_LEVELS);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let schema = Schema::from_headers(rdr.headers()?, levels);

    let mut messages = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        messages.push(parse_record(&record, &schema, i + 1)?);
    }

    messages.sort_by_key(|m| m.ts_event);
    Ok(messages)
}

fn cell<'a>(record: &'a StringRecord, col: Option<usize>) -> Option<&'a str> {
    col.and_then(|c| record.get(c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_record(record: &StringRecord, schema: &Schema, row: usize) -> Result<BookMessage> {
    let ts_event = cell(record, schema.ts_event)
        .and_then(parse_timestamp)
        .ok_or_else(|| OfiError::malformed(row, "ts_event"))?;

    let symbol = cell(record, schema.symbol).ok_or_else(|| OfiError::malformed(row, "symbol"))?;

    let event = cell(record, schema.action)
        .map(EventKind::from_action)
        .unwrap_or_default();

    let mut levels = Vec::with_capacity(schema.levels.len());
    for (m, cols) in schema.levels.iter().enumerate() {
        let bid_price = parse_price(record, cols.bid_px, row, &format!("bid_px_{m:02}"))?;
        let bid_size = parse_size(record, cols.bid_sz, row, &format!("bid_sz_{m:02}"))?;
        let ask_price = parse_price(record, cols.ask_px, row, &format!("ask_px_{m:02}"))?;
        let ask_size = parse_size(record, cols.ask_sz, row, &format!("ask_sz_{m:02}"))?;
        levels.push(BookLevel::new(bid_price, bid_size, ask_price, ask_size));
    }

    // Trailing unpopulated levels carry no information.
    while levels.last().is_some_and(|l| !l.has_bid() && !l.has_ask()) {
        levels.pop();
    }

    Ok(BookMessage::new(ts_event, symbol, event, levels))
}

/// Parse integer nanoseconds or an RFC 3339 timestamp.
pub fn parse_timestamp(raw: &str) -> Option<u64> {
    if let Ok(ns) = raw.parse::<u64>() {
        return Some(ns);
    }
    let dt = DateTime::parse_from_rfc3339(raw).ok()?;
    dt.timestamp_nanos_opt().and_then(|ns| u64::try_from(ns).ok())
}

fn parse_price(record: &StringRecord, col: Option<usize>, row: usize, field: &str) -> Result<i64> {
    match cell(record, col) {
        None => Ok(0),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .map(price_to_fixed)
            .ok_or_else(|| OfiError::malformed(row, field)),
    }
}

fn parse_size(record: &StringRecord, col: Option<usize>, row: usize, field: &str) -> Result<u32> {
    match cell(record, col) {
        None => Ok(0),
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .or_else(|| {
                // Sizes exported as floats ("100.0")
                raw.parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite() && *s >= 0.0 && s.fract() == 0.0 && *s <= u32::MAX as f64)
                    .map(|s| s as u32)
            })
            .ok_or_else(|| OfiError::malformed(row, field)),
    }
}
