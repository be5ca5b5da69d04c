//! Message-level feature extraction.
//!
//! - [`order_flow`]: per-level order flow and order flow imbalance

pub mod order_flow;

pub use order_flow::{extract_level_flows, side_flow, LevelFlow, MultiLevelOfiExtractor};
