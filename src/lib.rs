//! Analytics core of a day-trading journal: filters a trader's realized
//! trades, aggregates them into gross/net totals, per-day totals and
//! dimensional groupings, recommends a fixed R-multiple exit from MFE
//! history, and sizes the risk of open bracket-order positions.

pub mod analytics;
pub mod config;
pub mod error;
pub mod filter;
pub mod report;
pub mod source;
pub mod store;
pub mod types;

pub use error::{JournalError, Result};
