//! Transaction-time and valid-time query processing.
//!
//! - `selector`: picks the version alive at a perspective time
//! - `history`: collects full version history across a valid-time range

pub mod history;
pub mod selector;

pub use history::HistoryQuery;
pub use selector::{Selected, is_alive_at};
