//! Core Data
//!
//! - `record`: player ids, records, wealth metric and ranked entries
//! - `repository`: the canonical collection

pub mod record;
pub mod repository;

pub use record::{Entry, PlayerId, PlayerRecord, Wealth};
pub use repository::{dedupe_players, EntryRepository};
