//! Ranking Engine
//!
//! Pure transformations over the canonical collection plus the controller
//! that sequences them.
//!
//! ## Module Structure
//!
//! - `filter`: search predicate and autocomplete
//! - `group`: per-country partitions, wealth sorted
//! - `rank`: rank lookup and manual reorder reconciliation
//! - `view`: rows handed to the rendering layer
//! - `controller`: single owner of all mutable state

pub mod controller;
pub mod filter;
pub mod group;
pub mod rank;
pub mod view;

// Re-export key types
pub use controller::{LeaderboardController, Reaction, ReorderRequest, SnapshotOrigin};
pub use filter::{filter, suggest};
pub use group::{group, Partition, ViewMode};
pub use rank::{rank_of, reorder_flat, reorder_within_group, RankError, RankIndex, ReorderError};
pub use view::{DisplayRow, RenderedView, Section};
