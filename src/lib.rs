//! # Leaderboard Live
//!
//! Client-side ranking state for a live leaderboard: snapshot ingestion,
//! search, per-country grouping and manual reorder reconciliation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LEADERBOARD LIVE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Ranking data                              │
//! │  ├── record.rs   - Player records, wealth, entries           │
//! │  └── repository.rs - Canonical collection                    │
//! │                                                              │
//! │  engine/         - Pure view logic                           │
//! │  ├── filter.rs   - Search predicate and suggestions          │
//! │  ├── group.rs    - Country partitions, wealth sorted         │
//! │  ├── rank.rs     - Rank lookup and reorder reconciliation    │
//! │  ├── view.rs     - Rows for the rendering layer              │
//! │  └── controller.rs - Single owner of ranking state           │
//! │                                                              │
//! │  feed/           - Backend I/O                               │
//! │  ├── protocol.rs - Wire payloads and normalization           │
//! │  ├── http.rs     - Snapshot and lookup fetches               │
//! │  ├── push.rs     - Push channel subscription                 │
//! │  └── adapter.rs  - Feed → controller events                  │
//! │                                                              │
//! │  service.rs      - Event loop and view publication           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering Guarantee
//!
//! All state lives in one [`LeaderboardController`] driven by one task.
//! Snapshots, lookups and user commands are applied one at a time in the
//! order they are posted, so a push snapshot always supersedes a manual
//! reorder applied before it, and ranks are always derived from the view
//! that is actually displayed.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod engine;
pub mod feed;
pub mod service;

// Re-export commonly used types
pub use config::FeedConfig;
pub use crate::core::record::{Entry, PlayerId, PlayerRecord, Wealth};
pub use crate::core::repository::EntryRepository;
pub use engine::controller::{LeaderboardController, ReorderRequest};
pub use engine::group::ViewMode;
pub use engine::view::RenderedView;
pub use feed::{HttpSnapshotSource, WebSocketPushChannel};
pub use service::{Command, LeaderboardService, ServiceHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
