//! Leaderboard Feed
//!
//! Everything that talks to the backend. Payloads are normalized here and
//! failures are contained here.
//!
//! ## Module Structure
//!
//! - `protocol`: wire payloads, push framing and normalization
//! - `source`: collaborator traits and feed error kinds
//! - `http`: snapshot and lookup fetches over HTTP
//! - `push`: WebSocket and in-process push channels
//! - `adapter`: turns fetches and deliveries into controller events

pub mod adapter;
pub mod http;
pub mod protocol;
pub mod push;
pub mod source;

// Re-export key types
pub use adapter::{FeedAdapter, FeedEvent};
pub use http::HttpSnapshotSource;
pub use protocol::{DecodeError, LeaderboardPayload, LookupPayload, WireEntry};
pub use push::{QueuePushChannel, WebSocketPushChannel};
pub use source::{FeedError, PushChannel, PushDelivery, SnapshotSource, Subscription, TransportError};
