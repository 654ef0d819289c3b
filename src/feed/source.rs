//! Feed Seams
//!
//! The external collaborators the adapter talks to, expressed as traits so
//! transports can be swapped (or wrapped with retries) without touching the
//! engine, and the failure kinds they report.

use std::future::Future;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::core::record::{Entry, PlayerId};
use crate::feed::protocol::DecodeError;

/// Transport-level failure detail.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Remote side closed the push channel.
    #[error("channel closed by remote")]
    Closed,

    /// Payload did not pass normalization.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Configured URL is unusable.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Feed failures, by where they happened.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Snapshot fetch or point lookup failed.
    #[error("fetch failure: {0}")]
    Fetch(#[source] TransportError),

    /// Push subscription failed or disconnected.
    #[error("channel failure: {0}")]
    Channel(#[source] TransportError),
}

impl FeedError {
    /// Wrap a fetch-side failure.
    pub fn fetch(err: impl Into<TransportError>) -> Self {
        FeedError::Fetch(err.into())
    }

    /// Wrap a channel-side failure.
    pub fn channel(err: impl Into<TransportError>) -> Self {
        FeedError::Channel(err.into())
    }

    /// Whether this is a push-channel failure.
    pub fn is_channel(&self) -> bool {
        matches!(self, FeedError::Channel(_))
    }
}

/// Request/response side of the feed.
///
/// Implementations report every failure as [`FeedError::Fetch`]. Retries, if
/// wanted, belong in a wrapping implementation.
pub trait SnapshotSource: Send + Sync + 'static {
    /// Fetch the full top-N list.
    fn fetch_top(&self) -> impl Future<Output = Result<Vec<Entry>, FeedError>> + Send;

    /// Fetch the neighbourhood of the ranking around `id`.
    fn fetch_around(
        &self,
        id: PlayerId,
    ) -> impl Future<Output = Result<Vec<Entry>, FeedError>> + Send;
}

/// One push-channel delivery: a full snapshot or a channel failure.
pub type PushDelivery = Result<Vec<Entry>, FeedError>;

/// Push side of the feed.
pub trait PushChannel: Send + 'static {
    /// Start delivering into `deliveries` until the subscription is released.
    fn subscribe(self, deliveries: mpsc::Sender<PushDelivery>) -> Subscription;
}

/// Handle to a running push subscription.
#[derive(Debug)]
pub struct Subscription {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Wrap a delivery task that listens on `shutdown_tx`.
    pub fn new(shutdown_tx: broadcast::Sender<()>, task: JoinHandle<()>) -> Self {
        Self { shutdown_tx, task }
    }

    /// Stop the subscription and wait for the delivery task to end.
    ///
    /// Once this returns no further deliveries are sent.
    pub async fn unsubscribe(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                tracing::warn!(error = %e, "Push task ended abnormally");
            }
        }
    }
}
