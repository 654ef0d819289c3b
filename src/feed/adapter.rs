//! Feed Adapter
//!
//! Bridges the snapshot source and push channel into the controller's event
//! queue. Fetch and channel failures stop here: they are logged and never
//! become events, so the engine only ever sees normalized entries.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::record::{Entry, PlayerId};
use crate::engine::controller::SnapshotOrigin;
use crate::feed::source::{PushChannel, PushDelivery, SnapshotSource, Subscription};

/// Capacity of the queue between a push channel and the forwarder.
pub const DELIVERY_QUEUE: usize = 16;

/// Feed-side events, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A full top-N list to install.
    Snapshot {
        /// Fetch or push
        origin: SnapshotOrigin,
        /// Normalized entries in feed order
        entries: Vec<Entry>,
    },
    /// A point lookup completed.
    LookupResolved {
        /// Player searched for
        id: PlayerId,
        /// Neighbourhood around the player
        entries: Vec<Entry>,
    },
    /// A point lookup failed.
    LookupFailed {
        /// Player searched for
        id: PlayerId,
    },
}

/// Bridges the external feed collaborators into [`FeedEvent`]s.
///
/// Events are posted as `E`, so the adapter can share one queue with other
/// event producers.
pub struct FeedAdapter<S: SnapshotSource, E = FeedEvent> {
    source: Arc<S>,
    events: mpsc::Sender<E>,
    subscription: Option<Subscription>,
    forwarder: Option<JoinHandle<()>>,
}

impl<S, E> FeedAdapter<S, E>
where
    S: SnapshotSource,
    E: From<FeedEvent> + Send + 'static,
{
    /// Create an adapter posting into `events`.
    pub fn new(source: S, events: mpsc::Sender<E>) -> Self {
        Self {
            source: Arc::new(source),
            events,
            subscription: None,
            forwarder: None,
        }
    }

    /// Issue the startup fetch of the full list.
    ///
    /// On failure nothing is posted and the repository keeps its prior state.
    pub fn load_snapshot(&self) -> JoinHandle<()> {
        let source = self.source.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            match source.fetch_top().await {
                Ok(entries) => {
                    debug!(entries = entries.len(), "Startup snapshot fetched");
                    let event = FeedEvent::Snapshot {
                        origin: SnapshotOrigin::Fetch,
                        entries,
                    };
                    if events.send(event.into()).await.is_err() {
                        debug!("Event queue closed, dropping startup snapshot");
                    }
                }
                Err(e) => error!(error = %e, "Failed to fetch leaderboard"),
            }
        })
    }

    /// Issue a point lookup around `id`.
    pub fn lookup(&self, id: PlayerId) -> JoinHandle<()> {
        let source = self.source.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let event = match source.fetch_around(id).await {
                Ok(entries) => FeedEvent::LookupResolved { id, entries },
                Err(e) => {
                    warn!(player = %id, error = %e, "Player lookup failed");
                    FeedEvent::LookupFailed { id }
                }
            };
            if events.send(event.into()).await.is_err() {
                debug!(player = %id, "Event queue closed, dropping lookup result");
            }
        })
    }

    /// Subscribe to `channel`. Any previous subscription must be torn down first.
    pub fn subscribe<P: PushChannel>(&mut self, channel: P) {
        if self.subscription.is_some() {
            warn!("Push channel already subscribed, ignoring");
            return;
        }

        let (tx, mut rx) = mpsc::channel::<PushDelivery>(DELIVERY_QUEUE);
        self.subscription = Some(channel.subscribe(tx));

        let events = self.events.clone();
        self.forwarder = Some(tokio::spawn(async move {
            while let Some(delivery) = rx.recv().await {
                match delivery {
                    Ok(entries) => {
                        let event = FeedEvent::Snapshot {
                            origin: SnapshotOrigin::Push,
                            entries,
                        };
                        if events.send(event.into()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => error!(error = %e, "Push channel failure"),
                }
            }
        }));
        info!("Subscribed to push channel");
    }

    /// Whether a push subscription is held.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Release the push subscription.
    ///
    /// When this returns no push delivery will be posted any more. In-flight
    /// fetches are left running; the controller discards their results.
    pub async fn teardown(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
            let _ = forwarder.await;
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe().await;
            info!("Push channel released");
        }
    }
}
