//! Leaderboard Service
//!
//! Runs the controller on one task. Feed events and user commands share one
//! queue and are applied one at a time in the order they were posted; every
//! change republishes the rendered view on a watch channel.

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, instrument};

use crate::engine::controller::{LeaderboardController, Reaction, ReorderRequest};
use crate::engine::group::ViewMode;
use crate::engine::view::RenderedView;
use crate::feed::adapter::{FeedAdapter, FeedEvent};
use crate::feed::source::{PushChannel, SnapshotSource};

/// Service errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The service loop has exited.
    #[error("leaderboard service has stopped")]
    Stopped,
}

/// User interaction coming from the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Search box changed.
    SetQuery(String),
    /// Player-id search box changed.
    SetPlayerQuery(String),
    /// A drag finished.
    Reorder(ReorderRequest),
    /// Select a display mode.
    SetMode(ViewMode),
    /// Flip the display mode.
    ToggleMode,
}

/// Everything the service loop applies, tagged by producer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Posted by the feed adapter.
    Feed(FeedEvent),
    /// Posted through a [`ServiceHandle`].
    Command(Command),
}

impl From<FeedEvent> for Event {
    fn from(event: FeedEvent) -> Self {
        Event::Feed(event)
    }
}

impl From<Command> for Event {
    fn from(command: Command) -> Self {
        Event::Command(command)
    }
}

/// Owns the controller and the feed adapter.
pub struct LeaderboardService<S: SnapshotSource> {
    controller: LeaderboardController,
    adapter: FeedAdapter<S, Event>,
    events_rx: mpsc::Receiver<Event>,
    view_tx: watch::Sender<RenderedView>,
    shutdown_rx: broadcast::Receiver<()>,
}

/// Cloneable handle for driving a running service.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    events: mpsc::Sender<Event>,
    views: watch::Receiver<RenderedView>,
    shutdown_tx: broadcast::Sender<()>,
}

impl<S: SnapshotSource> LeaderboardService<S> {
    /// Create a service over `source` with a queue of `queue` events.
    pub fn new(source: S, queue: usize) -> (Self, ServiceHandle) {
        let (events_tx, events_rx) = mpsc::channel(queue);
        let (view_tx, view_rx) = watch::channel(RenderedView::empty());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let service = Self {
            controller: LeaderboardController::new(),
            adapter: FeedAdapter::new(source, events_tx.clone()),
            events_rx,
            view_tx,
            shutdown_rx,
        };
        let handle = ServiceHandle {
            events: events_tx,
            views: view_rx,
            shutdown_tx,
        };
        (service, handle)
    }

    /// Run until shut down or until every handle is dropped.
    ///
    /// Issues the startup fetch and subscribes to `channel` before entering
    /// the event loop.
    #[instrument(skip_all)]
    pub async fn run<P: PushChannel>(mut self, channel: P) {
        self.adapter.load_snapshot();
        self.adapter.subscribe(channel);
        info!("Leaderboard service started");

        loop {
            tokio::select! {
                biased;

                // Also fires once every handle is dropped
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
                Some(event) = self.events_rx.recv() => {
                    match event {
                        Event::Feed(event) => self.handle_feed(event),
                        Event::Command(command) => self.handle_command(command),
                    }
                }
            }
        }

        self.adapter.teardown().await;
        self.controller.close();
        info!("Leaderboard service stopped");
    }

    fn handle_feed(&mut self, event: FeedEvent) {
        let reaction = match event {
            FeedEvent::Snapshot { origin, entries } => self.controller.apply_snapshot(entries, origin),
            FeedEvent::LookupResolved { id, entries } => self.controller.apply_lookup(id, entries),
            FeedEvent::LookupFailed { id } => self.controller.lookup_failed(id),
        };
        self.react(reaction);
    }

    fn handle_command(&mut self, command: Command) {
        let reaction = match command {
            Command::SetQuery(query) => self.controller.set_query(query),
            Command::SetPlayerQuery(input) => self.controller.set_player_query(&input),
            Command::Reorder(request) => match self.controller.reorder(request) {
                Ok(reaction) => reaction,
                Err(_) => return,
            },
            Command::SetMode(mode) => self.controller.set_mode(mode),
            Command::ToggleMode => self.controller.toggle_mode(),
        };
        self.react(reaction);
    }

    fn react(&mut self, reaction: Reaction) {
        if let Some(id) = reaction.lookup {
            self.adapter.lookup(id);
        }
        if reaction.view_changed {
            self.publish();
        }
    }

    fn publish(&self) {
        match self.controller.render() {
            Ok(view) => {
                self.view_tx.send_replace(view);
            }
            // Every displayed row comes from the filtered view, so this is a bug.
            Err(e) => error!(error = %e, "Failed to render leaderboard"),
        }
    }
}

impl ServiceHandle {
    /// Send a command to the service.
    pub async fn send(&self, command: Command) -> Result<(), ServiceError> {
        self.events
            .send(command.into())
            .await
            .map_err(|_| ServiceError::Stopped)
    }

    /// Change the search query.
    pub async fn set_query(&self, query: impl Into<String>) -> Result<(), ServiceError> {
        self.send(Command::SetQuery(query.into())).await
    }

    /// Change the player-id search input.
    pub async fn set_player_query(&self, input: impl Into<String>) -> Result<(), ServiceError> {
        self.send(Command::SetPlayerQuery(input.into())).await
    }

    /// Apply a manual drag.
    pub async fn reorder(&self, request: ReorderRequest) -> Result<(), ServiceError> {
        self.send(Command::Reorder(request)).await
    }

    /// Flip between flat and grouped display.
    pub async fn toggle_mode(&self) -> Result<(), ServiceError> {
        self.send(Command::ToggleMode).await
    }

    /// Subscribe to rendered views.
    pub fn views(&self) -> watch::Receiver<RenderedView> {
        self.views.clone()
    }

    /// Latest rendered view.
    pub fn current(&self) -> RenderedView {
        self.views.borrow().clone()
    }

    /// Ask the service to tear down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
