//! Push Channels
//!
//! WebSocket subscription to the backend's live leaderboard updates, plus an
//! in-process channel fed from a local queue.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::feed::protocol::parse_push_frame;
use crate::feed::source::{FeedError, PushChannel, PushDelivery, Subscription, TransportError};

/// engine.io open packet prefix.
const OPEN_PACKET: char = '0';
/// engine.io ping.
const PING_PACKET: &str = "2";
/// engine.io pong.
const PONG_PACKET: &str = "3";
/// socket.io connect to the default namespace.
const NAMESPACE_CONNECT: &str = "40";

// =============================================================================
// WEBSOCKET
// =============================================================================

/// Push channel over a WebSocket connection.
#[derive(Debug, Clone)]
pub struct WebSocketPushChannel {
    url: String,
    event: String,
    reconnect_delay: Option<Duration>,
}

/// How a connection ended.
enum SessionEnd {
    /// Nobody is listening any more.
    ReceiverGone,
    /// Connection failed or was closed by the remote.
    Failed(TransportError),
}

impl WebSocketPushChannel {
    /// Create a channel for `event` frames on `url`.
    pub fn new(url: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            event: event.into(),
            reconnect_delay: None,
        }
    }

    /// Re-subscribe after `delay` when the connection drops.
    pub fn with_reconnect(mut self, delay: Option<Duration>) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Build from configuration.
    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(&config.push_url, &config.push_event).with_reconnect(config.reconnect_delay)
    }

    async fn run(self, deliveries: mpsc::Sender<PushDelivery>, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            let end = tokio::select! {
                end = self.session(&deliveries) => end,
                _ = shutdown_rx.recv() => {
                    debug!(url = %self.url, "Push subscription released");
                    return;
                }
            };

            let err = match end {
                SessionEnd::ReceiverGone => return,
                SessionEnd::Failed(err) => err,
            };
            warn!(url = %self.url, error = %err, "Push channel lost");

            tokio::select! {
                sent = deliveries.send(Err(FeedError::channel(err))) => {
                    if sent.is_err() {
                        return;
                    }
                }
                _ = shutdown_rx.recv() => return,
            }

            let Some(delay) = self.reconnect_delay else {
                return;
            };
            info!(url = %self.url, delay_secs = delay.as_secs_f64(), "Reconnecting push channel");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.recv() => return,
            }
        }
    }

    /// One connection, from handshake to close.
    async fn session(&self, deliveries: &mpsc::Sender<PushDelivery>) -> SessionEnd {
        let (ws_stream, _) = match connect_async(self.url.as_str()).await {
            Ok(conn) => conn,
            Err(e) => return SessionEnd::Failed(e.into()),
        };
        info!(url = %self.url, "Push channel connected");

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        while let Some(msg) = ws_receiver.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => return SessionEnd::Failed(e.into()),
            };

            let reply = if text.starts_with(OPEN_PACKET) {
                Some(NAMESPACE_CONNECT)
            } else if text == PING_PACKET {
                Some(PONG_PACKET)
            } else {
                None
            };
            if let Some(reply) = reply {
                if let Err(e) = ws_sender.send(Message::Text(reply.to_string())).await {
                    return SessionEnd::Failed(e.into());
                }
                continue;
            }

            let delivery = match parse_push_frame(&text, &self.event) {
                Ok(None) => continue,
                Ok(Some(payload)) => payload.into_entries().map_err(FeedError::channel),
                Err(e) => Err(FeedError::channel(e)),
            };

            if deliveries.send(delivery).await.is_err() {
                return SessionEnd::ReceiverGone;
            }
        }

        SessionEnd::Failed(TransportError::Closed)
    }
}

impl PushChannel for WebSocketPushChannel {
    fn subscribe(self, deliveries: mpsc::Sender<PushDelivery>) -> Subscription {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(self.run(deliveries, shutdown_rx));
        Subscription::new(shutdown_tx, task)
    }
}

// =============================================================================
// IN-PROCESS
// =============================================================================

/// Push channel fed from a local queue (replays, embedding, tests).
#[derive(Debug)]
pub struct QueuePushChannel {
    rx: mpsc::Receiver<PushDelivery>,
}

impl QueuePushChannel {
    /// Create the channel and the sender that feeds it.
    pub fn new(capacity: usize) -> (mpsc::Sender<PushDelivery>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

impl PushChannel for QueuePushChannel {
    fn subscribe(mut self, deliveries: mpsc::Sender<PushDelivery>) -> Subscription {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    delivery = self.rx.recv() => {
                        let Some(delivery) = delivery else { break };
                        if deliveries.send(delivery).await.is_err() {
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Subscription::new(shutdown_tx, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::PlayerId;
    use crate::feed::protocol::DEFAULT_PUSH_EVENT;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;

    const FRAME: &str = r#"42["leaderboardUpdate",{"top100Entries":[{"playerId":7,"score":3,"player":{"id":7,"name":"Q","country":"UK","money":2}}]}]"#;

    async fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    async fn next_text<S>(ws: &mut S) -> String
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return text,
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn test_handshake_and_delivery() {
        let (listener, url) = listener().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            ws.send(Message::Text(r#"0{"sid":"s1","pingInterval":25000}"#.into()))
                .await
                .unwrap();
            assert_eq!(next_text(&mut ws).await, "40");

            ws.send(Message::Text("2".into())).await.unwrap();
            assert_eq!(next_text(&mut ws).await, "3");

            ws.send(Message::Text(r#"40{"sid":"n1"}"#.into())).await.unwrap();
            ws.send(Message::Text(FRAME.into())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let (tx, mut rx) = mpsc::channel(8);
        let sub = WebSocketPushChannel::new(url, DEFAULT_PUSH_EVENT).subscribe(tx);

        let entries = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(entries[0].player_id, PlayerId::new(7));

        let closed = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert!(matches!(closed, FeedError::Channel(TransportError::Closed)));

        server.await.unwrap();
        sub.unsubscribe().await;
    }

    #[tokio::test]
    async fn test_bad_frame_reported_and_channel_continues() {
        let (listener, url) = listener().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::Text(r#"{"event":"leaderboardUpdate","data":{"top100Entries":[{"playerId":1,"score":1,"player":{"id":1,"name":"A","country":"UK","money":"lots"}}]}}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Text(FRAME.into())).await.unwrap();
            // Hold the connection until the client goes away
            while ws.next().await.is_some() {}
        });

        let (tx, mut rx) = mpsc::channel(8);
        let sub = WebSocketPushChannel::new(url, DEFAULT_PUSH_EVENT).subscribe(tx);

        let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert!(matches!(first, Err(FeedError::Channel(TransportError::Decode(_)))));

        let second = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(second.unwrap().len(), 1);

        sub.unsubscribe().await;
        assert!(rx.recv().await.is_none());
        server.abort();
    }

    #[tokio::test]
    async fn test_connect_failure_without_reconnect_ends() {
        let (listener, url) = listener().await;
        drop(listener);

        let (tx, mut rx) = mpsc::channel(8);
        let sub = WebSocketPushChannel::new(url, DEFAULT_PUSH_EVENT).subscribe(tx);

        let err = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert!(err.is_channel());
        assert!(timeout(Duration::from_secs(5), rx.recv()).await.unwrap().is_none());
        sub.unsubscribe().await;
    }

    #[tokio::test]
    async fn test_reconnects_after_drop() {
        let (listener, url) = listener().await;

        let server = tokio::spawn(async move {
            for _ in 0..2 {
                let (stream, _) = listener.accept().await.unwrap();
                let mut ws = accept_async(stream).await.unwrap();
                ws.send(Message::Text(FRAME.into())).await.unwrap();
                ws.close(None).await.unwrap();
            }
        });

        let (tx, mut rx) = mpsc::channel(8);
        let sub = WebSocketPushChannel::new(url, DEFAULT_PUSH_EVENT)
            .with_reconnect(Some(Duration::from_millis(10)))
            .subscribe(tx);

        let mut snapshots = 0;
        while snapshots < 2 {
            let delivery = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
            if delivery.is_ok() {
                snapshots += 1;
            }
        }

        sub.unsubscribe().await;
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_queue_channel_forwards_until_released() {
        let (feed, channel) = QueuePushChannel::new(4);
        let (tx, mut rx) = mpsc::channel(4);
        let sub = channel.subscribe(tx);

        feed.send(Ok(Vec::new())).await.unwrap();
        assert!(rx.recv().await.unwrap().unwrap().is_empty());

        sub.unsubscribe().await;
        assert!(rx.recv().await.is_none());
    }
}
