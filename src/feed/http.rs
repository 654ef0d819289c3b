//! HTTP Snapshot Source
//!
//! `reqwest` client for the leaderboard REST endpoint: the full top-N list
//! and the point lookup around one player.

use reqwest::{Client, Url};
use tracing::{debug, instrument};

use crate::config::FeedConfig;
use crate::core::record::{Entry, PlayerId};
use crate::feed::protocol::{DecodeError, LeaderboardPayload, LookupPayload};
use crate::feed::source::{FeedError, SnapshotSource, TransportError};

/// Path of the leaderboard endpoint, relative to the base URL.
pub const LEADERBOARD_PATH: &str = "api/v1/leaderboard";

/// Snapshot source backed by the leaderboard HTTP API.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: Client,
    leaderboard_url: Url,
}

impl HttpSnapshotSource {
    /// Build a source from configuration.
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(FeedError::fetch)?;

        Ok(Self {
            client,
            leaderboard_url: leaderboard_url(&config.base_url)?,
        })
    }

    /// URL of the full list.
    pub fn top_url(&self) -> &Url {
        &self.leaderboard_url
    }

    /// URL of the lookup around `id`.
    pub fn lookup_url(&self, id: PlayerId) -> Url {
        let mut url = self.leaderboard_url.clone();
        url.query_pairs_mut()
            .append_pair("searchPlayerId", &id.to_string());
        url
    }

    async fn get_text(&self, url: Url) -> Result<String, FeedError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(FeedError::fetch)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::fetch(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }));
        }

        response.text().await.map_err(FeedError::fetch)
    }
}

impl SnapshotSource for HttpSnapshotSource {
    #[instrument(skip(self))]
    async fn fetch_top(&self) -> Result<Vec<Entry>, FeedError> {
        let body = self.get_text(self.leaderboard_url.clone()).await?;
        let entries = LeaderboardPayload::from_json(&body)
            .map_err(DecodeError::from)
            .and_then(LeaderboardPayload::into_entries)
            .map_err(FeedError::fetch)?;

        debug!(entries = entries.len(), "Fetched leaderboard");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn fetch_around(&self, id: PlayerId) -> Result<Vec<Entry>, FeedError> {
        let body = self.get_text(self.lookup_url(id)).await?;
        let entries = LookupPayload::from_json(&body)
            .map_err(DecodeError::from)
            .and_then(LookupPayload::into_entries)
            .map_err(FeedError::fetch)?;

        debug!(entries = entries.len(), "Fetched player neighbourhood");
        Ok(entries)
    }
}

/// Resolve the leaderboard endpoint under `base`, keeping any base path.
fn leaderboard_url(base: &str) -> Result<Url, FeedError> {
    let mut url = Url::parse(base)
        .map_err(|e| FeedError::fetch(TransportError::InvalidUrl(format!("{base}: {e}"))))?;

    if url.cannot_be_a_base() {
        return Err(FeedError::fetch(TransportError::InvalidUrl(base.to_string())));
    }

    let path = format!("{}/{}", url.path().trim_end_matches('/'), LEADERBOARD_PATH);
    url.set_path(&path);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response; resolves to the request line.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();

            request.lines().next().unwrap_or_default().to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn source_for(base_url: String) -> HttpSnapshotSource {
        HttpSnapshotSource::new(&FeedConfig {
            base_url,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let source = source_for("http://leaderboard-backend:3000".to_string());
        assert_eq!(
            source.top_url().as_str(),
            "http://leaderboard-backend:3000/api/v1/leaderboard"
        );
        assert_eq!(
            source.lookup_url(PlayerId::new(42)).as_str(),
            "http://leaderboard-backend:3000/api/v1/leaderboard?searchPlayerId=42"
        );
    }

    #[test]
    fn test_url_keeps_base_path() {
        let source = source_for("http://host/game/".to_string());
        assert_eq!(source.top_url().as_str(), "http://host/game/api/v1/leaderboard");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpSnapshotSource::new(&FeedConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, FeedError::Fetch(TransportError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_top() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"top100Entries":[{"playerId":1,"score":10,"player":{"id":1,"name":"A","country":"USA","money":5}}]}"#,
        )
        .await;

        let entries = source_for(base).fetch_top().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "A");
        assert_eq!(server.await.unwrap(), "GET /api/v1/leaderboard HTTP/1.1");
    }

    #[tokio::test]
    async fn test_fetch_around() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"searchedPlayerRange":[{"playerId":42,"score":10,"player":{"id":42,"name":"P","country":"USA","money":"7"}}]}"#,
        )
        .await;

        let entries = source_for(base).fetch_around(PlayerId::new(42)).await.unwrap();
        assert_eq!(entries[0].player_id, PlayerId::new(42));
        assert_eq!(
            server.await.unwrap(),
            "GET /api/v1/leaderboard?searchPlayerId=42 HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_error_status_is_fetch_failure() {
        let (base, _server) = serve_once("503 Service Unavailable", "{}").await;
        let err = source_for(base).fetch_top().await.unwrap_err();
        assert!(matches!(
            err,
            FeedError::Fetch(TransportError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_bad_body_is_decode_failure() {
        let (base, _server) = serve_once("200 OK", "<html>").await;
        let err = source_for(base).fetch_top().await.unwrap_err();
        assert!(matches!(err, FeedError::Fetch(TransportError::Decode(_))));
    }
}
