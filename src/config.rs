//! Feed Configuration
//!
//! Where the leaderboard backend lives and how the service talks to it.
//! Values come from defaults or the environment.

use std::time::Duration;

use thiserror::Error;

use crate::feed::protocol::DEFAULT_PUSH_EVENT;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable holds an unusable value.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Value found
        value: String,
    },
}

/// Backend endpoints and service tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Base URL of the leaderboard HTTP API.
    pub base_url: String,
    /// WebSocket URL of the push channel.
    pub push_url: String,
    /// Push event carrying leaderboard snapshots.
    pub push_event: String,
    /// Per-request timeout for snapshot and lookup fetches.
    pub fetch_timeout: Duration,
    /// Delay before re-subscribing after the push channel drops. `None` disables.
    pub reconnect_delay: Option<Duration>,
    /// Capacity of the controller event queue.
    pub event_queue: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://leaderboard-backend:3000".to_string(),
            push_url: "ws://leaderboard-backend/socket.io/?EIO=4&transport=websocket".to_string(),
            push_event: DEFAULT_PUSH_EVENT.to_string(),
            fetch_timeout: Duration::from_secs(10),
            reconnect_delay: Some(Duration::from_secs(5)),
            event_queue: 256,
        }
    }
}

impl FeedConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let fetch_timeout = match lookup("LEADERBOARD_FETCH_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_number("LEADERBOARD_FETCH_TIMEOUT_SECS", &v)?),
            None => defaults.fetch_timeout,
        };

        // 0 turns reconnects off
        let reconnect_delay = match lookup("LEADERBOARD_RECONNECT_SECS") {
            Some(v) => match parse_number("LEADERBOARD_RECONNECT_SECS", &v)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => defaults.reconnect_delay,
        };

        let event_queue = match lookup("LEADERBOARD_EVENT_QUEUE") {
            Some(v) => match usize::try_from(parse_number("LEADERBOARD_EVENT_QUEUE", &v)?) {
                Ok(n) if (1..=MAX_EVENT_QUEUE).contains(&n) => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "LEADERBOARD_EVENT_QUEUE",
                        value: v,
                    })
                }
            },
            None => defaults.event_queue,
        };

        Ok(Self {
            base_url: lookup("LEADERBOARD_BASE_URL").unwrap_or(defaults.base_url),
            push_url: lookup("LEADERBOARD_PUSH_URL").unwrap_or(defaults.push_url),
            push_event: lookup("LEADERBOARD_PUSH_EVENT").unwrap_or(defaults.push_event),
            fetch_timeout,
            reconnect_delay,
            event_queue,
        })
    }
}

/// Largest accepted event queue capacity.
pub const MAX_EVENT_QUEUE: usize = 65_536;

fn parse_number(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}
