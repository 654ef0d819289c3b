//! Feed Wire Format
//!
//! JSON payloads served by the leaderboard backend, and the normalization
//! step that turns them into engine entries. Nothing loosely typed crosses
//! `normalize`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::record::{Entry, PlayerId, PlayerRecord, Wealth};

/// Push event carrying a fresh top-N list.
pub const DEFAULT_PUSH_EVENT: &str = "leaderboardUpdate";

// =============================================================================
// PAYLOADS
// =============================================================================

/// A number the backend may send either as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    /// Plain JSON number.
    Number(f64),
    /// Number encoded as text.
    Text(String),
}

/// Player descriptor as sent by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePlayer {
    /// Player identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Country label.
    pub country: String,
    /// Wealth metric.
    pub money: WireNumber,
}

/// One ranked record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEntry {
    /// Player identifier (must match `player.id`).
    pub player_id: u64,
    /// Feed score.
    pub score: WireNumber,
    /// Embedded descriptor.
    pub player: WirePlayer,
}

/// Full top-N list (snapshot response and push payload).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardPayload {
    /// Ranked records in feed order.
    #[serde(rename = "top100Entries", default)]
    pub top_entries: Vec<WireEntry>,
}

/// Point lookup response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupPayload {
    /// Neighbourhood around the searched player.
    #[serde(rename = "searchedPlayerRange", default)]
    pub searched_player_range: Vec<WireEntry>,
}

/// Envelope form of a push frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    /// Event name.
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub data: Value,
}

/// Payload decoding / validation errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not valid JSON or wrong shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Wealth could not be read as a finite number.
    #[error("player {player}: invalid money value {text:?}")]
    InvalidWealth {
        /// Offending player
        player: u64,
        /// Value as sent
        text: String,
    },

    /// Score could not be read as a finite number.
    #[error("player {player}: invalid score value {text:?}")]
    InvalidScore {
        /// Offending player
        player: u64,
        /// Value as sent
        text: String,
    },

    /// `playerId` and `player.id` disagree.
    #[error("entry playerId {entry} does not match player.id {player}")]
    IdMismatch {
        /// Entry-level id
        entry: u64,
        /// Descriptor id
        player: u64,
    },

    /// Push frame that is neither an envelope nor an event packet.
    #[error("malformed push frame: {0}")]
    MalformedFrame(String),
}

// =============================================================================
// NORMALIZATION
// =============================================================================

impl WireNumber {
    fn to_f64(&self) -> Option<f64> {
        match self {
            WireNumber::Number(n) => n.is_finite().then_some(*n),
            WireNumber::Text(t) => t.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    fn to_wealth(&self) -> Option<Wealth> {
        match self {
            WireNumber::Number(n) => Wealth::from_value(*n),
            WireNumber::Text(t) => Wealth::parse(t),
        }
    }

    fn describe(&self) -> String {
        match self {
            WireNumber::Number(n) => n.to_string(),
            WireNumber::Text(t) => t.clone(),
        }
    }
}

impl WireEntry {
    /// Validate and convert into an engine entry.
    pub fn normalize(&self) -> Result<Entry, DecodeError> {
        if self.player_id != self.player.id {
            return Err(DecodeError::IdMismatch {
                entry: self.player_id,
                player: self.player.id,
            });
        }

        let score = self.score.to_f64().ok_or_else(|| DecodeError::InvalidScore {
            player: self.player_id,
            text: self.score.describe(),
        })?;

        let wealth = self
            .player
            .money
            .to_wealth()
            .ok_or_else(|| DecodeError::InvalidWealth {
                player: self.player_id,
                text: self.player.money.describe(),
            })?;

        Ok(Entry::new(
            score,
            PlayerRecord::new(
                PlayerId::new(self.player_id),
                self.player.name.clone(),
                self.player.country.clone(),
                wealth,
            ),
        ))
    }
}

/// Normalize a list of records. One bad record rejects the whole list.
pub fn normalize(records: &[WireEntry]) -> Result<Vec<Entry>, DecodeError> {
    records.iter().map(WireEntry::normalize).collect()
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl LeaderboardPayload {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Validated entries.
    pub fn into_entries(self) -> Result<Vec<Entry>, DecodeError> {
        normalize(&self.top_entries)
    }
}

impl LookupPayload {
    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Validated entries.
    pub fn into_entries(self) -> Result<Vec<Entry>, DecodeError> {
        normalize(&self.searched_player_range)
    }
}

/// Packet-type prefix of a socket.io event message.
pub const EVENT_PACKET: &str = "42";

/// Decode a push-channel text frame.
///
/// Accepts an envelope (`{"event": .., "data": ..}`), a bare event array
/// (`["event", data]`) or a socket.io event packet (`42["event", data]`).
/// Returns `Ok(None)` for frames that carry no payload: other numeric
/// packets (open, ping, connect ack) and events with a different name.
pub fn parse_push_frame(text: &str, event: &str) -> Result<Option<LeaderboardPayload>, DecodeError> {
    let text = text.trim();
    let body = text.trim_start_matches(|c: char| c.is_ascii_digit());
    let prefix = &text[..text.len() - body.len()];
    if !prefix.is_empty() && prefix != EVENT_PACKET {
        return Ok(None);
    }

    let body = body.trim();
    if body.is_empty() {
        return Ok(None);
    }

    let (name, data) = match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => {
            let mut items = items.into_iter();
            match (items.next(), items.next()) {
                (Some(Value::String(name)), Some(data)) => (name, data),
                (Some(Value::String(_)), None) => return Ok(None),
                _ => return Err(DecodeError::MalformedFrame("event packet without a name".into())),
            }
        }
        value @ Value::Object(_) => {
            let envelope: PushEnvelope = serde_json::from_value(value)?;
            (envelope.event, envelope.data)
        }
        _ => return Err(DecodeError::MalformedFrame("expected object or array".into())),
    };

    if name != event {
        return Ok(None);
    }

    Ok(Some(serde_json::from_value(data)?))
}
