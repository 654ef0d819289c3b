//! Player Records and Entries
//!
//! Strongly-typed ranking data. Everything the engine touches has already
//! passed the feed normalization boundary, so these types carry no
//! loosely-typed payload.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier as assigned by the feed.
///
/// Implements Ord for BTreeMap indexing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// Create from the raw integer.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Parse a user-typed player id search.
    ///
    /// Surrounding whitespace is ignored; anything else that is not a plain
    /// unsigned integer yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        input.trim().parse::<u64>().ok().map(Self)
    }

    /// Get the raw integer.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// =============================================================================
// WEALTH
// =============================================================================

/// Wealth metric used as the secondary (per-country) sort key.
///
/// The feed may transport it as a JSON number or as a string. The numeric
/// value drives comparisons; the text is what the feed sent and is what
/// search suggestions and display use.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Wealth {
    value: f64,
    text: String,
}

impl Wealth {
    /// Build from a number, rendering the text the way the feed would.
    pub fn from_value(value: f64) -> Option<Self> {
        value.is_finite().then(|| Self {
            value,
            text: value.to_string(),
        })
    }

    /// Build from a number with an explicit textual form.
    pub fn with_text(value: f64, text: impl Into<String>) -> Option<Self> {
        value.is_finite().then(|| Self {
            value,
            text: text.into(),
        })
    }

    /// Parse a wealth value transported as text.
    ///
    /// Returns `None` for anything that is not a finite number.
    pub fn parse(text: &str) -> Option<Self> {
        let value = text.trim().parse::<f64>().ok()?;
        Self::with_text(value, text)
    }

    /// Numeric value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Text as delivered by the feed.
    pub fn as_text(&self) -> &str {
        &self.text
    }

    /// Ordering for "richest first".
    pub fn cmp_desc(&self, other: &Wealth) -> Ordering {
        other.value.total_cmp(&self.value)
    }
}

impl fmt::Display for Wealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.text)
    }
}

// =============================================================================
// PLAYER RECORD
// =============================================================================

/// Descriptor of a single player. Immutable once ingested.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerRecord {
    /// Player identifier
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Free-form country label
    pub country: String,
    /// Wealth metric
    pub wealth: Wealth,
}

impl PlayerRecord {
    /// Create a new record.
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        country: impl Into<String>,
        wealth: Wealth,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            country: country.into(),
            wealth,
        }
    }
}

// =============================================================================
// ENTRY
// =============================================================================

/// The ranked unit: a player tied to a feed-assigned score.
///
/// The record is shared behind an `Arc`; cloning an entry never copies the
/// descriptor and the descriptor can never be mutated through a clone.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    /// Player identifier (matches `player.id`)
    pub player_id: PlayerId,
    /// Score assigned by the feed
    pub score: f64,
    /// The player this entry denotes
    pub player: Arc<PlayerRecord>,
}

impl Entry {
    /// Create an entry for a record.
    pub fn new(score: f64, player: PlayerRecord) -> Self {
        Self {
            player_id: player.id,
            score,
            player: Arc::new(player),
        }
    }

    /// Player name.
    pub fn name(&self) -> &str {
        &self.player.name
    }

    /// Country label.
    pub fn country(&self) -> &str {
        &self.player.country
    }

    /// Wealth metric.
    pub fn wealth(&self) -> &Wealth {
        &self.player.wealth
    }

    /// Score rendered as decimal text.
    pub fn score_text(&self) -> String {
        self.score.to_string()
    }
}

/// Build an entry from plain values.
#[cfg(test)]
pub(crate) fn entry(id: u64, name: &str, country: &str, wealth: f64, score: f64) -> Entry {
    let wealth = Wealth::from_value(wealth).expect("finite wealth");
    Entry::new(score, PlayerRecord::new(PlayerId::new(id), name, country, wealth))
}
