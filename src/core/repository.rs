//! Entry Repository
//!
//! The canonical collection: one entry per player, in feed order.
//! Every snapshot and every push replaces it wholesale.

use std::collections::BTreeMap;

use super::record::{Entry, PlayerId};

/// Single source of truth for ranking data.
#[derive(Debug, Default)]
pub struct EntryRepository {
    /// Entries in feed order
    entries: Vec<Entry>,
    /// Player id -> index into `entries`
    index: BTreeMap<PlayerId, usize>,
    /// Bumped on every replacement
    generation: u64,
}

impl EntryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the prior collection and install `entries`.
    ///
    /// Entries are ingested in order. If the same player appears more than
    /// once, the later occurrence replaces the earlier one, so the result
    /// never holds duplicates.
    pub fn replace_all(&mut self, entries: Vec<Entry>) {
        self.entries = dedupe_players(entries);
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.player_id, i))
            .collect();
        self.generation += 1;
    }

    /// The live canonical sequence.
    pub fn current(&self) -> &[Entry] {
        &self.entries
    }

    /// Look up an entry by player.
    pub fn get(&self, id: &PlayerId) -> Option<&Entry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// Zero-based position of a player in feed order.
    pub fn position_of(&self, id: &PlayerId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replacement counter (0 until the first snapshot lands).
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Keep one entry per player: a later occurrence replaces an earlier one and
/// takes its own position.
pub fn dedupe_players(entries: Vec<Entry>) -> Vec<Entry> {
    let mut index: BTreeMap<PlayerId, usize> = BTreeMap::new();
    let mut slots: Vec<Option<Entry>> = Vec::with_capacity(entries.len());

    for entry in entries {
        if let Some(previous) = index.insert(entry.player_id, slots.len()) {
            slots[previous] = None;
        }
        slots.push(Some(entry));
    }

    slots.into_iter().flatten().collect()
}
