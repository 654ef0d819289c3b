//! Rank Reconciliation
//!
//! Rank is never stored. It is the 1-based position of a player in the
//! current filtered view, found by identity, and it stays global while the
//! view is grouped by country.
//!
//! Manual reorders arrive as permutations of either the whole view (flat) or
//! one country's entries (grouped) and are written back into the filtered
//! view. A grouped reorder only ever rewrites the slots that country already
//! occupies, so every other country keeps its global ranks.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::core::record::{Entry, PlayerId};

/// Rank lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    /// The player is not displayed. Indicates a reconciliation bug.
    #[error("player {0} is not in the current view")]
    NotFoundInView(PlayerId),
}

/// Rejected manual reorders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    /// Reorder does not cover the scope exactly.
    #[error("reorder lists {got} players, expected {expected}")]
    LengthMismatch {
        /// Players in scope
        expected: usize,
        /// Players in the request
        got: usize,
    },

    /// Player is outside the reordered scope.
    #[error("player {0} is not part of the reordered scope")]
    UnknownPlayer(PlayerId),

    /// Player listed twice.
    #[error("player {0} appears more than once")]
    DuplicatePlayer(PlayerId),
}

/// 1-based rank of `id` within `view`.
pub fn rank_of(id: PlayerId, view: &[Entry]) -> Result<usize, RankError> {
    view.iter()
        .position(|e| e.player_id == id)
        .map(|i| i + 1)
        .ok_or(RankError::NotFoundInView(id))
}

/// Precomputed ranks for one view, for rendering many rows.
#[derive(Debug, Clone, Default)]
pub struct RankIndex {
    ranks: BTreeMap<PlayerId, usize>,
}

impl RankIndex {
    /// Index every entry of `view`.
    pub fn new(view: &[Entry]) -> Self {
        let ranks = view
            .iter()
            .enumerate()
            .map(|(i, e)| (e.player_id, i + 1))
            .collect();
        Self { ranks }
    }

    /// Rank of a player in the indexed view.
    pub fn rank_of(&self, id: PlayerId) -> Result<usize, RankError> {
        self.ranks
            .get(&id)
            .copied()
            .ok_or(RankError::NotFoundInView(id))
    }

    /// Number of ranked players.
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    /// Whether nothing is ranked.
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// Apply a flat drag: `new_order` becomes the filtered view.
///
/// `new_order` must be a permutation of `view`. The returned entries are the
/// view's own entries in the requested order, so a caller holding stale copies
/// cannot reintroduce outdated records.
pub fn reorder_flat(view: &[Entry], new_order: &[PlayerId]) -> Result<Vec<Entry>, ReorderError> {
    check_permutation(view.iter().map(|e| e.player_id), new_order)?;

    let by_id: BTreeMap<PlayerId, &Entry> = view.iter().map(|e| (e.player_id, e)).collect();
    Ok(new_order
        .iter()
        .filter_map(|id| by_id.get(id).map(|e| (*e).clone()))
        .collect())
}

/// Apply a drag inside one country's partition.
///
/// The slots `country` occupies in `view` are collected first, in ascending
/// order; `new_group_order[i]` is then written into the i-th slot. Slots of
/// every other country are left untouched.
pub fn reorder_within_group(
    view: &[Entry],
    country: &str,
    new_group_order: &[PlayerId],
) -> Result<Vec<Entry>, ReorderError> {
    let slots: Vec<usize> = view
        .iter()
        .enumerate()
        .filter(|(_, e)| e.country() == country)
        .map(|(i, _)| i)
        .collect();

    check_permutation(slots.iter().map(|&i| view[i].player_id), new_group_order)?;

    let by_id: BTreeMap<PlayerId, &Entry> = slots
        .iter()
        .map(|&i| (view[i].player_id, &view[i]))
        .collect();

    let mut updated = view.to_vec();
    for (slot, id) in slots.iter().zip(new_group_order) {
        if let Some(entry) = by_id.get(id) {
            updated[*slot] = (*entry).clone();
        }
    }
    Ok(updated)
}

/// Ensure `requested` lists every id of `scope` exactly once.
fn check_permutation(
    scope: impl Iterator<Item = PlayerId>,
    requested: &[PlayerId],
) -> Result<(), ReorderError> {
    let scope: BTreeSet<PlayerId> = scope.collect();
    if scope.len() != requested.len() {
        return Err(ReorderError::LengthMismatch {
            expected: scope.len(),
            got: requested.len(),
        });
    }

    let mut seen = BTreeSet::new();
    for id in requested {
        if !scope.contains(id) {
            return Err(ReorderError::UnknownPlayer(*id));
        }
        if !seen.insert(*id) {
            return Err(ReorderError::DuplicatePlayer(*id));
        }
    }
    Ok(())
}
