//! Leaderboard Controller
//!
//! Owns the repository and the view state and is the only place either is
//! mutated. Callers (the service loop) hand it one event at a time; each
//! call runs to completion before the next, which is what keeps the derived
//! views consistent with the canonical collection.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::core::record::{Entry, PlayerId};
use crate::core::repository::{dedupe_players, EntryRepository};
use crate::engine::filter::{filter, suggest};
use crate::engine::group::{group, Partition, ViewMode};
use crate::engine::rank::{rank_of, reorder_flat, reorder_within_group, RankError, ReorderError};
use crate::engine::view::{render_sections, RenderedView};

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Accepting events.
    Active,
    /// Torn down; every further write is discarded.
    Closed,
}

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// Initial request/response fetch.
    Fetch,
    /// Push-channel delivery.
    Push,
}

/// A manual drag coming back from the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderRequest {
    /// Whole filtered view in its new order.
    Flat(Vec<PlayerId>),
    /// One country's partition in its new order.
    WithinGroup {
        /// Partition that was dragged
        country: String,
        /// Its players in the new order
        order: Vec<PlayerId>,
    },
}

/// What the caller has to do after an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    /// The rendered view changed and should be republished.
    pub view_changed: bool,
    /// A point lookup should be issued for this player.
    pub lookup: Option<PlayerId>,
}

impl Reaction {
    fn changed() -> Self {
        Self {
            view_changed: true,
            lookup: None,
        }
    }

    fn unchanged() -> Self {
        Self::default()
    }
}

/// Single owner of all ranking state.
#[derive(Debug)]
pub struct LeaderboardController {
    state: ControllerState,
    repository: EntryRepository,
    query: String,
    /// Player id currently typed into the id search
    player_query: Option<PlayerId>,
    /// Set while `filtered` holds a point-lookup result
    lookup: Option<PlayerId>,
    mode: ViewMode,
    filtered: Vec<Entry>,
    suggestions: Vec<String>,
}

impl Default for LeaderboardController {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaderboardController {
    /// Create an empty, active controller.
    pub fn new() -> Self {
        Self {
            state: ControllerState::Active,
            repository: EntryRepository::new(),
            query: String::new(),
            player_query: None,
            lookup: None,
            mode: ViewMode::Flat,
            filtered: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Whether writes are still accepted.
    pub fn is_active(&self) -> bool {
        self.state == ControllerState::Active
    }

    /// Lifecycle state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Stop accepting writes.
    pub fn close(&mut self) {
        self.state = ControllerState::Closed;
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Install a full snapshot from the feed.
    ///
    /// Replaces the canonical collection and rebuilds the filtered view, so any
    /// manual order or lookup result is dropped.
    pub fn apply_snapshot(&mut self, entries: Vec<Entry>, origin: SnapshotOrigin) -> Reaction {
        if !self.is_active() {
            debug!(?origin, "Discarding snapshot after teardown");
            return Reaction::unchanged();
        }

        self.repository.replace_all(entries);
        info!(
            ?origin,
            generation = self.repository.generation(),
            entries = self.repository.len(),
            "Snapshot applied"
        );
        self.recompute();
        Reaction::changed()
    }

    /// Change the search query.
    pub fn set_query(&mut self, query: impl Into<String>) -> Reaction {
        if !self.is_active() {
            return Reaction::unchanged();
        }

        self.query = query.into();
        self.recompute();
        Reaction::changed()
    }

    /// Change the player-id search input.
    ///
    /// A parseable id asks the caller for a point lookup; anything else clears
    /// the id search and shows the search-filtered view again.
    pub fn set_player_query(&mut self, input: &str) -> Reaction {
        if !self.is_active() {
            return Reaction::unchanged();
        }

        match PlayerId::parse(input) {
            Some(id) => {
                self.player_query = Some(id);
                Reaction {
                    view_changed: false,
                    lookup: Some(id),
                }
            }
            None => {
                self.player_query = None;
                self.recompute();
                Reaction::changed()
            }
        }
    }

    /// Install a point-lookup result as the filtered view.
    ///
    /// Repeated players are collapsed the same way a snapshot collapses them.
    pub fn apply_lookup(&mut self, id: PlayerId, entries: Vec<Entry>) -> Reaction {
        if !self.accepts_lookup(id) {
            return Reaction::unchanged();
        }

        if entries.is_empty() {
            info!(player = %id, "No players found for id");
            return Reaction::unchanged();
        }

        self.filtered = dedupe_players(entries);
        self.lookup = Some(id);
        Reaction::changed()
    }

    /// A point lookup failed: fall back to the search-filtered view.
    pub fn lookup_failed(&mut self, id: PlayerId) -> Reaction {
        if !self.accepts_lookup(id) {
            return Reaction::unchanged();
        }

        self.recompute();
        Reaction::changed()
    }

    /// Apply a manual drag.
    ///
    /// Invalid requests (not a permutation of the dragged scope) leave the
    /// view untouched.
    pub fn reorder(&mut self, request: ReorderRequest) -> Result<Reaction, ReorderError> {
        if !self.is_active() {
            return Ok(Reaction::unchanged());
        }

        let result = match &request {
            ReorderRequest::Flat(order) => reorder_flat(&self.filtered, order),
            ReorderRequest::WithinGroup { country, order } => {
                reorder_within_group(&self.filtered, country, order)
            }
        };

        match result {
            Ok(updated) => {
                self.filtered = updated;
                Ok(Reaction::changed())
            }
            Err(e) => {
                warn!(error = %e, "Rejected reorder");
                Err(e)
            }
        }
    }

    /// Switch between flat and grouped display.
    pub fn set_mode(&mut self, mode: ViewMode) -> Reaction {
        if !self.is_active() || self.mode == mode {
            return Reaction::unchanged();
        }
        self.mode = mode;
        Reaction::changed()
    }

    /// Flip the display mode.
    pub fn toggle_mode(&mut self) -> Reaction {
        let next = self.mode.toggled();
        self.set_mode(next)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The canonical collection.
    pub fn repository(&self) -> &EntryRepository {
        &self.repository
    }

    /// Current filtered view.
    pub fn filtered(&self) -> &[Entry] {
        &self.filtered
    }

    /// Current search query.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Current display mode.
    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Player id whose neighbourhood is displayed, if any.
    pub fn lookup(&self) -> Option<PlayerId> {
        self.lookup
    }

    /// Autocomplete values for the current query.
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Global rank of a displayed player.
    pub fn rank_of(&self, id: PlayerId) -> Result<usize, RankError> {
        rank_of(id, &self.filtered)
    }

    /// Country partitions of the filtered view.
    pub fn groups(&self) -> Vec<Partition> {
        group(&self.filtered)
    }

    /// Build the snapshot for the rendering layer.
    pub fn render(&self) -> Result<RenderedView, RankError> {
        Ok(RenderedView {
            generation: self.repository.generation(),
            updated_at: Utc::now(),
            mode: self.mode,
            query: self.query.clone(),
            lookup: self.lookup,
            sections: render_sections(&self.filtered, self.mode)?,
            suggestions: self.suggestions.clone(),
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn accepts_lookup(&self, id: PlayerId) -> bool {
        if !self.is_active() {
            debug!(player = %id, "Discarding lookup after teardown");
            return false;
        }
        if self.player_query != Some(id) {
            debug!(player = %id, "Discarding stale lookup");
            return false;
        }
        true
    }

    fn recompute(&mut self) {
        let canonical = self.repository.current();
        self.filtered = filter(canonical, &self.query);
        self.suggestions = suggest(canonical, &self.query);
        self.lookup = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::entry;

    fn pid(id: u64) -> PlayerId {
        PlayerId::new(id)
    }

    fn ids(entries: &[Entry]) -> Vec<u64> {
        entries.iter().map(|e| e.player_id.get()).collect()
    }

    fn snapshot() -> Vec<Entry> {
        vec![
            entry(1, "Alice", "USA", 500.0, 90.0),
            entry(2, "Kenji", "Japan", 900.0, 80.0),
            entry(3, "Bob", "USA", 700.0, 70.0),
            entry(4, "Yui", "Japan", 100.0, 60.0),
        ]
    }

    fn loaded() -> LeaderboardController {
        let mut c = LeaderboardController::new();
        c.apply_snapshot(snapshot(), SnapshotOrigin::Fetch);
        c
    }

    #[test]
    fn test_snapshot_populates_view() {
        let c = loaded();
        assert_eq!(ids(c.filtered()), vec![1, 2, 3, 4]);
        assert_eq!(c.repository().generation(), 1);
        assert_eq!(c.rank_of(pid(3)), Ok(3));
    }

    #[test]
    fn test_query_filters_and_suggests() {
        let mut c = loaded();
        let reaction = c.set_query("usa");
        assert!(reaction.view_changed);
        assert_eq!(ids(c.filtered()), vec![1, 3]);
        assert_eq!(c.suggestions().to_vec(), vec!["USA".to_string()]);

        c.set_query("");
        assert_eq!(ids(c.filtered()), vec![1, 2, 3, 4]);
        assert!(c.suggestions().is_empty());
    }

    #[test]
    fn test_query_survives_snapshot() {
        let mut c = loaded();
        c.set_query("japan");
        c.apply_snapshot(
            vec![entry(4, "Yui", "Japan", 100.0, 99.0), entry(1, "Alice", "USA", 500.0, 90.0)],
            SnapshotOrigin::Push,
        );
        assert_eq!(ids(c.filtered()), vec![4]);
    }

    #[test]
    fn test_push_after_reorder_discards_reorder() {
        let mut c = loaded();
        c.reorder(ReorderRequest::Flat(vec![pid(4), pid(3), pid(2), pid(1)]))
            .unwrap();
        assert_eq!(ids(c.filtered()), vec![4, 3, 2, 1]);

        let next = snapshot();
        c.apply_snapshot(next.clone(), SnapshotOrigin::Push);
        assert_eq!(c.filtered(), filter(&next, c.query()).as_slice());
        assert_eq!(ids(c.filtered()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_grouped_reorder_keeps_other_country_ranks() {
        let mut c = loaded();
        c.set_mode(ViewMode::GroupedByCountry);

        let japan_before: Vec<usize> = [2, 4].iter().map(|&id| c.rank_of(pid(id)).unwrap()).collect();
        c.reorder(ReorderRequest::WithinGroup {
            country: "USA".to_string(),
            order: vec![pid(3), pid(1)],
        })
        .unwrap();
        let japan_after: Vec<usize> = [2, 4].iter().map(|&id| c.rank_of(pid(id)).unwrap()).collect();

        assert_eq!(japan_before, japan_after);
        assert_eq!(c.rank_of(pid(3)), Ok(1));
        assert_eq!(c.rank_of(pid(1)), Ok(3));
    }

    #[test]
    fn test_invalid_reorder_leaves_view() {
        let mut c = loaded();
        let err = c
            .reorder(ReorderRequest::Flat(vec![pid(1), pid(2)]))
            .unwrap_err();
        assert!(matches!(err, ReorderError::LengthMismatch { .. }));
        assert_eq!(ids(c.filtered()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_reorder_keeps_filtered_out_entries_in_repository() {
        let mut c = loaded();
        c.set_query("usa");
        c.reorder(ReorderRequest::Flat(vec![pid(3), pid(1)])).unwrap();

        assert_eq!(c.repository().len(), 4);
        c.set_query("");
        assert_eq!(ids(c.filtered()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_player_query_requests_lookup() {
        let mut c = loaded();
        let reaction = c.set_player_query("42");
        assert_eq!(reaction.lookup, Some(pid(42)));
        assert!(!reaction.view_changed);
    }

    #[test]
    fn test_lookup_result_becomes_view() {
        let mut c = loaded();
        c.set_player_query("42");
        let around: Vec<Entry> = (40..=44)
            .map(|id| entry(id, "P", "USA", 1.0, 100.0 - id as f64))
            .collect();

        let reaction = c.apply_lookup(pid(42), around);
        assert!(reaction.view_changed);
        assert_eq!(c.lookup(), Some(pid(42)));
        assert_eq!(c.rank_of(pid(42)), Ok(3));
        // The repository is not replaced by a lookup.
        assert_eq!(c.repository().len(), 4);
    }

    #[test]
    fn test_lookup_with_repeated_player_keeps_ranks_unique() {
        let mut c = loaded();
        c.set_player_query("42");
        c.apply_lookup(
            pid(42),
            vec![
                entry(41, "P", "USA", 1.0, 3.0),
                entry(42, "Old", "USA", 1.0, 2.0),
                entry(42, "New", "USA", 1.0, 1.0),
            ],
        );

        assert_eq!(ids(c.filtered()), vec![41, 42]);
        let ranks: Vec<usize> = c.render().unwrap().rows().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2]);

        c.reorder(ReorderRequest::Flat(vec![pid(42), pid(41)])).unwrap();
        assert_eq!(ids(c.filtered()), vec![42, 41]);
        assert_eq!(c.filtered()[0].name(), "New");
    }

    #[test]
    fn test_empty_lookup_keeps_view() {
        let mut c = loaded();
        c.set_player_query("42");
        let reaction = c.apply_lookup(pid(42), Vec::new());
        assert!(!reaction.view_changed);
        assert_eq!(ids(c.filtered()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_stale_lookup_discarded() {
        let mut c = loaded();
        c.set_player_query("42");
        c.set_player_query("7");
        let reaction = c.apply_lookup(pid(42), vec![entry(42, "P", "USA", 1.0, 1.0)]);
        assert!(!reaction.view_changed);
        assert!(c.lookup().is_none());
    }

    #[test]
    fn test_lookup_failure_falls_back_to_search() {
        let mut c = loaded();
        c.set_query("japan");
        c.set_player_query("42");
        c.apply_lookup(pid(42), vec![entry(42, "P", "USA", 1.0, 1.0)]);

        let reaction = c.lookup_failed(pid(42));
        assert!(reaction.view_changed);
        assert_eq!(ids(c.filtered()), vec![2, 4]);
        assert!(c.lookup().is_none());
    }

    #[test]
    fn test_non_numeric_player_query_clears_lookup() {
        let mut c = loaded();
        c.set_player_query("42");
        c.apply_lookup(pid(42), vec![entry(42, "P", "USA", 1.0, 1.0)]);

        let reaction = c.set_player_query("");
        assert!(reaction.view_changed);
        assert!(reaction.lookup.is_none());
        assert_eq!(ids(c.filtered()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_snapshot_drops_lookup_override() {
        let mut c = loaded();
        c.set_player_query("42");
        c.apply_lookup(pid(42), vec![entry(42, "P", "USA", 1.0, 1.0)]);
        c.apply_snapshot(snapshot(), SnapshotOrigin::Push);
        assert!(c.lookup().is_none());
        assert_eq!(c.filtered().len(), 4);
    }

    #[test]
    fn test_mode_toggle_does_not_touch_view() {
        let mut c = loaded();
        assert!(c.toggle_mode().view_changed);
        assert_eq!(c.mode(), ViewMode::GroupedByCountry);
        assert_eq!(ids(c.filtered()), vec![1, 2, 3, 4]);
        assert!(!c.set_mode(ViewMode::GroupedByCountry).view_changed);
        assert_eq!(c.groups().len(), 2);
    }

    #[test]
    fn test_closed_controller_discards_writes() {
        let mut c = loaded();
        c.close();
        assert_eq!(c.state(), ControllerState::Closed);

        let reaction = c.apply_snapshot(Vec::new(), SnapshotOrigin::Push);
        assert!(!reaction.view_changed);
        assert_eq!(c.repository().len(), 4);
        assert!(!c.set_query("usa").view_changed);
        assert_eq!(c.query(), "");
    }

    #[test]
    fn test_render_every_displayed_row_ranks() {
        let mut c = loaded();
        c.set_mode(ViewMode::GroupedByCountry);
        c.reorder(ReorderRequest::WithinGroup {
            country: "Japan".to_string(),
            order: vec![pid(4), pid(2)],
        })
        .unwrap();

        let rendered = c.render().unwrap();
        assert_eq!(rendered.row_count(), 4);
        let mut ranks: Vec<usize> = rendered.rows().map(|r| r.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }
}
