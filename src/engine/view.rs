//! Rendered View
//!
//! What the rendering layer receives: ranked rows, either as one flat
//! section or one section per country. Ranks are derived here from the
//! filtered view and nowhere else.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::record::{Entry, PlayerId};
use crate::engine::group::{group, ViewMode};
use crate::engine::rank::{RankError, RankIndex};

/// One displayed row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    /// Global 1-based rank in the filtered view
    pub rank: usize,
    /// Player identifier
    pub player_id: PlayerId,
    /// Player name
    pub name: String,
    /// Country label
    pub country: String,
    /// Wealth as delivered by the feed
    pub wealth: String,
    /// Feed score
    pub score: f64,
}

/// A block of rows. Flat mode has exactly one section without a country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    /// Country header (grouped mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Rows in display order
    pub rows: Vec<DisplayRow>,
}

/// Snapshot handed to the rendering layer after every state change.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedView {
    /// Repository generation this view was derived from
    pub generation: u64,
    /// When the view was produced
    pub updated_at: DateTime<Utc>,
    /// Display mode
    pub mode: ViewMode,
    /// Active search query
    pub query: String,
    /// Active player-id search, if a lookup result is displayed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup: Option<PlayerId>,
    /// Rows to display
    pub sections: Vec<Section>,
    /// Autocomplete values for the query
    pub suggestions: Vec<String>,
}

impl RenderedView {
    /// An empty view (nothing loaded yet).
    pub fn empty() -> Self {
        Self {
            generation: 0,
            updated_at: Utc::now(),
            mode: ViewMode::Flat,
            query: String::new(),
            lookup: None,
            sections: vec![Section {
                country: None,
                rows: Vec::new(),
            }],
            suggestions: Vec::new(),
        }
    }

    /// Total number of displayed rows.
    pub fn row_count(&self) -> usize {
        self.sections.iter().map(|s| s.rows.len()).sum()
    }

    /// All rows, section by section.
    pub fn rows(&self) -> impl Iterator<Item = &DisplayRow> {
        self.sections.iter().flat_map(|s| s.rows.iter())
    }
}

/// Build display sections for `view` in the given mode.
pub fn render_sections(view: &[Entry], mode: ViewMode) -> Result<Vec<Section>, RankError> {
    let ranks = RankIndex::new(view);

    match mode {
        ViewMode::Flat => Ok(vec![Section {
            country: None,
            rows: rows_for(view, &ranks)?,
        }]),
        ViewMode::GroupedByCountry => group(view)
            .into_iter()
            .map(|partition| {
                Ok(Section {
                    rows: rows_for(&partition.entries, &ranks)?,
                    country: Some(partition.country),
                })
            })
            .collect(),
    }
}

fn rows_for(entries: &[Entry], ranks: &RankIndex) -> Result<Vec<DisplayRow>, RankError> {
    entries
        .iter()
        .map(|e| {
            Ok(DisplayRow {
                rank: ranks.rank_of(e.player_id)?,
                player_id: e.player_id,
                name: e.name().to_string(),
                country: e.country().to_string(),
                wealth: e.wealth().as_text().to_string(),
                score: e.score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::entry;

    fn view() -> Vec<Entry> {
        vec![
            entry(1, "Alice", "USA", 500.0, 30.0),
            entry(2, "Kenji", "Japan", 900.0, 20.0),
            entry(3, "Bob", "USA", 700.0, 10.0),
        ]
    }

    #[test]
    fn test_flat_sections() {
        let sections = render_sections(&view(), ViewMode::Flat).unwrap();
        assert_eq!(sections.len(), 1);
        assert!(sections[0].country.is_none());
        let ranks: Vec<usize> = sections[0].rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_grouped_sections_keep_global_rank() {
        let sections = render_sections(&view(), ViewMode::GroupedByCountry).unwrap();
        assert_eq!(sections.len(), 2);

        let usa = &sections[0];
        assert_eq!(usa.country.as_deref(), Some("USA"));
        let pairs: Vec<(u64, usize)> = usa.rows.iter().map(|r| (r.player_id.get(), r.rank)).collect();
        // Bob is richer so listed first, but keeps rank 3.
        assert_eq!(pairs, vec![(3, 3), (1, 1)]);

        assert_eq!(sections[1].rows[0].rank, 2);
    }

    #[test]
    fn test_empty_view_renders() {
        let sections = render_sections(&[], ViewMode::GroupedByCountry).unwrap();
        assert!(sections.is_empty());
        assert_eq!(RenderedView::empty().row_count(), 0);
    }

    #[test]
    fn test_rendered_view_serializes_snake_case_mode() {
        let mut rendered = RenderedView::empty();
        rendered.mode = ViewMode::GroupedByCountry;
        let json = serde_json::to_string(&rendered).unwrap();
        assert!(json.contains("grouped_by_country"));
        assert!(!json.contains("lookup"));
    }
}
