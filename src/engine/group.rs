//! Country Grouping
//!
//! Display-only partitioning of a filtered view by country. Each partition
//! is sorted richest-first; the order of partitions is the order in which
//! countries are first encountered.

use std::collections::HashMap;

use serde::Serialize;

use crate::core::record::Entry;

/// One country's slice of the filtered view.
#[derive(Clone, Debug, PartialEq)]
pub struct Partition {
    /// Country label as delivered by the feed
    pub country: String,
    /// Entries of that country, wealth descending
    pub entries: Vec<Entry>,
}

/// Flat vs. grouped display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Single list in filtered-view order.
    #[default]
    Flat,
    /// One partition per country.
    GroupedByCountry,
}

impl ViewMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Flat => ViewMode::GroupedByCountry,
            ViewMode::GroupedByCountry => ViewMode::Flat,
        }
    }
}

/// Partition `entries` by country.
///
/// Entries are cloned into their partitions, so later reordering of a
/// partition never writes through to `entries`. Within a partition the sort
/// is stable: equal wealth keeps input order.
pub fn group(entries: &[Entry]) -> Vec<Partition> {
    let mut partitions: Vec<Partition> = Vec::new();
    let mut slot_of: HashMap<&str, usize> = HashMap::new();

    for entry in entries {
        let slot = *slot_of.entry(entry.country()).or_insert_with(|| {
            partitions.push(Partition {
                country: entry.country().to_string(),
                entries: Vec::new(),
            });
            partitions.len() - 1
        });
        partitions[slot].entries.push(entry.clone());
    }

    for partition in &mut partitions {
        partition
            .entries
            .sort_by(|a, b| a.wealth().cmp_desc(b.wealth()));
    }

    partitions
}
