//! Color ledger: each artist's last-known color.
//!
//! The ledger is a preference hint carried between runs. The allocator
//! honors an entry only while the color is free; it never reserves it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::palette::Color;
use crate::snapshot::ColoredSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorLedger {
    entries: BTreeMap<String, Color>,
}

impl ColorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ledger from previously rendered output.
    ///
    /// Snapshots are read in order, so an artist's last appearance wins.
    pub fn from_colored(snapshots: &[ColoredSnapshot]) -> Self {
        snapshots
            .iter()
            .flat_map(|s| s.artists.iter())
            .map(|a| (a.artist.name.clone(), a.color.clone()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Color> {
        self.entries.get(name)
    }

    /// Record `color` for `name`; empty color tokens are ignored.
    pub fn insert(&mut self, name: impl Into<String>, color: Color) {
        if color.is_empty() {
            return;
        }
        self.entries.insert(name.into(), color);
    }

    pub fn remove(&mut self, name: &str) -> Option<Color> {
        self.entries.remove(name)
    }

    /// Whether any artist currently lays claim to `color`.
    pub fn claims(&self, color: &Color) -> bool {
        self.entries.values().any(|c| c == color)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Color)> {
        self.entries.iter().map(|(name, color)| (name.as_str(), color))
    }
}

impl<N: Into<String>> FromIterator<(N, Color)> for ColorLedger {
    fn from_iter<T: IntoIterator<Item = (N, Color)>>(iter: T) -> Self {
        let mut ledger = Self::new();
        for (name, color) in iter {
            ledger.insert(name, color);
        }
        ledger
    }
}
