//! Color continuity allocator
//!
//! Walks a chronological history once and gives every artist a color:
//!
//! 1. Artists that left since the previous snapshot release their color into
//!    the free pool and lose their ledger entry.
//! 2. Artists still charting keep the color they already hold.
//! 3. Newcomers take, in order of preference: their ledger color if nobody
//!    holds it, a free-pool color picked by a stable hash of their name, or
//!    the next fresh palette color.
//!
//! When the fresh palette runs dry it is refilled with every default color
//! not in use. If every color is in use (more active artists than palette
//! entries) the whole default palette is refilled and colors repeat.
//!
//! Seed ledger colors are held out of the fresh palette before the first
//! snapshot is processed, even for artists that never show up in this run.
//! Earlier output depends on that, so it stays.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::ledger::ColorLedger;
use crate::palette::{Color, Palette};
use crate::snapshot::{ColoredArtist, ColoredSnapshot, MonthlySnapshot};

/// Where a newcomer's color came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorSource {
    Ledger,
    FreePool,
    Palette,
}

/// Colored history plus the ledger state after the last snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub snapshots: Vec<ColoredSnapshot>,
    pub ledger: ColorLedger,
}

/// Working state for one forward pass over a history.
///
/// Owned by a single call; nothing here outlives the pass except the ledger
/// handed back by [`ColorAllocator::into_ledger`].
#[derive(Debug)]
pub struct ColorAllocator<'p> {
    default_palette: &'p Palette,
    /// Fresh colors, drawn from the front.
    palette: VecDeque<Color>,
    /// Colors vacated by departed artists.
    free_pool: Vec<Color>,
    ledger: ColorLedger,
    /// Artists in the current snapshot, in activation order.
    active: IndexMap<String, Color>,
    in_use: HashSet<Color>,
}

impl<'p> ColorAllocator<'p> {
    pub fn new(default_palette: &'p Palette, seed: &ColorLedger) -> Self {
        let palette = default_palette
            .colors()
            .iter()
            .filter(|color| !seed.claims(color))
            .cloned()
            .collect();

        Self {
            default_palette,
            palette,
            free_pool: Vec::new(),
            ledger: seed.clone(),
            active: IndexMap::new(),
            in_use: HashSet::new(),
        }
    }

    /// Color one snapshot. Snapshots must be fed in chronological order.
    pub fn allocate(&mut self, snapshot: &MonthlySnapshot) -> ColoredSnapshot {
        self.release_departed(snapshot);

        let mut artists = Vec::with_capacity(snapshot.artists.len());
        for artist in &snapshot.artists {
            let color = match self.active.get(&artist.name) {
                Some(color) => color.clone(),
                None => {
                    let color = self.assign_color(&artist.name);
                    self.active.insert(artist.name.clone(), color.clone());
                    self.ledger.insert(artist.name.clone(), color.clone());
                    self.in_use.insert(color.clone());
                    color
                }
            };

            artists.push(ColoredArtist {
                artist: artist.clone(),
                color,
            });
        }

        ColoredSnapshot {
            month_key: snapshot.month_key.clone(),
            month_label: snapshot.month_label.clone(),
            generated_at: snapshot.generated_at.clone(),
            artists,
        }
    }

    /// Color a whole history and return the final ledger alongside it.
    pub fn assign_all(mut self, snapshots: &[MonthlySnapshot]) -> Allocation {
        let snapshots = snapshots.iter().map(|s| self.allocate(s)).collect();
        Allocation {
            snapshots,
            ledger: self.into_ledger(),
        }
    }

    pub fn into_ledger(self) -> ColorLedger {
        self.ledger
    }

    fn release_departed(&mut self, snapshot: &MonthlySnapshot) {
        let current: HashSet<&str> = snapshot.artist_names().collect();
        let departed: Vec<String> = self
            .active
            .keys()
            .filter(|name| !current.contains(name.as_str()))
            .cloned()
            .collect();

        for name in departed {
            if let Some(color) = self.active.shift_remove(&name) {
                debug!(artist = %name, %color, month = %snapshot.month_key, "Released color");
                self.in_use.remove(&color);
                self.free_pool.push(color);
                self.ledger.remove(&name);
            }
        }
    }

    fn assign_color(&mut self, name: &str) -> Color {
        let (color, source) = self.pick_color(name);
        debug!(artist = %name, %color, source = ?source, "Assigned color");
        color
    }

    fn pick_color(&mut self, name: &str) -> (Color, ColorSource) {
        if let Some(preferred) = self.ledger.get(name).cloned() {
            if !self.in_use.contains(&preferred) {
                if let Some(pos) = self.free_pool.iter().position(|c| *c == preferred) {
                    self.free_pool.remove(pos);
                } else if let Some(pos) = self.palette.iter().position(|c| *c == preferred) {
                    self.palette.remove(pos);
                }
                return (preferred, ColorSource::Ledger);
            }
        }

        if !self.free_pool.is_empty() {
            let idx = free_pool_index(name, self.free_pool.len());
            return (self.free_pool.remove(idx), ColorSource::FreePool);
        }

        if self.palette.is_empty() {
            self.replenish();
        }

        let color = self
            .palette
            .pop_front()
            .unwrap_or_else(|| self.default_palette.colors()[0].clone());
        (color, ColorSource::Palette)
    }

    fn replenish(&mut self) {
        self.palette = self
            .default_palette
            .colors()
            .iter()
            .filter(|color| !self.in_use.contains(*color))
            .cloned()
            .collect();

        if self.palette.is_empty() {
            warn!(
                active = self.active.len(),
                palette = self.default_palette.len(),
                "More active artists than palette colors; colors will repeat"
            );
            self.palette = self.default_palette.colors().iter().cloned().collect();
        } else {
            debug!(available = self.palette.len(), "Replenished palette");
        }
    }
}

/// Free-pool slot for `name`.
///
/// The first eight bytes of the BLAKE3 digest of the UTF-8 name, read as a
/// little-endian `u64`, modulo `len`. Stable across processes and platforms.
fn free_pool_index(name: &str, len: usize) -> usize {
    let digest = blake3::hash(name.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    (u64::from_le_bytes(prefix) % len as u64) as usize
}

/// Color a chronological history with the default palette.
pub fn assign_colors(snapshots: &[MonthlySnapshot], seed: &ColorLedger) -> Vec<ColoredSnapshot> {
    let palette = Palette::default();
    ColorAllocator::new(&palette, seed)
        .assign_all(snapshots)
        .snapshots
}
