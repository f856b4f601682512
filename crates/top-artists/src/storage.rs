//! CSV-backed listening history.
//!
//! One row per artist per month. Saving a month replaces every row that month
//! had before, then rewrites the whole file in chronological order.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use continuity::{validate_history, ArtistRecord, MonthlySnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Column order of the history file.
pub const CSV_HEADERS: [&str; 8] = [
    "month_key",
    "month_label",
    "generated_at",
    "artist_name",
    "playcount",
    "image_url",
    "url",
    "rank",
];

#[derive(Debug, Serialize, Deserialize)]
struct HistoryRow {
    month_key: String,
    month_label: String,
    generated_at: String,
    artist_name: String,
    playcount: u64,
    image_url: Option<String>,
    url: Option<String>,
    rank: u32,
}

/// Month key → snapshot, iterated in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    months: BTreeMap<String, MonthlySnapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a month, returning the replaced snapshot.
    pub fn insert(&mut self, snapshot: MonthlySnapshot) -> Option<MonthlySnapshot> {
        self.months.insert(snapshot.month_key.clone(), snapshot)
    }

    pub fn get(&self, month_key: &str) -> Option<&MonthlySnapshot> {
        self.months.get(month_key)
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonthlySnapshot> {
        self.months.values()
    }

    /// Chronological copy of every snapshot.
    pub fn snapshots(&self) -> Vec<MonthlySnapshot> {
        self.months.values().cloned().collect()
    }
}

impl FromIterator<MonthlySnapshot> for History {
    fn from_iter<T: IntoIterator<Item = MonthlySnapshot>>(iter: T) -> Self {
        let mut history = Self::new();
        for snapshot in iter {
            history.insert(snapshot);
        }
        history
    }
}

/// Reads and writes the history CSV at a fixed path.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved history; a missing file is an empty history.
    pub fn load(&self) -> Result<History> {
        if !self.path.exists() {
            return Ok(History::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open history {}", self.path.display()))?;

        let mut history = History::new();
        for (line, row) in reader.deserialize::<HistoryRow>().enumerate() {
            let row = row.with_context(|| {
                format!("Malformed row {} in {}", line + 2, self.path.display())
            })?;

            let snapshot = history
                .months
                .entry(row.month_key.clone())
                .or_insert_with(|| {
                    MonthlySnapshot::new(
                        row.month_key.clone(),
                        row.month_label.clone(),
                        row.generated_at.clone(),
                        Vec::new(),
                    )
                });

            snapshot.artists.push(ArtistRecord {
                name: row.artist_name,
                playcount: row.playcount,
                image_url: row.image_url.filter(|s| !s.is_empty()),
                url: row.url.filter(|s| !s.is_empty()),
                rank: row.rank,
            });
        }

        debug!(months = history.len(), path = %self.path.display(), "Loaded history");
        Ok(history)
    }

    /// Merge `snapshot` into the saved history and persist it.
    ///
    /// An invalid snapshot is rejected before the file is touched.
    pub fn save(&self, snapshot: &MonthlySnapshot) -> Result<History> {
        validate_history(std::slice::from_ref(snapshot))
            .with_context(|| format!("Refusing to save month {}", snapshot.month_key))?;

        let mut history = self.load()?;
        if history.insert(snapshot.clone()).is_some() {
            info!(month = %snapshot.month_key, "Replacing existing month in history");
        }
        self.write(&history)?;
        Ok(history)
    }

    fn write(&self, history: &History) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
            .with_context(|| format!("Failed to create history {}", self.path.display()))?;
        writer.write_record(CSV_HEADERS)?;

        let mut rows = 0usize;
        for snapshot in history.iter() {
            let mut artists: Vec<&ArtistRecord> = snapshot.artists.iter().collect();
            artists.sort_by_key(|a| (a.rank, Reverse(a.playcount)));

            for artist in artists {
                writer.serialize(HistoryRow {
                    month_key: snapshot.month_key.clone(),
                    month_label: snapshot.month_label.clone(),
                    generated_at: snapshot.generated_at.clone(),
                    artist_name: artist.name.clone(),
                    playcount: artist.playcount,
                    image_url: artist.image_url.clone(),
                    url: artist.url.clone(),
                    rank: artist.rank,
                })?;
                rows += 1;
            }
        }
        writer.flush()?;

        info!(months = history.len(), rows, path = %self.path.display(), "Wrote history");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn snapshot(month: &str, playcount: u64) -> MonthlySnapshot {
        MonthlySnapshot::new(
            month,
            "Label",
            format!("{month}-15T12:00:00+00:00"),
            vec![ArtistRecord::new("Test Artist", playcount, 1)
                .with_image_url("https://example.com/img.png")
                .with_url("https://example.com")],
        )
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nope.csv"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_data_overwrites_existing_month() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv"));

        store.save(&snapshot("2024-02", 10)).unwrap();
        let history = store.save(&snapshot("2024-02", 55)).unwrap();

        assert!(store.path().exists());
        assert_eq!(history.len(), 1);
        assert_eq!(history.get("2024-02").unwrap().artists[0].playcount, 55);
        assert_eq!(store.load().unwrap(), history);
    }

    #[test]
    fn test_months_are_kept_in_chronological_order() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nested/dir/history.csv"));

        store.save(&snapshot("2024-03", 1)).unwrap();
        store.save(&snapshot("2023-11", 2)).unwrap();
        let history = store.save(&snapshot("2024-01", 3)).unwrap();

        let keys: Vec<&str> = history.iter().map(|s| s.month_key.as_str()).collect();
        assert_eq!(keys, vec!["2023-11", "2024-01", "2024-03"]);

        let text = fs::read_to_string(store.path()).unwrap();
        let first_column: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(first_column, vec!["2023-11", "2024-01", "2024-03"]);
    }

    #[test]
    fn test_load_restores_rank_order_and_optional_fields() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv"));

        let month = MonthlySnapshot::new(
            "2024-02",
            "February 2024",
            "2024-02-15T12:00:00+00:00",
            vec![
                ArtistRecord::new("Second, with comma", 5, 2),
                ArtistRecord::new("First", 9, 1).with_url("https://example.com/first"),
            ],
        );
        store.save(&month).unwrap();

        let loaded = store.load().unwrap();
        let artists = &loaded.get("2024-02").unwrap().artists;
        assert_eq!(artists[0].name, "First");
        assert_eq!(artists[0].url.as_deref(), Some("https://example.com/first"));
        assert_eq!(artists[1].name, "Second, with comma");
        assert!(artists[1].url.is_none());
        assert!(artists[1].image_url.is_none());
    }

    #[test]
    fn test_invalid_month_is_not_saved() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv"));
        store.save(&snapshot("2024-02", 10)).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let bad = MonthlySnapshot::new(
            "2024-03",
            "March 2024",
            "2024-03-15T12:00:00+00:00",
            vec![
                ArtistRecord::new("Artist 2", 9, 1),
                ArtistRecord::new("Artist 2", 4, 2),
            ],
        );
        assert!(store.save(&bad).is_err());

        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
        let history = store.save(&snapshot("2024-04", 3)).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.get("2024-03").is_none());
    }

    #[test]
    fn test_empty_history_still_writes_header() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv"));
        store.write(&History::new()).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.trim_end(), CSV_HEADERS.join(","));
    }
}
