//! Snapshot model
//!
//! A monthly snapshot is one month's ranked list of top artists. The
//! allocator consumes plain snapshots and emits colored ones; label and
//! timestamp fields are carried through untouched.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::palette::Color;

/// Rejections raised at the boundary before a history reaches the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// An artist entry has an empty name
    #[error("Artist at rank {rank} in {month_key} has no name")]
    MissingArtistName { month_key: String, rank: u32 },

    /// The same artist name appears twice in one snapshot
    #[error("Artist '{name}' appears more than once in {month_key}")]
    DuplicateArtist { month_key: String, name: String },

    /// Two snapshots share a month key
    #[error("Month {month_key} appears more than once")]
    DuplicateMonth { month_key: String },

    /// Month keys are not ascending
    #[error("Snapshots out of order: {next} follows {previous}")]
    OutOfOrder { previous: String, next: String },
}

/// One artist's entry in a monthly chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRecord {
    /// Identity key; compared by exact string equality.
    pub name: String,
    pub playcount: u64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// 1-based chart position.
    pub rank: u32,
}

impl ArtistRecord {
    pub fn new(name: impl Into<String>, playcount: u64, rank: u32) -> Self {
        Self {
            name: name.into(),
            playcount,
            image_url: None,
            url: None,
            rank,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// One month's top artists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySnapshot {
    /// `YYYY-MM`; lexicographic order is chronological order.
    pub month_key: String,
    pub month_label: String,
    pub generated_at: String,
    pub artists: Vec<ArtistRecord>,
}

impl MonthlySnapshot {
    pub fn new(
        month_key: impl Into<String>,
        month_label: impl Into<String>,
        generated_at: impl Into<String>,
        artists: Vec<ArtistRecord>,
    ) -> Self {
        Self {
            month_key: month_key.into(),
            month_label: month_label.into(),
            generated_at: generated_at.into(),
            artists,
        }
    }

    /// Artist names in chart order.
    pub fn artist_names(&self) -> impl Iterator<Item = &str> {
        self.artists.iter().map(|a| a.name.as_str())
    }
}

/// An artist record annotated with its resolved color.
///
/// Serializes flat: `{"name", "playcount", "image_url", "url", "rank", "color"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColoredArtist {
    #[serde(flatten)]
    pub artist: ArtistRecord,
    pub color: Color,
}

/// A monthly snapshot whose artists all carry a color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColoredSnapshot {
    pub month_key: String,
    pub month_label: String,
    pub generated_at: String,
    pub artists: Vec<ColoredArtist>,
}

impl ColoredSnapshot {
    /// Color of the named artist in this snapshot, if present.
    pub fn color_of(&self, name: &str) -> Option<&Color> {
        self.artists
            .iter()
            .find(|a| a.artist.name == name)
            .map(|a| &a.color)
    }
}

/// Check a history before it is handed to the allocator.
///
/// Month keys must be strictly ascending and every snapshot must hold
/// distinct, non-empty artist names.
pub fn validate_history(snapshots: &[MonthlySnapshot]) -> Result<(), SnapshotError> {
    let mut previous: Option<&str> = None;

    for snapshot in snapshots {
        if let Some(prev) = previous {
            if prev == snapshot.month_key {
                return Err(SnapshotError::DuplicateMonth {
                    month_key: snapshot.month_key.clone(),
                });
            }
            if prev > snapshot.month_key.as_str() {
                return Err(SnapshotError::OutOfOrder {
                    previous: prev.to_string(),
                    next: snapshot.month_key.clone(),
                });
            }
        }
        previous = Some(&snapshot.month_key);

        let mut seen = HashSet::new();
        for artist in &snapshot.artists {
            if artist.name.is_empty() {
                return Err(SnapshotError::MissingArtistName {
                    month_key: snapshot.month_key.clone(),
                    rank: artist.rank,
                });
            }
            if !seen.insert(artist.name.as_str()) {
                return Err(SnapshotError::DuplicateArtist {
                    month_key: snapshot.month_key.clone(),
                    name: artist.name.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(key: &str, names: &[&str]) -> MonthlySnapshot {
        let artists = names
            .iter()
            .enumerate()
            .map(|(i, n)| ArtistRecord::new(*n, 10, i as u32 + 1))
            .collect();
        MonthlySnapshot::new(key, "Label", "2024-02-15T12:00:00+00:00", artists)
    }

    #[test]
    fn test_validate_accepts_ordered_history() {
        let history = vec![month("2024-01", &["A", "B"]), month("2024-02", &["B", "C"])];
        assert!(validate_history(&history).is_ok());
        assert!(validate_history(&[]).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_name() {
        let history = vec![month("2024-01", &["A", ""])];
        assert_eq!(
            validate_history(&history),
            Err(SnapshotError::MissingArtistName {
                month_key: "2024-01".into(),
                rank: 2,
            })
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_artist() {
        let history = vec![month("2024-01", &["A", "B", "A"])];
        assert!(matches!(
            validate_history(&history),
            Err(SnapshotError::DuplicateArtist { name, .. }) if name == "A"
        ));
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let history = vec![month("2024-01", &["abba", "ABBA"])];
        assert!(validate_history(&history).is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_order_months() {
        let history = vec![month("2024-03", &["A"]), month("2024-02", &["A"])];
        assert_eq!(
            validate_history(&history),
            Err(SnapshotError::OutOfOrder {
                previous: "2024-03".into(),
                next: "2024-02".into(),
            })
        );

        let history = vec![month("2024-03", &["A"]), month("2024-03", &["B"])];
        assert!(matches!(
            validate_history(&history),
            Err(SnapshotError::DuplicateMonth { .. })
        ));
    }

    #[test]
    fn test_colored_artist_serializes_flat() {
        let colored = ColoredArtist {
            artist: ArtistRecord::new("Test Artist", 42, 1).with_url("https://example.com"),
            color: Color::new("#636EFA"),
        };

        let value = serde_json::to_value(&colored).unwrap();
        assert_eq!(value["name"], "Test Artist");
        assert_eq!(value["playcount"], 42);
        assert_eq!(value["url"], "https://example.com");
        assert!(value["image_url"].is_null());
        assert_eq!(value["rank"], 1);
        assert_eq!(value["color"], "#636EFA");

        let back: ColoredArtist = serde_json::from_value(value).unwrap();
        assert_eq!(back, colored);
    }
}
