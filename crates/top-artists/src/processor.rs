//! Turn a raw Last.fm payload into a normalized monthly snapshot.

use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use continuity::{ArtistRecord, MonthlySnapshot};
use serde_json::Value;
use tracing::warn;

use crate::lastfm::{RawArtist, TopArtistsResponse};

/// Chart depth kept per month.
pub const MAX_ARTISTS: usize = 15;

/// Build the snapshot for the month containing `run_timestamp`.
///
/// Keeps the first [`MAX_ARTISTS`] entries, ranks them by position, names
/// unnamed entries `Artist {rank}` and treats unreadable playcounts as zero.
/// A name already taken by a higher-ranked entry is dropped, so a placeholder
/// can never collide with a real artist of the same name.
pub fn process_data(payload: &TopArtistsResponse, run_timestamp: DateTime<Utc>) -> MonthlySnapshot {
    let month_key = run_timestamp.format("%Y-%m").to_string();

    let mut seen = HashSet::new();
    let mut artists: Vec<ArtistRecord> = Vec::new();
    for (raw, rank) in payload.topartists.artist.iter().take(MAX_ARTISTS).zip(1u32..) {
        let artist = normalize_artist(raw, rank);
        if !seen.insert(artist.name.clone()) {
            warn!(month = %month_key, artist = %artist.name, rank, "Dropping duplicate artist");
            continue;
        }
        artists.push(artist);
    }

    // Deterministic order for storage and allocation
    artists.sort_by_key(|a| (a.rank, Reverse(a.playcount), a.name.to_lowercase()));

    MonthlySnapshot::new(
        month_key,
        run_timestamp.format("%B %Y").to_string(),
        run_timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, false),
        artists,
    )
}

fn normalize_artist(raw: &RawArtist, rank: u32) -> ArtistRecord {
    let name = raw
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Artist {rank}"));

    ArtistRecord {
        name,
        playcount: coerce_playcount(raw.playcount.as_ref()),
        image_url: None,
        url: raw.url.clone(),
        rank,
    }
}

/// Playcounts arrive as decimal strings or numbers; anything else counts as 0.
fn coerce_playcount(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|v| v.max(0) as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(|v| v.max(0) as u64)
            .unwrap_or(0),
        _ => 0,
    }
}
