//! Static site output: `index.html` and `history.json`.
//!
//! The previous `history.json` seeds the color ledger, so an artist keeps
//! its color from one run to the next.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use continuity::{
    validate_history, Color, ColorAllocator, ColorLedger, ColoredSnapshot, Palette,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::storage::History;

pub const INDEX_HTML: &str = "index.html";
pub const HISTORY_JSON: &str = "history.json";

const TEMPLATE: &str = include_str!("../templates/index.html");
const SNAPSHOTS_PLACEHOLDER: &str = "__SNAPSHOTS_JSON__";
const HAS_DATA_PLACEHOLDER: &str = "__HAS_DATA__";

/// Lenient view of a previously written `history.json`.
#[derive(Debug, Deserialize)]
struct SeedSnapshot {
    #[serde(default)]
    artists: Vec<SeedArtist>,
}

#[derive(Debug, Deserialize)]
struct SeedArtist {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    color: Option<String>,
}

/// Color the history and write the site into `output_dir`.
///
/// Returns the path of the written `index.html`.
pub fn update_ui(history: &History, output_dir: &Path, palette: &Palette) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let json_path = output_dir.join(HISTORY_JSON);
    let seed = load_existing_colors(&json_path);

    let snapshots = history.snapshots();
    validate_history(&snapshots).context("Refusing to render an invalid history")?;

    let allocation = ColorAllocator::new(palette, &seed).assign_all(&snapshots);
    info!(
        months = allocation.snapshots.len(),
        seeded = seed.len(),
        artists = allocation.ledger.len(),
        "Assigned artist colors"
    );

    let html_path = output_dir.join(INDEX_HTML);
    fs::write(&html_path, render_html(&allocation.snapshots)?)
        .with_context(|| format!("Failed to write {}", html_path.display()))?;

    let json = serde_json::to_string_pretty(&allocation.snapshots)?;
    fs::write(&json_path, json)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;

    info!(html = %html_path.display(), json = %json_path.display(), "Site updated");
    Ok(html_path)
}

/// Read artist colors from an earlier `history.json`.
///
/// A missing, unreadable or malformed file yields an empty ledger.
pub fn load_existing_colors(path: &Path) -> ColorLedger {
    if !path.exists() {
        return ColorLedger::new();
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), "Could not read previous colors: {e}");
            return ColorLedger::new();
        }
    };

    match serde_json::from_str::<Vec<SeedSnapshot>>(&content) {
        Ok(snapshots) => snapshots
            .into_iter()
            .flat_map(|s| s.artists)
            .filter_map(|a| match (a.name, a.color) {
                (Some(name), Some(color)) if !name.is_empty() => Some((name, Color::from(color))),
                _ => None,
            })
            .collect(),
        Err(e) => {
            warn!(path = %path.display(), "Ignoring malformed previous colors: {e}");
            ColorLedger::new()
        }
    }
}

/// Fill the page template with the colored snapshots.
pub fn render_html(snapshots: &[ColoredSnapshot]) -> Result<String> {
    // `</` would close the surrounding <script> element
    let data = serde_json::to_string(snapshots)?.replace("</", "<\\/");
    let has_data = if snapshots.is_empty() { "false" } else { "true" };

    Ok(TEMPLATE
        .replace(SNAPSHOTS_PLACEHOLDER, &data)
        .replace(HAS_DATA_PLACEHOLDER, has_data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use continuity::{ArtistRecord, MonthlySnapshot};
    use tempfile::tempdir;

    fn month(key: &str, names: &[&str]) -> MonthlySnapshot {
        let artists = names
            .iter()
            .enumerate()
            .map(|(i, n)| ArtistRecord::new(*n, 10, i as u32 + 1))
            .collect();
        MonthlySnapshot::new(key, "Label", "2024-02-15T12:00:00+00:00", artists)
    }

    fn history_of(months: Vec<MonthlySnapshot>) -> History {
        months.into_iter().collect()
    }

    fn written_colors(dir: &Path) -> Vec<ColoredSnapshot> {
        let text = fs::read_to_string(dir.join(HISTORY_JSON)).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_update_ui_builds_html() {
        let dir = tempdir().unwrap();
        let history = history_of(vec![month("2024-02", &["Test Artist"])]);

        let html_path = update_ui(&history, dir.path(), &Palette::default()).unwrap();
        let html = fs::read_to_string(&html_path).unwrap();

        assert!(html_path.exists());
        assert!(html.contains("Monthly Top Artists"));
        assert!(html.contains("Test Artist"));
        assert!(html.contains("const hasData = true;"));
        assert!(!html.contains(SNAPSHOTS_PLACEHOLDER));
        assert!(dir.path().join(HISTORY_JSON).exists());
    }

    #[test]
    fn test_colors_survive_between_runs() {
        let dir = tempdir().unwrap();
        let palette = Palette::default();

        let base = history_of(vec![month("2024-02", &["Alpha", "Gamma"])]);
        update_ui(&base, dir.path(), &palette).unwrap();
        let first = written_colors(dir.path());

        let rerun = history_of(vec![month("2024-02", &["Beta", "Alpha", "Gamma"])]);
        update_ui(&rerun, dir.path(), &palette).unwrap();
        let second = written_colors(dir.path());

        assert_eq!(second[0].color_of("Alpha"), first[0].color_of("Alpha"));
        assert_eq!(second[0].color_of("Gamma"), first[0].color_of("Gamma"));
        assert_eq!(second[0].color_of("Beta"), Some(&palette.colors()[2]));
    }

    #[test]
    fn test_load_existing_colors_is_lenient() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(HISTORY_JSON);

        assert!(load_existing_colors(&path).is_empty());

        fs::write(&path, "{ not json").unwrap();
        assert!(load_existing_colors(&path).is_empty());

        fs::write(
            &path,
            r#"[
                {"artists": [{"name": "A", "color": "red"}, {"name": "B"}, {"color": "blue"}]},
                {"month_key": "2024-03"},
                {"artists": [{"name": "A", "color": "green"}, {"name": "", "color": "pink"}]}
            ]"#,
        )
        .unwrap();
        let ledger = load_existing_colors(&path);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get("A"), Some(&Color::new("green")));
    }

    #[test]
    fn test_render_html_without_data() {
        let html = render_html(&[]).unwrap();
        assert!(html.contains("const snapshots = [];"));
        assert!(html.contains("const hasData = false;"));
    }

    #[test]
    fn test_render_html_escapes_script_close() {
        let dir = tempdir().unwrap();
        let history = history_of(vec![month("2024-02", &["</script><b>"])]);
        let html_path = update_ui(&history, dir.path(), &Palette::default()).unwrap();

        let html = fs::read_to_string(html_path).unwrap();
        assert!(html.contains(r"<\/script><b>"));
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn test_invalid_history_is_rejected() {
        let dir = tempdir().unwrap();
        let history = history_of(vec![month("2024-02", &["A", "A"])]);
        assert!(update_ui(&history, dir.path(), &Palette::default()).is_err());
    }
}
