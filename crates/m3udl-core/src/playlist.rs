//! Extended M3U playlist parsing and search.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// One playable entry from the playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub tvg_id: String,
    pub tvg_name: String,
    pub url: String,
    /// Remote size from a pre-flight probe, when known.
    pub size: Option<u64>,
}

impl PlaylistEntry {
    /// `tvg-id` if present, otherwise `tvg-name`.
    pub fn display_label(&self) -> &str {
        if self.tvg_id.is_empty() {
            &self.tvg_name
        } else {
            &self.tvg_id
        }
    }
}

struct Patterns {
    tvg_id: Regex,
    tvg_name: Regex,
    vod_url: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            tvg_id: Regex::new(r#"tvg-id="([^"]*)""#)?,
            tvg_name: Regex::new(r#"tvg-name="([^"]*)""#)?,
            vod_url: Regex::new(r"\.[a-zA-Z0-9]{2,4}(\?.*)?$")?,
        })
    }
}

fn patterns() -> Result<&'static Patterns> {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    if let Some(p) = PATTERNS.get() {
        return Ok(p);
    }
    let compiled = Patterns::compile().context("invalid playlist pattern")?;
    Ok(PATTERNS.get_or_init(|| compiled))
}

/// Parses playlist text. Entries with neither `tvg-id` nor a name are dropped.
pub fn parse_m3u(text: &str) -> Result<Vec<PlaylistEntry>> {
    let patterns = patterns()?;
    let mut entries = Vec::new();
    let mut pending: Option<(String, String)> = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(info) = line.strip_prefix("#EXTINF:") {
            let tvg_id = patterns
                .tvg_id
                .captures(info)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            let tvg_name = match patterns.tvg_name.captures(info) {
                Some(c) => c[1].to_string(),
                None => info
                    .rsplit_once(',')
                    .map(|(_, title)| title.to_string())
                    .unwrap_or_default(),
            };
            pending = Some((tvg_id, tvg_name));
        } else if !line.is_empty() && !line.starts_with('#') {
            let (tvg_id, tvg_name) = pending.take().unwrap_or_default();
            if !tvg_id.is_empty() || !tvg_name.is_empty() {
                entries.push(PlaylistEntry {
                    tvg_id,
                    tvg_name,
                    url: line.to_string(),
                    size: None,
                });
            }
        }
    }
    Ok(entries)
}

/// Reads and parses the playlist at `path`.
pub fn load_m3u(path: &Path) -> Result<Vec<PlaylistEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read playlist: {}", path.display()))?;
    let entries = parse_m3u(&text)?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "parsed playlist");
    Ok(entries)
}

/// Case-insensitive match on id or name, keeping only URLs that end in a
/// file extension (live streams usually don't).
pub fn search(entries: &[PlaylistEntry], query: &str) -> Result<Vec<PlaylistEntry>> {
    let vod_url = &patterns()?.vod_url;
    let query = query.to_lowercase();
    Ok(entries
        .iter()
        .filter(|e| {
            e.tvg_id.to_lowercase().contains(&query) || e.tvg_name.to_lowercase().contains(&query)
        })
        .filter(|e| vod_url.is_match(&e.url))
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"#EXTM3U
#EXTINF:-1 tvg-id="news.hd" tvg-name="News HD" group-title="News",News HD
http://example.com/live/news
#EXTINF:-1 tvg-id="" tvg-name="The Movie (2020)",The Movie (2020)
http://example.com/movie/the-movie.mp4
#EXTINF:-1,Plain Title
http://example.com/series/ep1.mkv?token=abc

#EXTINF:-1 tvg-id="",
http://example.com/nameless.mp4
"#;

    #[test]
    fn parses_ids_names_and_fallback_titles() {
        let entries = parse_m3u(SAMPLE).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].tvg_id, "news.hd");
        assert_eq!(entries[0].tvg_name, "News HD");
        assert_eq!(entries[1].display_label(), "The Movie (2020)");
        assert_eq!(entries[2].tvg_name, "Plain Title");
        assert_eq!(entries[2].url, "http://example.com/series/ep1.mkv?token=abc");
    }

    #[test]
    fn search_is_case_insensitive_and_skips_live_streams() {
        let entries = parse_m3u(SAMPLE).unwrap();
        let hits = search(&entries, "NEWS").unwrap();
        assert!(hits.is_empty(), "live stream without extension is filtered");

        let hits = search(&entries, "movie").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "http://example.com/movie/the-movie.mp4");

        let hits = search(&entries, "plain").unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_m3u(&dir.path().join("nope.m3u")).is_err());
    }
}
