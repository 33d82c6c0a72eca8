//! Local file naming for playlist entries.

use std::path::Path;

use crate::playlist::PlaylistEntry;
use crate::task::DownloadTask;

/// Replaces characters that are invalid in file names (`\ / * ? : " < > |`
/// and control characters) with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// File extension (with the dot) at the end of the URL, ignoring any query
/// string. Only 2 to 4 ASCII alphanumerics count as an extension.
pub fn url_extension(url: &str) -> Option<String> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };
    let (stem, ext) = path.rsplit_once('.')?;
    if stem.is_empty() || stem.ends_with('/') {
        return None;
    }
    let valid = (2..=4).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| format!(".{ext}"))
}

/// Builds one task per entry, ids starting at 1 in selection order.
///
/// A single entry is saved as `<label><ext>`; several entries get a
/// `_<n>` suffix so identically named channels don't collide.
pub fn plan_tasks(entries: &[PlaylistEntry], dest_dir: &Path, staging_dir: &Path) -> Vec<DownloadTask> {
    let numbered = entries.len() > 1;
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let base = sanitize_filename(entry.display_label());
            let ext = url_extension(&entry.url).unwrap_or_default();
            let file_name = if numbered {
                format!("{}_{}{}", base, i + 1, ext)
            } else {
                format!("{base}{ext}")
            };
            DownloadTask::new(
                (i + 1) as u64,
                entry.url.clone(),
                dest_dir.join(file_name),
                staging_dir,
            )
        })
        .collect()
}
