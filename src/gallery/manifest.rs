use super::{GalleryError, ManifestEntry, Photo};
use crate::GalleryConfig;
use chrono::Utc;
use tracing::{debug, warn};

/// Load the working set for a client's allowed albums: one manifest fetch per
/// album, merged in album order. An album without a JSON manifest falls back
/// to the legacy flat index; an album found in neither is skipped with a
/// warning rather than failing the whole load.
pub async fn load_working_set(
    config: &GalleryConfig,
    albums: &[String],
) -> Result<Vec<Photo>, GalleryError> {
    let mut photos = Vec::new();
    let mut legacy: Option<Vec<LegacyLine>> = None;

    for album in albums {
        let entries = match load_album_manifest(config, album).await {
            Ok(entries) => entries,
            Err(GalleryError::ManifestMissing(_)) => {
                if legacy.is_none() {
                    legacy = Some(load_legacy_index(config).await);
                }
                let lines = legacy.as_deref().unwrap_or_default();
                let entries = entries_from_legacy(lines, album);
                if entries.is_empty() {
                    warn!("No manifest or legacy entries for album {}", album);
                    continue;
                }
                entries
            }
            Err(e) => return Err(e),
        };

        append_photos(&mut photos, entries, album, &config.unfiled_album);
    }

    debug!("Loaded working set of {} photos", photos.len());
    Ok(photos)
}

/// Rebuild a single photo from its manifest without any session state. Used
/// to serve watermarked previews to visitors who hold no session.
pub async fn load_album_photos(
    config: &GalleryConfig,
    album: &str,
) -> Result<Vec<Photo>, GalleryError> {
    let entries = match load_album_manifest(config, album).await {
        Ok(entries) => entries,
        Err(GalleryError::ManifestMissing(_)) => {
            let lines = load_legacy_index(config).await;
            entries_from_legacy(&lines, album)
        }
        Err(e) => return Err(e),
    };

    let mut photos = Vec::new();
    append_photos(&mut photos, entries, album, &config.unfiled_album);
    Ok(photos)
}

async fn load_album_manifest(
    config: &GalleryConfig,
    album: &str,
) -> Result<Vec<ManifestEntry>, GalleryError> {
    let path = config.manifest_directory.join(format!("{}.json", album));

    let contents = match tokio::fs::read_to_string(&path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GalleryError::ManifestMissing(album.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(serde_json::from_str(&contents)?)
}

fn append_photos(
    photos: &mut Vec<Photo>,
    entries: Vec<ManifestEntry>,
    album: &str,
    unfiled: &str,
) {
    for (index, entry) in entries.into_iter().enumerate() {
        let name = if entry.name.trim().is_empty() {
            format!("foto_{}.jpg", index + 1)
        } else {
            entry.name.trim().to_string()
        };

        let entry_album = entry
            .album
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(album)
            .trim();
        let entry_album = if entry_album.is_empty() {
            unfiled
        } else {
            entry_album
        };

        let date_label = entry
            .date
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| Utc::now().format("%d/%m/%Y").to_string());

        photos.push(Photo {
            id: format!("{}_{}", album, index),
            name,
            album: entry_album.to_string(),
            thumbnail_url: entry.thumbnail.unwrap_or_else(|| entry.url.clone()),
            preview_url: entry.url.clone(),
            url: entry.url,
            date_label,
            description: entry.description,
            ingest_index: photos.len(),
        });
    }
}

struct LegacyLine {
    album: String,
    file: String,
    url: String,
}

/// The legacy index is a flat text file of `album|file|url` lines. Malformed
/// lines are skipped.
fn parse_legacy_index(contents: &str) -> Vec<LegacyLine> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut parts = line.splitn(3, '|');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(album), Some(file), Some(url)) => Some(LegacyLine {
                    album: album.trim().to_string(),
                    file: file.trim().to_string(),
                    url: url.trim().to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

async fn load_legacy_index(config: &GalleryConfig) -> Vec<LegacyLine> {
    let Some(path) = &config.legacy_index else {
        return Vec::new();
    };

    match tokio::fs::read_to_string(path).await {
        Ok(contents) => parse_legacy_index(&contents),
        Err(e) => {
            debug!("No legacy index at {:?}: {}", path, e);
            Vec::new()
        }
    }
}

fn entries_from_legacy(lines: &[LegacyLine], album: &str) -> Vec<ManifestEntry> {
    lines
        .iter()
        .filter(|line| line.album == album)
        .map(|line| ManifestEntry {
            name: line.file.clone(),
            url: line.url.clone(),
            thumbnail: None,
            album: Some(line.album.clone()),
            description: None,
            date: None,
        })
        .collect()
}
