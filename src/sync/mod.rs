// Drive sync - walks a cloud-drive album tree and writes per-album manifests
mod config;
mod drive;
mod error;


pub use config::{SyncConfig, ThumbnailRule};
pub use drive::{DriveClient, DriveFile};
pub use error::SyncError;

use crate::gallery::ManifestEntry;
use std::path::Path;
use tracing::{info, warn};

/// Run a full sync: every child folder of the configured root becomes one
/// album manifest. A folder that fails is logged and skipped; only config
/// and root-level failures abort the run.
pub async fn run(config_path: &Path) -> Result<(), SyncError> {
    let config = SyncConfig::load(config_path).await?;
    let root_id = config
        .root_folder_id
        .clone()
        .ok_or(SyncError::MissingRootFolder)?;

    let client = DriveClient::new(&config)?;
    if !client.has_credentials() {
        warn!("No credentials in the sync config; only public folders will list");
    }

    tokio::fs::create_dir_all(&config.dest).await?;

    let folders = client.list_folders(&root_id).await?;
    if folders.is_empty() {
        info!("No albums found under the configured root folder");
        return Ok(());
    }

    for folder in &folders {
        match sync_album(&client, &config, folder).await {
            Ok(0) => info!("Album \"{}\" has no images, skipping", folder.name),
            Ok(count) => info!("Album \"{}\" synced with {} photos", folder.name, count),
            Err(e) => warn!("Album \"{}\" failed, skipping: {}", folder.name, e),
        }
    }

    Ok(())
}

async fn sync_album(
    client: &DriveClient,
    config: &SyncConfig,
    folder: &DriveFile,
) -> Result<usize, SyncError> {
    let photos = client.list_photos(&folder.id, config.only_images).await?;
    if photos.is_empty() {
        return Ok(0);
    }

    let album_date = folder
        .created_time
        .as_deref()
        .and_then(format_date)
        .or_else(|| {
            photos
                .first()
                .and_then(|p| p.created_time.as_deref())
                .and_then(format_date)
        });

    let mut entries: Vec<ManifestEntry> = photos
        .iter()
        .map(|photo| build_entry(photo, &folder.name, album_date.as_deref(), config))
        .collect();
    entries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });

    let output_path = config.dest.join(format!("{}.json", folder.name));
    let contents = serde_json::to_string_pretty(&entries)?;
    tokio::fs::write(&output_path, contents).await?;

    Ok(entries.len())
}

fn build_entry(
    photo: &DriveFile,
    album_name: &str,
    album_date: Option<&str>,
    config: &SyncConfig,
) -> ManifestEntry {
    let url = config.build_url(
        &photo.id,
        photo.web_content_link.as_deref(),
        photo.web_view_link.as_deref(),
    );
    let thumbnail = config.build_thumbnail(&photo.id, &url, photo.thumbnail_link.as_deref());

    ManifestEntry {
        name: photo.name.clone(),
        album: Some(album_name.to_string()),
        date: album_date.map(|d| d.to_string()),
        description: config
            .resolve_description(photo.description.as_deref(), photo.properties.as_ref()),
        url,
        thumbnail: Some(thumbnail),
    }
}

/// Reduce an RFC 3339 timestamp to its date part.
fn format_date(raw: &str) -> Option<String> {
    let date = raw.trim().get(..10)?;
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|_| date.to_string())
}
