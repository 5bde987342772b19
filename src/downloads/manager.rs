use super::{DownloadError, NameAllocator, PhotoFetcher, fetcher, names::sanitize_file_name};
use crate::gallery::Photo;
use chrono::Utc;
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct FetchedPhoto {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
    pub current: String,
}

pub struct BatchOutcome {
    pub archive_name: String,
    pub archive: Vec<u8>,
    pub included: usize,
    pub skipped: Vec<String>,
}

pub struct DownloadManager {
    fetcher: Arc<dyn PhotoFetcher>,
    batch_delay: Duration,
}

impl DownloadManager {
    pub fn new(config: crate::DownloadsConfig) -> Self {
        let fetcher = Arc::new(fetcher::HttpFetcher::new(
            config.fetch_retries,
            Duration::from_millis(config.fetch_retry_delay_ms),
        ));
        Self {
            fetcher,
            batch_delay: Duration::from_millis(config.batch_item_delay_ms),
        }
    }

    pub fn with_fetcher(fetcher: Arc<dyn PhotoFetcher>, batch_delay: Duration) -> Self {
        Self {
            fetcher,
            batch_delay,
        }
    }

    /// Fetch one photo's bytes, walking the candidate sources in order until
    /// one answers.
    pub async fn download_photo(&self, photo: &Photo) -> Result<FetchedPhoto, DownloadError> {
        for candidate in fetcher::source_candidates(photo) {
            match self.fetcher.fetch(&candidate).await {
                Ok(bytes) => {
                    debug!("Fetched {} from {}", photo.name, candidate);
                    return Ok(FetchedPhoto {
                        file_name: sanitize_file_name(&photo.name),
                        bytes,
                    });
                }
                Err(e) => {
                    warn!("Source {} failed for {}: {}", candidate, photo.name, e);
                }
            }
        }

        Err(DownloadError::Fetch(photo.name.clone()))
    }

    /// Fetch display bytes for a photo, preferring the lighter sources.
    pub async fn fetch_preview(&self, photo: &Photo) -> Result<Vec<u8>, DownloadError> {
        for candidate in [&photo.preview_url, &photo.thumbnail_url, &photo.url] {
            if candidate.is_empty() {
                continue;
            }
            match self.fetcher.fetch(candidate).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => warn!("Preview source {} failed: {}", candidate, e),
            }
        }
        Err(DownloadError::Fetch(photo.name.clone()))
    }

    /// Fetch a batch sequentially and bundle it into a timestamped zip.
    /// Failed items are skipped with a warning; the batch fails only when
    /// nothing could be fetched. The cancel token stops further fetches
    /// between items but never aborts one in flight.
    pub async fn download_batch(
        &self,
        photos: &[Photo],
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(BatchProgress),
    ) -> Result<BatchOutcome, DownloadError> {
        if photos.is_empty() {
            return Err(DownloadError::SelectionEmpty);
        }

        let total = photos.len();
        let mut allocator = NameAllocator::default();
        let mut entries: Vec<FetchedPhoto> = Vec::new();
        let mut skipped = Vec::new();

        for (index, photo) in photos.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Batch download cancelled after {} items", index);
                break;
            }

            if index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            match self.download_photo(photo).await {
                Ok(fetched) => {
                    let file_name = allocator.allocate(&photo.name);
                    entries.push(FetchedPhoto {
                        file_name,
                        bytes: fetched.bytes,
                    });
                }
                Err(e) => {
                    warn!("Skipping {} in batch: {}", photo.name, e);
                    skipped.push(photo.name.clone());
                }
            }

            let completed = index + 1;
            on_progress(BatchProgress {
                completed,
                total,
                percent: ((completed * 100) / total) as u8,
                current: photo.name.clone(),
            });
        }

        if entries.is_empty() {
            return Err(DownloadError::AllFailed { attempted: total });
        }

        let included = entries.len();
        let archive = build_archive(entries)?;
        let archive_name = format!("fotos_{}.zip", Utc::now().format("%Y%m%d-%H%M%S"));

        info!(
            "Bundled {} of {} photos into {} ({} skipped)",
            included,
            total,
            archive_name,
            skipped.len()
        );

        Ok(BatchOutcome {
            archive_name,
            archive,
            included,
            skipped,
        })
    }
}

fn build_archive(entries: Vec<FetchedPhoto>) -> Result<Vec<u8>, DownloadError> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options: zip::write::FileOptions<'_, ()> =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in entries {
        zip.start_file(entry.file_name, options)?;
        zip.write_all(&entry.bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}
