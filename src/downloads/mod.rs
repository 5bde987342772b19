// Selection downloads - byte fetching, filename handling, zip bundling
mod error;
mod fetcher;
mod handlers;
mod manager;
mod names;


pub use error::DownloadError;
pub use fetcher::{HttpFetcher, PhotoFetcher, source_candidates};
pub use handlers::{download_photo_handler, download_selected_handler, image_preview_handler};
pub use manager::{BatchOutcome, BatchProgress, DownloadManager, FetchedPhoto};
pub use names::{NameAllocator, sanitize_file_name};
