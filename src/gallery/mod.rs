// Gallery module - album index, manifests and per-session state
mod error;
mod handlers;
pub mod index;
pub mod manifest;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use error::GalleryError;
pub use handlers::{
    albums_handler, clear_selection_handler, gallery_page_handler, photos_handler,
    select_all_handler, selection_handler, set_view_handler, toggle_selection_handler,
};
pub(crate) use handlers::require_session;
pub use state::{GalleryState, SelectionSet};
pub use types::*;

use crate::auth::ClientView;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

pub type SharedGallery = Arc<Gallery>;

pub struct Gallery {
    config: crate::GalleryConfig,
    sessions: RwLock<HashMap<String, GalleryState>>,
    generations: AtomicU64,
}

impl Gallery {
    pub fn new(config: crate::GalleryConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Build a fresh working set for a validated token. Each load takes a new
    /// generation; a load that finishes after a newer one has committed for
    /// the same token is discarded instead of clobbering it.
    pub async fn load_session(
        &self,
        token: &str,
        client: &ClientView,
    ) -> Result<usize, GalleryError> {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let photos = manifest::load_working_set(&self.config, &client.albums).await?;
        let count = photos.len();

        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(token)
            && existing.generation > generation
        {
            debug!(
                "Discarding stale working set for session (generation {} < {})",
                generation, existing.generation
            );
            return Ok(existing.photos.len());
        }

        sessions.insert(
            token.to_string(),
            GalleryState::new(client.clone(), photos, generation),
        );
        info!("Loaded {} photos for {}", count, client.owner);
        Ok(count)
    }

    pub async fn has_session(&self, token: &str) -> bool {
        self.sessions.read().await.contains_key(token)
    }

    pub async fn drop_session(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Run a closure against a session's state.
    pub async fn with_session<R>(
        &self,
        token: &str,
        f: impl FnOnce(&mut GalleryState) -> R,
    ) -> Result<R, GalleryError> {
        let mut sessions = self.sessions.write().await;
        let state = sessions
            .get_mut(token)
            .ok_or(GalleryError::SessionExpired)?;
        Ok(f(state))
    }

    pub async fn albums(&self, token: &str) -> Result<Vec<AlbumSummary>, GalleryError> {
        self.with_session(token, |state| index::build(&state.photos))
            .await
    }

    pub async fn photo(&self, token: &str, id: &str) -> Result<Photo, GalleryError> {
        self.with_session(token, |state| state.photo(id).cloned())
            .await?
            .ok_or_else(|| GalleryError::UnknownPhoto(id.to_string()))
    }

    /// Resolve a photo id without a session, straight from the manifests.
    /// Ids are `album_index`, so the album manifest can be reloaded directly.
    pub async fn resolve_public_photo(&self, id: &str) -> Result<Photo, GalleryError> {
        let (album, _) = id
            .rsplit_once('_')
            .ok_or_else(|| GalleryError::UnknownPhoto(id.to_string()))?;

        let photos = manifest::load_album_photos(&self.config, album).await?;
        photos
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| GalleryError::UnknownPhoto(id.to_string()))
    }

    /// Drop sessions that have been idle past the session lifetime.
    pub fn start_session_cleanup(gallery: SharedGallery, interval_minutes: u64, max_age_secs: u64) {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(interval_minutes * 60));
            let max_age = Duration::from_secs(max_age_secs);

            loop {
                interval.tick().await;

                let mut sessions = gallery.sessions.write().await;
                let before = sessions.len();
                sessions.retain(|_, state| state.last_touched.elapsed() < max_age);
                let dropped = before - sessions.len();
                if dropped > 0 {
                    debug!("Dropped {} idle gallery sessions", dropped);
                }
            }
        });
    }
}
