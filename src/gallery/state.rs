use super::{GalleryError, Photo, ViewMode, index};
use crate::auth::ClientView;
use std::collections::HashSet;
use std::time::Instant;

/// Selected photo ids, scoped to the photos visible in the active view.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    ids: HashSet<String>,
}

impl SelectionSet {
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, ids: I) {
        self.ids.extend(ids);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop every id that is not visible anymore. Selection never carries
    /// across an unrelated view.
    pub fn prune(&mut self, visible: &HashSet<&str>) {
        self.ids.retain(|id| visible.contains(id.as_str()));
    }
}

/// Per-session gallery state: the loaded working set, the active view, the
/// selection, and the load generation guarding stale reloads.
#[derive(Debug, Clone)]
pub struct GalleryState {
    pub client: ClientView,
    pub photos: Vec<Photo>,
    pub view: ViewMode,
    pub selection: SelectionSet,
    pub generation: u64,
    pub last_touched: Instant,
}

impl GalleryState {
    pub fn new(client: ClientView, photos: Vec<Photo>, generation: u64) -> Self {
        Self {
            client,
            photos,
            view: ViewMode::Albums,
            selection: SelectionSet::default(),
            generation,
            last_touched: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }

    /// Photos visible in the active view. The album-browse view exposes no
    /// photo list, so nothing is selectable there.
    pub fn visible_photos(&self) -> Vec<&Photo> {
        match &self.view {
            ViewMode::Albums => Vec::new(),
            ViewMode::All => self.photos.iter().collect(),
            ViewMode::Album(name) => self
                .photos
                .iter()
                .filter(|p| &p.album == name)
                .collect(),
            ViewMode::Search(query) => {
                let query = query.trim().to_lowercase();
                self.photos
                    .iter()
                    .filter(|p| query.is_empty() || index::photo_matches(p, &query))
                    .collect()
            }
        }
    }

    /// Switch the view and prune the selection down to what remains visible.
    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
        let visible: HashSet<&str> = self
            .visible_photos()
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        self.selection.prune(&visible);
        self.touch();
    }

    pub fn toggle(&mut self, id: &str) -> Result<bool, GalleryError> {
        if !self.view.allows_selection() {
            return Err(GalleryError::BrowseView);
        }
        if !self.visible_photos().iter().any(|p| p.id == id) {
            return Err(GalleryError::UnknownPhoto(id.to_string()));
        }
        self.touch();
        Ok(self.selection.toggle(id))
    }

    /// Select every visible photo, or clear when everything is already
    /// selected.
    pub fn toggle_select_all(&mut self) -> Result<usize, GalleryError> {
        if !self.view.allows_selection() {
            return Err(GalleryError::BrowseView);
        }

        let visible: Vec<String> = self
            .visible_photos()
            .iter()
            .map(|p| p.id.clone())
            .collect();
        let all_selected =
            !visible.is_empty() && visible.iter().all(|id| self.selection.contains(id));

        if all_selected {
            for id in &visible {
                self.selection.toggle(id);
            }
        } else {
            self.selection.extend(visible);
        }

        self.touch();
        Ok(self.selection.len())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.touch();
    }

    pub fn photo(&self, id: &str) -> Option<&Photo> {
        self.photos.iter().find(|p| p.id == id)
    }

    /// Selected photos in working-set order.
    pub fn selected_photos(&self) -> Vec<Photo> {
        self.photos
            .iter()
            .filter(|p| self.selection.contains(&p.id))
            .cloned()
            .collect()
    }
}
