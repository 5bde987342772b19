use super::{AlbumSummary, Photo};
use std::collections::HashMap;

/// Group a photo working set into albums. Pure function of the input:
/// rebuilding from the same photo list yields identical names, counts and
/// ordering. Within an album the original ingestion order is preserved, and
/// the cover is the first-ingested photo. Albums are ordered by name,
/// case-insensitively.
pub fn build(photos: &[Photo]) -> Vec<AlbumSummary> {
    let mut groups: HashMap<&str, Vec<&Photo>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for photo in photos {
        let group = groups.entry(photo.album.as_str()).or_insert_with(|| {
            order.push(photo.album.as_str());
            Vec::new()
        });
        group.push(photo);
    }

    let mut albums: Vec<AlbumSummary> = order
        .into_iter()
        .map(|name| {
            let members = &groups[name];
            let cover = members
                .iter()
                .min_by_key(|p| p.ingest_index)
                .expect("album group is never empty");
            AlbumSummary {
                name: name.to_string(),
                count: members.len(),
                cover: (*cover).clone(),
                photos: members.iter().map(|p| (*p).clone()).collect(),
            }
        })
        .collect();

    albums.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });

    albums
}

/// Does a photo match a (lowercased) query? Baseline contract: photo name or
/// album name, plus the date label.
pub fn photo_matches(photo: &Photo, query: &str) -> bool {
    photo.name.to_lowercase().contains(query)
        || photo.album.to_lowercase().contains(query)
        || photo.date_label.to_lowercase().contains(query)
}

/// Search across the working set.
pub fn search(photos: &[Photo], query: &str) -> Vec<Photo> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return photos.to_vec();
    }
    photos
        .iter()
        .filter(|p| photo_matches(p, &query))
        .cloned()
        .collect()
}

/// Narrow an album listing by a query. An album whose own name matches keeps
/// its full unfiltered photo list; otherwise the photos are filtered and the
/// album is dropped when none match.
pub fn filter_albums(albums: &[AlbumSummary], query: &str) -> Vec<AlbumSummary> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return albums.to_vec();
    }

    albums
        .iter()
        .filter_map(|album| {
            if album.name.to_lowercase().contains(&query) {
                return Some(album.clone());
            }

            let photos: Vec<Photo> = album
                .photos
                .iter()
                .filter(|p| p.name.to_lowercase().contains(&query)
                    || p.date_label.to_lowercase().contains(&query))
                .cloned()
                .collect();

            if photos.is_empty() {
                None
            } else {
                let cover = photos
                    .iter()
                    .min_by_key(|p| p.ingest_index)
                    .cloned()
                    .expect("filtered album has photos");
                Some(AlbumSummary {
                    name: album.name.clone(),
                    count: photos.len(),
                    cover,
                    photos,
                })
            }
        })
        .collect()
}
