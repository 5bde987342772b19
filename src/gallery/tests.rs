#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::auth::ClientView;
    use chrono::Utc;

    fn photo(name: &str, album: &str, ingest_index: usize) -> Photo {
        Photo {
            id: format!("{}_{}", album, ingest_index),
            name: name.to_string(),
            album: album.to_string(),
            url: format!("https://example.com/{}", name),
            thumbnail_url: format!("https://example.com/thumb/{}", name),
            preview_url: format!("https://example.com/preview/{}", name),
            date_label: "01/06/2025".to_string(),
            description: None,
            ingest_index,
        }
    }

    fn working_set() -> Vec<Photo> {
        vec![
            photo("cerimonia_1.jpg", "Casamento", 0),
            photo("bolo.jpg", "aniversario", 1),
            photo("cerimonia_2.jpg", "Casamento", 2),
            photo("altar.jpg", "Batizado", 3),
        ]
    }

    fn client() -> ClientView {
        ClientView {
            owner: "Maria".to_string(),
            category: "casamento".to_string(),
            albums: vec!["Casamento".to_string(), "Batizado".to_string()],
            expires_at: Utc::now() + chrono::Duration::days(30),
            days_remaining: 30,
        }
    }

    #[test]
    fn build_groups_and_orders_albums_case_insensitively() {
        let albums = index::build(&working_set());

        let names: Vec<&str> = albums.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["aniversario", "Batizado", "Casamento"]);

        let casamento = albums.iter().find(|a| a.name == "Casamento").unwrap();
        assert_eq!(casamento.count, 2);
        assert_eq!(casamento.cover.name, "cerimonia_1.jpg");
        // Ingestion order is preserved within the album
        assert_eq!(casamento.photos[0].name, "cerimonia_1.jpg");
        assert_eq!(casamento.photos[1].name, "cerimonia_2.jpg");
    }

    #[test]
    fn build_is_idempotent() {
        let photos = working_set();
        let first = index::build(&photos);
        let second = index::build(&photos);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.count, b.count);
            assert_eq!(a.cover.id, b.cover.id);
        }
    }

    #[test]
    fn search_matches_name_album_and_date_label() {
        let photos = working_set();

        let by_name = index::search(&photos, "BOLO");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "bolo.jpg");

        let by_album = index::search(&photos, "casamento");
        assert_eq!(by_album.len(), 2);

        let by_date = index::search(&photos, "01/06");
        assert_eq!(by_date.len(), 4);

        // A blank query matches everything
        assert_eq!(index::search(&photos, "   ").len(), 4);
    }

    #[test]
    fn filter_albums_keeps_full_album_on_name_match() {
        let albums = index::build(&working_set());

        // The album name matches, so the whole unfiltered album is shown
        let filtered = index::filter_albums(&albums, "casa");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].count, 2);
    }

    #[test]
    fn filter_albums_narrows_photos_and_drops_empty_albums() {
        let albums = index::build(&working_set());

        let filtered = index::filter_albums(&albums, "cerimonia_2");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Casamento");
        assert_eq!(filtered[0].count, 1);
        assert_eq!(filtered[0].cover.name, "cerimonia_2.jpg");

        let filtered = index::filter_albums(&albums, "no-such-photo");
        assert!(filtered.is_empty());
    }

    #[test]
    fn selection_requires_a_photo_view() {
        let mut state = GalleryState::new(client(), working_set(), 1);

        // The default view is the album browser
        let result = state.toggle("Casamento_0");
        assert!(matches!(result, Err(GalleryError::BrowseView)));
        assert!(matches!(
            state.toggle_select_all(),
            Err(GalleryError::BrowseView)
        ));
    }

    #[test]
    fn toggle_flips_membership() {
        let mut state = GalleryState::new(client(), working_set(), 1);
        state.set_view(ViewMode::All);

        assert!(state.toggle("Casamento_0").unwrap());
        assert!(state.selection.contains("Casamento_0"));
        assert!(!state.toggle("Casamento_0").unwrap());
        assert!(state.selection.is_empty());

        let result = state.toggle("missing_99");
        assert!(matches!(result, Err(GalleryError::UnknownPhoto(_))));
    }

    #[test]
    fn view_change_prunes_the_selection() {
        let mut state = GalleryState::new(client(), working_set(), 1);
        state.set_view(ViewMode::All);

        state.toggle("Casamento_0").unwrap();
        state.toggle("Batizado_3").unwrap();
        assert_eq!(state.selection.len(), 2);

        // Only the Casamento photo survives the switch to its album
        state.set_view(ViewMode::Album("Casamento".to_string()));
        assert_eq!(state.selection.len(), 1);
        assert!(state.selection.contains("Casamento_0"));

        // And nothing survives a search that matches neither
        state.set_view(ViewMode::Search("aniversario".to_string()));
        assert!(state.selection.is_empty());
    }

    #[test]
    fn select_all_toggles_between_all_and_none() {
        let mut state = GalleryState::new(client(), working_set(), 1);
        state.set_view(ViewMode::Album("Casamento".to_string()));

        assert_eq!(state.toggle_select_all().unwrap(), 2);
        assert_eq!(state.selection.len(), 2);

        // A second pass with everything selected clears it
        assert_eq!(state.toggle_select_all().unwrap(), 0);
        assert!(state.selection.is_empty());
    }

    #[test]
    fn selected_photos_keep_working_set_order() {
        let mut state = GalleryState::new(client(), working_set(), 1);
        state.set_view(ViewMode::All);

        state.toggle("Batizado_3").unwrap();
        state.toggle("Casamento_0").unwrap();

        let selected = state.selected_photos();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].name, "cerimonia_1.jpg");
        assert_eq!(selected[1].name, "altar.jpg");
    }

    #[test]
    fn search_view_shows_matching_photos() {
        let mut state = GalleryState::new(client(), working_set(), 1);

        state.set_view(ViewMode::Search("batizado".to_string()));
        let visible = state.visible_photos();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "altar.jpg");

        // An empty query behaves like the all-photos view
        state.set_view(ViewMode::Search(String::new()));
        assert_eq!(state.visible_photos().len(), 4);
    }
}
