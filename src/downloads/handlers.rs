use super::DownloadError;
use crate::{AppState, auth, gallery};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

fn attachment_response(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Response {
    // Accented filenames survive sanitization, so the RFC 5987 form is sent
    // alongside the quoted one.
    let encoded_name = urlencoding::encode(file_name);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"; filename*=UTF-8''{}",
                    file_name, encoded_name
                ),
            ),
        ],
        bytes,
    )
        .into_response()
}

fn guess_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .to_string()
}

/// Download a single photo. No bytes are fetched for anyone without a valid
/// session.
pub async fn download_photo_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Ok(token) = gallery::require_session(&app_state, &headers) else {
        return DownloadError::NotAuthenticated.into_response();
    };

    let photo = match app_state.gallery.photo(&token, &id).await {
        Ok(photo) => photo,
        Err(e) => return e.into_response(),
    };

    match app_state.downloads.download_photo(&photo).await {
        Ok(fetched) => {
            app_state.guard.record_download(&token, &photo.name);
            let content_type = guess_content_type(&fetched.file_name);
            attachment_response(&fetched.file_name, &content_type, fetched.bytes)
        }
        Err(e) => {
            error!("Download of {} failed: {}", photo.name, e);
            e.into_response()
        }
    }
}

/// Download the current selection. One selected photo short-circuits to the
/// single-photo path; more are bundled into a zip whose headers report how
/// many items were included and skipped.
pub async fn download_selected_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let Ok(token) = gallery::require_session(&app_state, &headers) else {
        return DownloadError::NotAuthenticated.into_response();
    };

    let selected = match app_state
        .gallery
        .with_session(&token, |state| state.selected_photos())
        .await
    {
        Ok(selected) => selected,
        Err(e) => return e.into_response(),
    };

    if selected.is_empty() {
        return DownloadError::SelectionEmpty.into_response();
    }

    if selected.len() == 1 {
        let id = selected[0].id.clone();
        return download_photo_handler(State(app_state), Path(id), headers).await;
    }

    let cancel = CancellationToken::new();
    let outcome = app_state
        .downloads
        .download_batch(&selected, &cancel, |progress| {
            debug!(
                "Batch progress {}% ({}/{}): {}",
                progress.percent, progress.completed, progress.total, progress.current
            );
        })
        .await;

    match outcome {
        Ok(outcome) => {
            for photo in &selected {
                if !outcome.skipped.contains(&photo.name) {
                    app_state.guard.record_download(&token, &photo.name);
                }
            }

            let mut response =
                attachment_response(&outcome.archive_name, "application/zip", outcome.archive);
            let response_headers = response.headers_mut();
            response_headers.insert(
                "x-photos-included",
                outcome.included.to_string().parse().unwrap(),
            );
            response_headers.insert(
                "x-photos-skipped",
                outcome.skipped.len().to_string().parse().unwrap(),
            );
            response
        }
        Err(e) => {
            error!("Batch download failed: {}", e);
            e.into_response()
        }
    }
}

/// Serve display bytes for a photo. A valid session gets the image as
/// stored; anyone else gets a watermarked rendition.
pub async fn image_preview_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let session_token =
        auth::session_token(&headers, &app_state.config.app.session_secret);

    if let Some(token) = session_token
        && app_state.gallery.has_session(&token).await
    {
        let photo = match app_state.gallery.photo(&token, &id).await {
            Ok(photo) => photo,
            Err(e) => return e.into_response(),
        };

        return match app_state.downloads.fetch_preview(&photo).await {
            Ok(bytes) => {
                let content_type = guess_content_type(&photo.name);
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, content_type)],
                    bytes,
                )
                    .into_response()
            }
            Err(e) => e.into_response(),
        };
    }

    // Visitor path: resolve from the manifests and stamp the watermark.
    let photo = match app_state.gallery.resolve_public_photo(&id).await {
        Ok(photo) => photo,
        Err(e) => return e.into_response(),
    };

    let bytes = match app_state.downloads.fetch_preview(&photo).await {
        Ok(bytes) => bytes,
        Err(e) => return e.into_response(),
    };

    let watermark = app_state.watermark.clone();
    let stamped = tokio::task::spawn_blocking(move || watermark.stamp_bytes(&bytes)).await;

    match stamped {
        Ok(Ok(jpeg)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/jpeg".to_string())],
            jpeg,
        )
            .into_response(),
        Ok(Err(e)) => {
            error!("Watermarking failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            error!("Watermark task panicked: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
