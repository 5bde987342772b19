use super::{
    AlbumsQuery, GalleryPageQuery, PhotosQuery, SelectionResponse, ToggleRequest, ViewMode,
    ViewRequest, index,
};
use crate::{AppState, auth};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{Html, IntoResponse, Json, Redirect, Response},
};
use serde_json::json;
use tracing::{error, info, warn};

/// Resolve the session token from the cookie, or answer 401 prompting for a
/// token.
pub(crate) fn require_session(
    app_state: &AppState,
    headers: &HeaderMap,
) -> Result<String, Response> {
    auth::session_token(headers, &app_state.config.app.session_secret).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            "Sign in with your token to access the gallery",
        )
            .into_response()
    })
}

/// The gallery page. A `?token=` link validates and redirects back without
/// the token so the address bar holds nothing shareable; otherwise an
/// existing session is re-validated against the live directory before the
/// gallery renders, falling back to the login screen.
pub async fn gallery_page_handler(
    State(app_state): State<AppState>,
    Query(query): Query<GalleryPageQuery>,
    headers: HeaderMap,
) -> Response {
    if let Some(token) = query.token {
        return match app_state.guard.validate(&token).await {
            Ok(view) => {
                let token = token.trim().to_string();
                app_state
                    .guard
                    .log_access(&token, &auth::user_agent(&headers));

                if let Err(e) = app_state.gallery.load_session(&token, &view).await {
                    error!("Failed to load gallery session: {}", e);
                    return render_login(&app_state, Some("Failed to load your photos.")).await;
                }

                let Some(cookie) = auth::session_cookie_header(
                    &app_state.config.app.session_secret,
                    &token,
                    app_state.config.auth.session_max_age_secs,
                ) else {
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                };

                let mut response_headers = HeaderMap::new();
                response_headers.insert(SET_COOKIE, cookie.parse().unwrap());
                (response_headers, Redirect::to("/gallery")).into_response()
            }
            Err(e) => {
                let key = auth::client_key(&headers);
                let attempts = app_state.guard.record_failure(&key).await;
                warn!(attempts, "Token link rejected: {}", e);
                let message = app_state.guard.failure_message(&e, attempts);
                render_login(&app_state, Some(&message)).await
            }
        };
    }

    let Some(token) = auth::session_token(&headers, &app_state.config.app.session_secret)
    else {
        return render_login(&app_state, None).await;
    };

    match app_state.guard.revalidate(&token).await {
        Ok(view) => {
            if !app_state.gallery.has_session(&token).await
                && let Err(e) = app_state.gallery.load_session(&token, &view).await
            {
                error!("Failed to reload gallery session: {}", e);
                return render_login(&app_state, Some("Failed to load your photos.")).await;
            }

            let albums = app_state.gallery.albums(&token).await.unwrap_or_default();
            let albums_json =
                serde_json::to_string(&albums).unwrap_or_else(|_| "[]".to_string());
            let album_tiles: Vec<_> = albums
                .into_iter()
                .map(|album| {
                    liquid::object!({
                        "name": album.name,
                        "count": album.count as i64,
                        "cover_thumbnail": album.cover.thumbnail_url,
                        "cover_preview": album.cover.preview_url,
                    })
                })
                .collect();

            let globals = liquid::object!({
                "app_name": app_state.config.app.name,
                "client_name": view.owner,
                "client_category": view.category,
                "days_remaining": view.days_remaining,
                "albums": album_tiles,
                "albums_json": albums_json,
                "page_title": format!("{} - Gallery", view.owner),
            });

            match app_state
                .template_engine
                .render_template("gallery.html.liquid", globals)
                .await
            {
                Ok(html) => Html(html).into_response(),
                Err(e) => {
                    error!("Template rendering error: {}", e);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        Err(e) => {
            info!("Session no longer valid: {}", e);
            app_state.gallery.drop_session(&token).await;

            let mut response_headers = HeaderMap::new();
            response_headers.insert(
                SET_COOKIE,
                auth::clear_session_cookie_header().parse().unwrap(),
            );
            let login = render_login(&app_state, Some(&e.user_message())).await;
            (response_headers, login).into_response()
        }
    }
}

async fn render_login(app_state: &AppState, error_message: Option<&str>) -> Response {
    let globals = liquid::object!({
        "app_name": app_state.config.app.name,
        "error_message": error_message,
        "page_title": "Client access",
    });

    match app_state
        .template_engine
        .render_template("login.html.liquid", globals)
        .await
    {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Template rendering error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// The album listing; `q` narrows it with the album-or-photo match rule.
pub async fn albums_handler(
    State(app_state): State<AppState>,
    Query(query): Query<AlbumsQuery>,
    headers: HeaderMap,
) -> Response {
    let token = match require_session(&app_state, &headers) {
        Ok(token) => token,
        Err(response) => return response,
    };

    match app_state.gallery.albums(&token).await {
        Ok(albums) => {
            let albums = match query.q.as_deref() {
                Some(q) => index::filter_albums(&albums, q),
                None => albums,
            };
            Json(albums).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Read-only photo listing; `album` narrows to one album, `q` searches.
pub async fn photos_handler(
    State(app_state): State<AppState>,
    Query(query): Query<PhotosQuery>,
    headers: HeaderMap,
) -> Response {
    let token = match require_session(&app_state, &headers) {
        Ok(token) => token,
        Err(response) => return response,
    };

    let result = app_state
        .gallery
        .with_session(&token, |state| {
            let mut photos: Vec<_> = match &query.album {
                Some(album) => state
                    .photos
                    .iter()
                    .filter(|p| &p.album == album)
                    .cloned()
                    .collect(),
                None => state.photos.clone(),
            };
            if let Some(q) = &query.q {
                photos = index::search(&photos, q);
            }
            photos
        })
        .await;

    match result {
        Ok(photos) => Json(photos).into_response(),
        Err(e) => e.into_response(),
    }
}

fn parse_view(request: &ViewRequest) -> Result<ViewMode, String> {
    match request.mode.as_str() {
        "albums" => Ok(ViewMode::Albums),
        "all" => Ok(ViewMode::All),
        "album" => request
            .album
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| ViewMode::Album(a.to_string()))
            .ok_or_else(|| "album name required".to_string()),
        "search" => Ok(ViewMode::Search(
            request.query.clone().unwrap_or_default(),
        )),
        other => Err(format!("unknown view mode: {}", other)),
    }
}

pub async fn set_view_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ViewRequest>,
) -> Response {
    let token = match require_session(&app_state, &headers) {
        Ok(token) => token,
        Err(response) => return response,
    };

    let view = match parse_view(&request) {
        Ok(view) => view,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    let result = app_state
        .gallery
        .with_session(&token, |state| {
            state.set_view(view);
            SelectionResponse {
                selected: state.selection.len(),
                ids: state.selection.ids(),
            }
        })
        .await;

    match result {
        Ok(selection) => Json(selection).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn toggle_selection_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ToggleRequest>,
) -> Response {
    let token = match require_session(&app_state, &headers) {
        Ok(token) => token,
        Err(response) => return response,
    };

    let result = app_state
        .gallery
        .with_session(&token, |state| {
            state.toggle(&request.id).map(|selected| {
                json!({
                    "selected": selected,
                    "count": state.selection.len(),
                })
            })
        })
        .await;

    match result {
        Ok(Ok(body)) => Json(body).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn select_all_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let token = match require_session(&app_state, &headers) {
        Ok(token) => token,
        Err(response) => return response,
    };

    let result = app_state
        .gallery
        .with_session(&token, |state| state.toggle_select_all())
        .await;

    match result {
        Ok(Ok(count)) => Json(json!({ "count": count })).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn clear_selection_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let token = match require_session(&app_state, &headers) {
        Ok(token) => token,
        Err(response) => return response,
    };

    let result = app_state
        .gallery
        .with_session(&token, |state| state.clear_selection())
        .await;

    match result {
        Ok(()) => Json(json!({ "count": 0 })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn selection_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let token = match require_session(&app_state, &headers) {
        Ok(token) => token,
        Err(response) => return response,
    };

    let result = app_state
        .gallery
        .with_session(&token, |state| SelectionResponse {
            selected: state.selection.len(),
            ids: state.selection.ids(),
        })
        .await;

    match result {
        Ok(selection) => Json(selection).into_response(),
        Err(e) => e.into_response(),
    }
}
