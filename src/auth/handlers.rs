use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Json, Redirect, Response},
};
use tracing::{error, info, warn};

use super::{AuthRequest, AuthResponse, VerifyResponse};
use crate::AppState;

/// Key used for the failed-attempt counter. Proxied deployments put the real
/// client address in x-forwarded-for.
pub(crate) fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub(crate) fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

pub async fn authenticate_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AuthRequest>,
) -> Response {
    let key = client_key(&headers);

    match app_state.guard.validate(&payload.token).await {
        Ok(view) => {
            let token = payload.token.trim().to_string();
            info!("Token validated for {}", view.owner);

            app_state.guard.reset_attempts(&key).await;
            app_state.guard.log_access(&token, &user_agent(&headers));

            if let Err(e) = app_state.gallery.load_session(&token, &view).await {
                error!("Failed to load gallery session: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(AuthResponse {
                        success: false,
                        message: "Failed to load your photos. Try again.".to_string(),
                        client: None,
                    }),
                )
                    .into_response();
            }

            let Some(cookie) = super::session_cookie_header(
                &app_state.config.app.session_secret,
                &token,
                app_state.config.auth.session_max_age_secs,
            ) else {
                error!("Failed to sign session cookie");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            };

            let mut response_headers = HeaderMap::new();
            response_headers.insert(SET_COOKIE, cookie.parse().unwrap());

            (
                response_headers,
                Json(AuthResponse {
                    success: true,
                    message: format!("Welcome, {}!", view.owner),
                    client: Some(view),
                }),
            )
                .into_response()
        }
        Err(e) => {
            let attempts = app_state.guard.record_failure(&key).await;
            warn!(attempts, "Authentication failed: {}", e);
            let message = app_state.guard.failure_message(&e, attempts);

            (
                e.status(),
                Json(AuthResponse {
                    success: false,
                    message,
                    client: None,
                }),
            )
                .into_response()
        }
    }
}

pub async fn verify_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = super::session_token(&headers, &app_state.config.app.session_secret)
    else {
        return Json(VerifyResponse {
            authorized: false,
            client: None,
        })
        .into_response();
    };

    match app_state.guard.revalidate(&token).await {
        Ok(view) => {
            if !app_state.gallery.has_session(&token).await
                && let Err(e) = app_state.gallery.load_session(&token, &view).await
            {
                error!("Failed to reload gallery session: {}", e);
            }

            Json(VerifyResponse {
                authorized: true,
                client: Some(view),
            })
            .into_response()
        }
        Err(e) => {
            info!("Session no longer valid, clearing: {}", e);
            app_state.gallery.drop_session(&token).await;

            let mut response_headers = HeaderMap::new();
            response_headers.insert(
                SET_COOKIE,
                super::clear_session_cookie_header().parse().unwrap(),
            );

            (
                response_headers,
                Json(VerifyResponse {
                    authorized: false,
                    client: None,
                }),
            )
                .into_response()
        }
    }
}

pub async fn logout_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(token) = super::session_token(&headers, &app_state.config.app.session_secret) {
        app_state.gallery.drop_session(&token).await;
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        SET_COOKIE,
        super::clear_session_cookie_header().parse().unwrap(),
    );

    (response_headers, Redirect::to("/"))
}
