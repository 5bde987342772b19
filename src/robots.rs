use crate::AppState;
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::error;

/// Crawlers are welcome on the marketing pages but kept out of the client
/// galleries and the API.
const DEFAULT_ROBOTS: &str = "User-agent: *\n\
Allow: /\n\
Disallow: /gallery\n\
Disallow: /api/\n\
Crawl-delay: 1\n";

pub async fn robots_txt_handler(State(app_state): State<AppState>) -> Response {
    // A robots.txt dropped into the static directory wins over the default
    let custom_path = app_state.config.static_files.directory.join("robots.txt");
    let body = match tokio::fs::read_to_string(&custom_path).await {
        Ok(content) => content,
        Err(e) => {
            if custom_path.exists() {
                error!("Failed to read custom robots.txt: {}", e);
            }
            DEFAULT_ROBOTS.to_string()
        }
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}
