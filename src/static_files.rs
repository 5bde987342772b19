use axum::{
    body::Body,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::{path::PathBuf, time::UNIX_EPOCH};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// `?v=<hash>` marks an asset URL as content-addressed and immutable.
#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    #[serde(default)]
    pub v: Option<String>,
}

/// Streams files from the static directory with cache headers and
/// conditional-request support. Marketing assets and gallery thumbnails are
/// served from here; photo bytes never are.
#[derive(Clone)]
pub struct StaticFileHandler {
    pub static_dir: PathBuf,
}

fn cache_policy(content_type: &str, versioned: bool) -> &'static str {
    if versioned {
        "public, max-age=31536000, immutable"
    } else if content_type.starts_with("image/") {
        "public, max-age=31536000"
    } else if content_type.starts_with("text/css")
        || content_type.starts_with("application/javascript")
    {
        "public, max-age=300, must-revalidate"
    } else {
        "public, max-age=3600"
    }
}

impl StaticFileHandler {
    pub fn new(static_dir: PathBuf) -> Self {
        Self { static_dir }
    }

    pub async fn serve(
        &self,
        path: &str,
        versioned: bool,
        request_headers: &HeaderMap,
    ) -> Response {
        let path = path.trim_start_matches('/');
        // Joining does not normalize, so refuse traversal segments outright
        if path.split('/').any(|part| part == "..") {
            warn!("Path traversal attempt: {}", path);
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        }

        let file_path = self.static_dir.join(path);
        debug!("Serving static file: {:?}", file_path);

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
            Err(e) => {
                debug!("No metadata for {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let content_type = mime_guess::from_path(&file_path)
            .first_or_octet_stream()
            .to_string();
        let cache_control = cache_policy(&content_type, versioned);

        let validators = metadata.modified().ok().map(|modified| {
            let secs = modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let etag = format!("\"{}-{}\"", secs, metadata.len());
            (httpdate::fmt_http_date(modified), etag)
        });

        // A matching ETag answers 304 without opening the file
        if let Some((_, etag)) = &validators
            && request_headers
                .get(header::IF_NONE_MATCH)
                .and_then(|h| h.to_str().ok())
                .is_some_and(|candidates| candidates.split(',').any(|c| c.trim() == etag))
        {
            return Response::builder()
                .status(StatusCode::NOT_MODIFIED)
                .header(header::ETAG, etag)
                .header(header::CACHE_CONTROL, cache_control)
                .body(Body::empty())
                .unwrap();
        }

        let file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(e) => {
                debug!("Failed to open file {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CACHE_CONTROL, cache_control);

        if let Some((last_modified, etag)) = validators {
            response = response
                .header(header::LAST_MODIFIED, last_modified)
                .header(header::ETAG, etag);
        }

        response
            .body(Body::from_stream(ReaderStream::new(file)))
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn handler() -> (TempDir, StaticFileHandler) {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("site.css"), "body {}").unwrap();
        fs::write(temp_dir.path().join("logo.png"), [0u8; 8]).unwrap();
        let handler = StaticFileHandler::new(temp_dir.path().to_path_buf());
        (temp_dir, handler)
    }

    #[tokio::test]
    async fn serves_files_with_cache_headers() {
        let (_temp_dir, handler) = handler();

        let response = handler.serve("site.css", false, &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=300, must-revalidate"
        );
        assert!(response.headers().contains_key(header::ETAG));

        // Versioned URLs are immutable regardless of type
        let response = handler.serve("site.css", true, &HeaderMap::new()).await;
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=31536000, immutable"
        );
    }

    #[tokio::test]
    async fn matching_etag_answers_not_modified() {
        let (_temp_dir, handler) = handler();

        let response = handler.serve("logo.png", false, &HeaderMap::new()).await;
        let etag = response.headers().get(header::ETAG).unwrap().clone();

        let mut request_headers = HeaderMap::new();
        request_headers.insert(header::IF_NONE_MATCH, etag);
        let response = handler.serve("logo.png", false, &request_headers).await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn traversal_segments_are_forbidden() {
        let (_temp_dir, handler) = handler();

        let response = handler
            .serve("../outside.txt", false, &HeaderMap::new())
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let (_temp_dir, handler) = handler();

        let response = handler.serve("nope.css", false, &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
