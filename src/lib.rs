use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod auth;
pub mod downloads;
pub mod gallery;
pub mod robots;
pub mod startup_checks;
pub mod static_files;
pub mod sync;
pub mod templating;
pub mod watermark;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub templates: TemplateConfig,
    pub static_files: StaticConfig,
    pub auth: AuthConfig,
    pub gallery: GalleryConfig,
    pub downloads: DownloadsConfig,
    pub watermark: WatermarkConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
    pub session_secret: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplateConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Path or http(s) URL of the token directory JSON document.
    pub directory_source: String,
    pub min_token_length: usize,
    pub directory_fetch_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Failed attempts before the error message suggests contacting support.
    pub support_hint_threshold: u32,
    #[serde(default)]
    pub access_log: Option<PathBuf>,
    pub session_max_age_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GalleryConfig {
    pub manifest_directory: PathBuf,
    #[serde(default)]
    pub legacy_index: Option<PathBuf>,
    /// Album name used for photos whose manifest entry carries no album.
    pub unfiled_album: String,
    pub session_cleanup_interval_minutes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadsConfig {
    pub fetch_retries: u32,
    pub fetch_retry_delay_ms: u64,
    /// Pause between items of a batch so the image host is not hammered.
    pub batch_item_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatermarkConfig {
    pub text: String,
    #[serde(default)]
    pub logo_path: Option<PathBuf>,
    pub opacity: f32,
    pub size_fraction: f32,
    pub tiled: bool,
    pub logo_load_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            app: AppConfig {
                name: "Revelado".to_string(),
                log_level: "info".to_string(),
                session_secret: "change-me-in-production".to_string(),
                base_url: None,
            },
            templates: TemplateConfig {
                directory: PathBuf::from("templates"),
            },
            static_files: StaticConfig {
                directory: PathBuf::from("static"),
            },
            auth: AuthConfig {
                directory_source: "tokens.json".to_string(),
                min_token_length: 8,
                directory_fetch_retries: 3,
                retry_base_delay_ms: 1000,
                support_hint_threshold: 3,
                access_log: Some(PathBuf::from("acessos.log")),
                session_max_age_secs: 86400,
            },
            gallery: GalleryConfig {
                manifest_directory: PathBuf::from("fotos"),
                legacy_index: Some(PathBuf::from("fotos.txt")),
                unfiled_album: "sem_album".to_string(),
                session_cleanup_interval_minutes: Some(30),
            },
            downloads: DownloadsConfig {
                fetch_retries: 3,
                fetch_retry_delay_ms: 1000,
                batch_item_delay_ms: 500,
            },
            watermark: WatermarkConfig {
                text: "REVELADO".to_string(),
                logo_path: None,
                opacity: 0.3,
                size_fraction: 0.15,
                tiled: true,
                logo_load_timeout_secs: 5,
            },
        }
    }
}

use axum::{
    Router,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub template_engine: Arc<templating::TemplateEngine>,
    pub static_handler: static_files::StaticFileHandler,
    pub guard: Arc<auth::SessionGuard>,
    pub gallery: gallery::SharedGallery,
    pub downloads: Arc<downloads::DownloadManager>,
    pub watermark: Arc<watermark::WatermarkRenderer>,
    pub config: Config,
}

async fn static_file_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<static_files::VersionQuery>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    app_state
        .static_handler
        .serve(&path, query.v.is_some(), &headers)
        .await
}

pub async fn create_app(config: Config) -> Router {
    let template_engine = Arc::new(templating::TemplateEngine::new(
        config.templates.directory.clone(),
    ));

    let static_handler =
        static_files::StaticFileHandler::new(config.static_files.directory.clone());

    let guard = Arc::new(auth::SessionGuard::new(config.auth.clone()));

    let gallery = Arc::new(gallery::Gallery::new(config.gallery.clone()));
    if let Some(interval_minutes) = config.gallery.session_cleanup_interval_minutes
        && interval_minutes > 0
    {
        gallery::Gallery::start_session_cleanup(
            gallery.clone(),
            interval_minutes,
            config.auth.session_max_age_secs,
        );
    }

    let downloads = Arc::new(downloads::DownloadManager::new(config.downloads.clone()));

    let watermark = Arc::new(
        watermark::WatermarkRenderer::load(&config.watermark, &config.static_files.directory)
            .await,
    );

    let app_state = AppState {
        template_engine,
        static_handler,
        guard,
        gallery,
        downloads,
        watermark,
        config: config.clone(),
    };

    Router::new()
        .route("/", axum::routing::get(templating::template_handler))
        .route(
            "/gallery",
            axum::routing::get(gallery::gallery_page_handler),
        )
        .route("/api/auth", axum::routing::post(auth::authenticate_handler))
        .route("/api/verify", axum::routing::get(auth::verify_handler))
        .route("/api/logout", axum::routing::post(auth::logout_handler))
        .route("/api/albums", axum::routing::get(gallery::albums_handler))
        .route("/api/photos", axum::routing::get(gallery::photos_handler))
        .route("/api/view", axum::routing::post(gallery::set_view_handler))
        .route(
            "/api/selection",
            axum::routing::get(gallery::selection_handler)
                .delete(gallery::clear_selection_handler),
        )
        .route(
            "/api/selection/toggle",
            axum::routing::post(gallery::toggle_selection_handler),
        )
        .route(
            "/api/selection/all",
            axum::routing::post(gallery::select_all_handler),
        )
        .route(
            "/api/image/{id}",
            axum::routing::get(downloads::image_preview_handler),
        )
        .route(
            "/api/download/{id}",
            axum::routing::get(downloads::download_photo_handler),
        )
        .route(
            "/api/download",
            axum::routing::post(downloads::download_selected_handler),
        )
        .route(
            "/robots.txt",
            axum::routing::get(robots::robots_txt_handler),
        )
        .route("/static/{*path}", axum::routing::get(static_file_handler))
        .route(
            "/{*path}",
            axum::routing::get(templating::template_handler),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let user_agent = request
                        .headers()
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        query = ?request.uri().query(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let size = response
                            .headers()
                            .get("content-length")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            size = %size,
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
