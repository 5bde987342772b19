use axum::http::{StatusCode, header};
use axum_test::TestServer;
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

use revelado::{
    AppConfig, AuthConfig, Config, DownloadsConfig, GalleryConfig, ServerConfig, StaticConfig,
    TemplateConfig, WatermarkConfig, create_app,
};

async fn setup_test_server() -> (TempDir, TestServer) {
    let temp_dir = TempDir::new().unwrap();
    let templates_dir = temp_dir.path().join("templates");
    let static_dir = temp_dir.path().join("static");
    let manifest_dir = temp_dir.path().join("fotos");

    fs::create_dir_all(&templates_dir).unwrap();
    fs::create_dir_all(&static_dir).unwrap();
    fs::create_dir_all(&manifest_dir).unwrap();

    fs::write(
        templates_dir.join("_header.html.liquid"),
        "<!DOCTYPE html><html><body>",
    )
    .unwrap();
    fs::write(
        templates_dir.join("_footer.html.liquid"),
        "</body></html>",
    )
    .unwrap();
    fs::write(
        templates_dir.join("index.html.liquid"),
        "{{ header }}<h1>{{ app_name }}</h1><p>Marketing home</p>{{ footer }}",
    )
    .unwrap();
    fs::write(
        templates_dir.join("login.html.liquid"),
        r#"{{ header }}<h1>Client access</h1>
{% if error_message %}<p class="error">{{ error_message }}</p>{% endif %}
{{ footer }}"#,
    )
    .unwrap();
    fs::write(
        templates_dir.join("gallery.html.liquid"),
        "{{ header }}<h1>Photos of {{ client_name }}</h1>{{ footer }}",
    )
    .unwrap();

    let tokens_path = temp_dir.path().join("tokens.json");
    fs::write(
        &tokens_path,
        r#"{
            "ABC12345": {
                "cliente": "Maria",
                "categoria": "batizado",
                "pastas_permitidas": ["batizado"],
                "ativo": true,
                "criado_em": "2024-01-01",
                "expira_em": "2999-01-01"
            },
            "REVOKED9": {
                "cliente": "Carlos",
                "categoria": "casamento",
                "pastas_permitidas": ["casamento"],
                "ativo": false,
                "criado_em": "2024-01-01",
                "expira_em": "2999-01-01"
            },
            "EXPIRED9": {
                "cliente": "Ana",
                "categoria": "formatura",
                "pastas_permitidas": ["formatura"],
                "ativo": true,
                "criado_em": "2020-01-01",
                "expira_em": "2020-02-01"
            }
        }"#,
    )
    .unwrap();

    fs::write(
        manifest_dir.join("batizado.json"),
        r#"[
            {"nome": "altar.jpg", "url": "https://example.com/altar.jpg", "data": "2024-05-01"},
            {"nome": "familia.jpg", "url": "https://example.com/familia.jpg", "data": "2024-05-01"}
        ]"#,
    )
    .unwrap();

    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        app: AppConfig {
            name: "TestStudio".to_string(),
            log_level: "error".to_string(),
            session_secret: "test-session-secret".to_string(),
            base_url: None,
        },
        templates: TemplateConfig {
            directory: templates_dir,
        },
        static_files: StaticConfig {
            directory: static_dir,
        },
        auth: AuthConfig {
            directory_source: tokens_path.to_str().unwrap().to_string(),
            min_token_length: 8,
            directory_fetch_retries: 1,
            retry_base_delay_ms: 1,
            support_hint_threshold: 3,
            access_log: None,
            session_max_age_secs: 3600,
        },
        gallery: GalleryConfig {
            manifest_directory: manifest_dir,
            legacy_index: None,
            unfiled_album: "sem_album".to_string(),
            session_cleanup_interval_minutes: None,
        },
        downloads: DownloadsConfig {
            fetch_retries: 1,
            fetch_retry_delay_ms: 1,
            batch_item_delay_ms: 0,
        },
        watermark: WatermarkConfig {
            text: "TEST".to_string(),
            logo_path: None,
            opacity: 0.3,
            size_fraction: 0.15,
            tiled: true,
            logo_load_timeout_secs: 1,
        },
    };

    let app = create_app(config).await;
    let server = TestServer::new(app.into_make_service()).unwrap();

    (temp_dir, server)
}

fn session_cookie(response: &axum_test::TestResponse) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|h| h.to_str().ok())
        .map(|c| c.split(';').next().unwrap_or("").to_string())
}

#[tokio::test]
async fn unknown_token_is_unauthorized_and_sets_no_cookie() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server
        .post("/api/auth")
        .json(&json!({"token": "NOPENOPE"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn token_lookup_is_case_sensitive() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server
        .post("/api/auth")
        .json(&json!({"token": "abc12345"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn valid_token_opens_a_session() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server
        .post("/api/auth")
        .json(&json!({"token": "ABC12345"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);

    let cookie = session_cookie(&response).unwrap();
    assert!(cookie.starts_with("session="));

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Welcome, Maria!");
    assert_eq!(body["client"]["albums"], json!(["batizado"]));
}

#[tokio::test]
async fn deactivated_token_is_rejected() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server
        .post("/api/auth")
        .json(&json!({"token": "REVOKED9"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("deactivated"));
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server
        .post("/api/auth")
        .json(&json!({"token": "EXPIRED9"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("expired"));
}

#[tokio::test]
async fn short_token_is_a_validation_error() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server
        .post("/api/auth")
        .json(&json!({"token": "abc"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("8 characters"));
}

#[tokio::test]
async fn repeated_failures_add_the_support_hint() {
    let (_temp_dir, server) = setup_test_server().await;

    let mut last_message = String::new();
    for _ in 0..3 {
        let response = server
            .post("/api/auth")
            .json(&json!({"token": "NOPENOPE"}))
            .await;
        let body: Value = response.json();
        last_message = body["message"].as_str().unwrap().to_string();
    }

    assert!(last_message.contains("contact us"));
}

#[tokio::test]
async fn verify_without_session_is_unauthorized() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server.get("/api/verify").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["authorized"], false);
}

#[tokio::test]
async fn verify_replays_the_lookup_against_the_live_directory() {
    let (temp_dir, server) = setup_test_server().await;

    let login = server
        .post("/api/auth")
        .json(&json!({"token": "ABC12345"}))
        .await;
    let cookie = session_cookie(&login).unwrap();

    let response = server
        .get("/api/verify")
        .add_header(header::COOKIE, cookie.parse::<axum::http::HeaderValue>().unwrap())
        .await;
    let body: Value = response.json();
    assert_eq!(body["authorized"], true);
    assert_eq!(body["client"]["owner"], "Maria");

    // Revoke the token behind the session's back; the next verify clears it
    let tokens_path = temp_dir.path().join("tokens.json");
    let contents = fs::read_to_string(&tokens_path).unwrap();
    fs::write(&tokens_path, contents.replace(r#""ativo": true"#, r#""ativo": false"#)).unwrap();

    let response = server
        .get("/api/verify")
        .add_header(header::COOKIE, cookie.parse::<axum::http::HeaderValue>().unwrap())
        .await;
    let body: Value = response.json();
    assert_eq!(body["authorized"], false);

    let cleared = session_cookie(&response).unwrap();
    assert_eq!(cleared, "session=");
}

#[tokio::test]
async fn tampered_session_cookie_is_ignored() {
    let (_temp_dir, server) = setup_test_server().await;

    let forged =
        revelado::auth::create_signed_cookie("wrong-secret", "ABC12345").unwrap();
    let response = server
        .get("/api/verify")
        .add_header(
            header::COOKIE,
            format!("session={}", forged)
                .parse::<axum::http::HeaderValue>()
                .unwrap(),
        )
        .await;

    let body: Value = response.json();
    assert_eq!(body["authorized"], false);
}

#[tokio::test]
async fn token_link_redirects_without_the_token() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server
        .get("/gallery")
        .add_query_param("token", "ABC12345")
        .await;

    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/gallery"
    );
    assert!(session_cookie(&response).unwrap().starts_with("session="));
}

#[tokio::test]
async fn gallery_page_without_session_renders_the_login() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server.get("/gallery").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("Client access"));
}

#[tokio::test]
async fn gallery_page_with_session_renders_the_gallery() {
    let (_temp_dir, server) = setup_test_server().await;

    let login = server
        .post("/api/auth")
        .json(&json!({"token": "ABC12345"}))
        .await;
    let cookie = session_cookie(&login).unwrap();

    let response = server
        .get("/gallery")
        .add_header(header::COOKIE, cookie.parse::<axum::http::HeaderValue>().unwrap())
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("Photos of Maria"));
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let (_temp_dir, server) = setup_test_server().await;

    let login = server
        .post("/api/auth")
        .json(&json!({"token": "ABC12345"}))
        .await;
    let cookie = session_cookie(&login).unwrap();

    let response = server
        .post("/api/logout")
        .add_header(header::COOKIE, cookie.parse::<axum::http::HeaderValue>().unwrap())
        .await;

    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(session_cookie(&response).unwrap(), "session=");
}

#[tokio::test]
async fn marketing_page_renders_without_authentication() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server.get("/").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains("TestStudio"));
    assert!(html.contains("Marketing home"));
}

#[tokio::test]
async fn robots_txt_disallows_the_gallery() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server.get("/robots.txt").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.text();
    assert!(body.contains("Disallow: /gallery"));
    assert!(body.contains("Disallow: /api/"));
}
