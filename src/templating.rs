use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::{collections::HashMap, path::PathBuf, sync::Arc, time::SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Renders the marketing pages and the gallery shell from liquid templates.
/// Parsed templates are cached and invalidated by file modification time, so
/// edits on disk show up without a restart. Every page receives the shared
/// `_header` and `_footer` partials, rendered with the same globals, as
/// raw-HTML values.
pub struct TemplateEngine {
    template_dir: PathBuf,
    cache: RwLock<HashMap<String, CachedTemplate>>,
}

struct CachedTemplate {
    template: Arc<liquid::Template>,
    modified: SystemTime,
}

const HEADER_PARTIAL: &str = "_header.html.liquid";
const FOOTER_PARTIAL: &str = "_footer.html.liquid";

impl TemplateEngine {
    pub fn new(template_dir: PathBuf) -> Self {
        Self {
            template_dir,
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn template(&self, name: &str) -> Result<Arc<liquid::Template>, String> {
        let path = self.template_dir.join(name);

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| format!("Template {} not readable: {}", name, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| format!("No modification time for {}: {}", name, e))?;

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(name)
                && cached.modified >= modified
            {
                debug!("Using cached template for {}", name);
                return Ok(cached.template.clone());
            }
        }

        info!("Loading template: {}", name);
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("Failed to read template {}: {}", name, e))?;

        let parser = liquid::ParserBuilder::with_stdlib()
            .build()
            .map_err(|e| format!("Failed to create parser: {}", e))?;
        let template = Arc::new(
            parser
                .parse(&source)
                .map_err(|e| format!("Failed to parse template {}: {}", name, e))?,
        );

        self.cache.write().await.insert(
            name.to_string(),
            CachedTemplate {
                template: template.clone(),
                modified,
            },
        );

        Ok(template)
    }

    /// A missing or broken partial renders as an empty string so one bad
    /// include never takes the page down.
    async fn render_partial(&self, name: &str, globals: &liquid::Object) -> String {
        match self.template(name).await {
            Ok(template) => template.render(globals).unwrap_or_else(|e| {
                error!("Failed to render partial {}: {}", name, e);
                String::new()
            }),
            Err(e) => {
                debug!("Partial {} unavailable: {}", name, e);
                String::new()
            }
        }
    }

    pub async fn render_template(
        &self,
        template_name: &str,
        globals: liquid::Object,
    ) -> Result<String, String> {
        let header = self.render_partial(HEADER_PARTIAL, &globals).await;
        let footer = self.render_partial(FOOTER_PARTIAL, &globals).await;

        let mut globals = globals;
        globals.insert("header".into(), liquid::model::Value::Scalar(header.into()));
        globals.insert("footer".into(), liquid::model::Value::Scalar(footer.into()));

        let template = self.template(template_name).await?;
        template
            .render(&globals)
            .map_err(|e| format!("Failed to render template {}: {}", template_name, e))
    }

    /// Render a marketing page by URL path: `/` is the index, anything else
    /// maps to `<path>.html.liquid`. Partial names and parent traversals are
    /// not routable.
    pub async fn render_page(
        &self,
        path: &str,
        app_name: &str,
        base_url: Option<&str>,
    ) -> Result<Html<String>, StatusCode> {
        let path = path.trim_matches('/');
        if path.split('/').any(|part| part == "..") || path.starts_with('_') {
            return Err(StatusCode::NOT_FOUND);
        }

        let template_name = if path.is_empty() {
            "index.html.liquid".to_string()
        } else {
            format!("{}.html.liquid", path)
        };

        let globals = liquid::object!({
            "app_name": app_name,
            "base_url": base_url.unwrap_or(""),
        });

        match self.render_template(&template_name, globals).await {
            Ok(html) => Ok(Html(html)),
            Err(e) => {
                error!("Template rendering error: {}", e);
                Err(StatusCode::NOT_FOUND)
            }
        }
    }
}

#[axum::debug_handler]
pub async fn template_handler(
    State(app_state): State<AppState>,
    path: Option<Path<String>>,
) -> impl IntoResponse {
    let path = path.map(|p| p.0).unwrap_or_default();
    app_state
        .template_engine
        .render_page(
            &path,
            &app_state.config.app.name,
            app_state.config.app.base_url.as_deref(),
        )
        .await
}
