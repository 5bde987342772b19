use crate::Config;
use crate::auth::DirectorySource;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create manifest directory: {0}")]
    ManifestDirectoryCreationFailed(#[from] std::io::Error),

    #[error("Static files directory does not exist")]
    StaticDirectoryMissing,

    #[error("Token directory file does not exist: {0}")]
    TokenDirectoryMissing(String),

    #[error("Required file missing: {0}")]
    RequiredFileMissing(String),
}

impl StartupCheckError {
    /// Whether the server should refuse to start over this failure.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StartupCheckError::TokenDirectoryMissing(_)
                | StartupCheckError::ManifestDirectoryCreationFailed(_)
        )
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    // The token directory is the one thing login cannot work without
    match DirectorySource::parse(&config.auth.directory_source) {
        DirectorySource::File(path) => {
            if path.exists() {
                info!("Token directory file exists: {:?}", path);
            } else {
                error!("Token directory file does not exist: {:?}", path);
                errors.push(StartupCheckError::TokenDirectoryMissing(
                    path.display().to_string(),
                ));
            }
        }
        DirectorySource::Http(url) => {
            info!("Token directory is remote: {}", url);
        }
    }

    let manifest_dir = Path::new(&config.gallery.manifest_directory);
    if !manifest_dir.exists() {
        info!(
            "Manifest directory does not exist, creating: {:?}",
            manifest_dir
        );
        if let Err(e) = tokio::fs::create_dir_all(manifest_dir).await {
            error!("Failed to create manifest directory: {}", e);
            errors.push(StartupCheckError::ManifestDirectoryCreationFailed(e));
        }
    } else {
        match tokio::fs::read_dir(manifest_dir).await {
            Ok(_) => info!("Manifest directory is accessible: {:?}", manifest_dir),
            Err(e) => {
                error!("Manifest directory is not accessible: {}", e);
                errors.push(StartupCheckError::ManifestDirectoryCreationFailed(e));
            }
        }
    }

    let static_dir = Path::new(&config.static_files.directory);
    if !static_dir.exists() {
        warn!("Static files directory does not exist: {:?}", static_dir);
        errors.push(StartupCheckError::StaticDirectoryMissing);
    } else {
        info!("Static files directory exists: {:?}", static_dir);
    }

    // The watermark falls back to nothing without the font, so this is only
    // a warning-level failure
    let font_path = config.static_files.directory.join("DejaVuSans.ttf");
    if font_path.exists() {
        info!("Watermark font found: {:?}", font_path);
    } else {
        warn!("Watermark font missing, visitor previews will not be stamped");
        errors.push(StartupCheckError::RequiredFileMissing(
            "DejaVuSans.ttf".to_string(),
        ));
    }

    let templates_dir = Path::new(&config.templates.directory);
    if !templates_dir.exists() {
        warn!("Templates directory does not exist: {:?}", templates_dir);
        warn!("This may cause issues with page rendering");
    } else {
        info!("Templates directory exists: {:?}", templates_dir);
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
