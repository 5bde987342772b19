use super::{
    AccessRecord, AttemptTracker, AuthError, ClientToken, ClientView, DirectoryProvider,
    DirectorySource, TokenDirectory,
};
use crate::AuthConfig;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct SessionGuard {
    provider: DirectoryProvider,
    config: AuthConfig,
    attempts: RwLock<AttemptTracker>,
}

impl SessionGuard {
    pub fn new(config: AuthConfig) -> Self {
        let source = DirectorySource::parse(&config.directory_source);
        let provider = DirectoryProvider::new(
            source,
            config.directory_fetch_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        );
        Self {
            provider,
            config,
            attempts: RwLock::new(AttemptTracker::default()),
        }
    }

    /// Validate a token against the live directory and return the normalized
    /// client view. The caller-side length policy is applied here so every
    /// entry point shares it.
    pub async fn validate(&self, token: &str) -> Result<ClientView, AuthError> {
        let token = token.trim();

        if token.len() < self.config.min_token_length {
            return Err(AuthError::Validation(format!(
                "Token must have at least {} characters.",
                self.config.min_token_length
            )));
        }

        let directory = self.provider.fetch().await?;
        let record = directory.get(token).ok_or(AuthError::NotFound)?;
        evaluate(record, Utc::now())
    }

    /// Re-run the directory lookup for an existing session. Sessions are never
    /// trusted indefinitely: a token that has since been removed, deactivated
    /// or expired invalidates the session.
    pub async fn revalidate(&self, token: &str) -> Result<ClientView, AuthError> {
        debug!("Revalidating session token against live directory");
        self.validate(token).await
    }

    pub async fn record_failure(&self, key: &str) -> u32 {
        self.attempts.write().await.record_failure(key)
    }

    pub async fn reset_attempts(&self, key: &str) {
        self.attempts.write().await.reset(key);
    }

    /// Build the user-facing failure message, adding the contact-support hint
    /// once the attempt count passes the configured threshold.
    pub fn failure_message(&self, error: &AuthError, attempts: u32) -> String {
        let mut message = error.user_message();
        if attempts >= self.config.support_hint_threshold {
            message.push_str(" Too many failed attempts. Please contact us.");
        }
        message
    }

    /// Append an access record to the local log. Best-effort: failures are
    /// logged and swallowed, never surfaced to the login flow.
    pub fn log_access(&self, token: &str, user_agent: &str) {
        let Some(log_path) = self.config.access_log.clone() else {
            return;
        };

        let record = AccessRecord {
            token: token.to_string(),
            timestamp: Utc::now(),
            user_agent: user_agent.to_string(),
        };

        tokio::spawn(async move {
            let line = match serde_json::to_string(&record) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to serialize access record: {}", e);
                    return;
                }
            };

            use tokio::io::AsyncWriteExt;
            let result = async {
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&log_path)
                    .await?;
                file.write_all(line.as_bytes()).await?;
                file.write_all(b"\n").await
            }
            .await;

            if let Err(e) = result {
                warn!("Failed to append access record: {}", e);
            }
        });
    }

    /// Record a downloaded photo name on the client's directory entry.
    /// Best-effort and only possible for file-backed directories.
    pub fn record_download(&self, token: &str, photo_name: &str) {
        let Some(path) = self.provider.source().as_file_path().cloned() else {
            return;
        };
        let token = token.to_string();
        let photo_name = photo_name.to_string();

        tokio::spawn(async move {
            let result = async {
                let mut directory = TokenDirectory::load_from_file(&path).await?;
                if let Some(record) = directory.get_mut(&token)
                    && !record.download_log.contains(&photo_name)
                {
                    record.download_log.push(photo_name.clone());
                    directory.save_to_file(&path).await?;
                    info!("Recorded download of {} for {}", photo_name, token);
                }
                Ok::<(), std::io::Error>(())
            }
            .await;

            if let Err(e) = result {
                warn!("Failed to record download: {}", e);
            }
        });
    }

}

/// The pure validation rules over a directory entry. Deactivation wins over
/// expiry, and the expiry comparison is strictly greater-than: a token that
/// expires exactly now is still valid for that instant.
pub fn evaluate(record: &ClientToken, now: DateTime<Utc>) -> Result<ClientView, AuthError> {
    if !record.active {
        return Err(AuthError::Deactivated);
    }

    let expires_at = record.expiry().ok_or_else(|| {
        AuthError::Validation(format!("Unparseable expiry timestamp: {}", record.expires_at))
    })?;

    if now > expires_at {
        return Err(AuthError::Expired);
    }

    Ok(ClientView {
        owner: record.owner.clone(),
        category: record.category.clone(),
        albums: record.resolved_albums(),
        expires_at,
        days_remaining: (expires_at - now).num_days(),
    })
}
