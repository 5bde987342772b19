use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

/// One client record in the token directory. Field names follow the external
/// JSON document the photographer's tooling maintains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientToken {
    #[serde(rename = "cliente")]
    pub owner: String,
    #[serde(rename = "categoria")]
    pub category: String,
    /// Legacy single-album field, superseded by `pastas_permitidas`.
    #[serde(rename = "pasta", default, skip_serializing_if = "Option::is_none")]
    pub legacy_album: Option<String>,
    #[serde(
        rename = "pastas_permitidas",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub allowed_albums: Vec<String>,
    #[serde(rename = "ativo")]
    pub active: bool,
    #[serde(rename = "criado_em")]
    pub created_at: String,
    #[serde(rename = "expira_em")]
    pub expires_at: String,
    #[serde(rename = "fotos_baixadas", default)]
    pub download_log: Vec<String>,
}

impl ClientToken {
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.expires_at)
    }

    /// Allowed albums come from the list field when present, falling back to
    /// the legacy single-album field.
    pub fn resolved_albums(&self) -> Vec<String> {
        if !self.allowed_albums.is_empty() {
            return self.allowed_albums.clone();
        }
        self.legacy_album
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| vec![a.to_string()])
            .unwrap_or_default()
    }
}

/// Parse the timestamps the directory carries. Entries written by hand are
/// sometimes date-only; those count as midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

/// The token directory document: a JSON object keyed by token string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenDirectory {
    pub tokens: HashMap<String, ClientToken>,
}

impl TokenDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let contents = fs::read_to_string(path).await?;
        serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub async fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents).await?;
        Ok(())
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, token: &str) -> Option<&ClientToken> {
        self.tokens.get(token)
    }

    pub fn get_mut(&mut self, token: &str) -> Option<&mut ClientToken> {
        self.tokens.get_mut(token)
    }

    pub fn insert(&mut self, token: String, record: ClientToken) {
        self.tokens.insert(token, record);
    }

    /// Revocation flips the active flag; entries are never removed.
    pub fn revoke(&mut self, token: &str) -> bool {
        if let Some(record) = self.tokens.get_mut(token) {
            record.active = false;
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Normalized view of a validated token, shaped for display.
#[derive(Debug, Clone, Serialize)]
pub struct ClientView {
    pub owner: String,
    pub category: String,
    pub albums: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub days_remaining: i64,
}

#[derive(Debug, Serialize)]
pub struct AccessRecord {
    pub token: String,
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
}

/// Per-client failed attempt counter. Attempts are never locked out; past the
/// threshold the error message gains a contact-support hint.
#[derive(Debug, Default)]
pub struct AttemptTracker {
    attempts: HashMap<String, u32>,
}

impl AttemptTracker {
    pub fn record_failure(&mut self, key: &str) -> u32 {
        let count = self.attempts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn reset(&mut self, key: &str) {
        self.attempts.remove(key);
    }

    pub fn count(&self, key: &str) -> u32 {
        self.attempts.get(key).copied().unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientView>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub authorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientView>,
}
