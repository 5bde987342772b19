// Client token authentication - directory lookup, session cookies, access log
mod directory;
mod error;
mod guard;
mod handlers;
mod types;

#[cfg(test)]
mod tests;

pub use directory::{DirectoryProvider, DirectorySource};
pub use error::AuthError;
pub use guard::SessionGuard;
pub use handlers::{authenticate_handler, logout_handler, verify_handler};
pub(crate) use handlers::{client_key, user_agent};
pub use types::*;

use axum::http::HeaderMap;
use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";

pub fn create_signed_cookie(secret: &str, value: &str) -> Result<String, String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "Invalid secret key")?;
    mac.update(value.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);
    Ok(format!("{}:{}", value, signature_b64))
}

pub fn verify_signed_cookie(secret: &str, signed_value: &str) -> bool {
    if let Some((value, signature_b64)) = signed_value.rsplit_once(':')
        && let Ok(signature) = general_purpose::URL_SAFE_NO_PAD.decode(signature_b64)
        && let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes())
    {
        mac.update(value.as_bytes());
        return mac.verify_slice(&signature).is_ok();
    }
    false
}

pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get("cookie")?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let cookie = cookie.trim();
            if let Some((key, value)) = cookie.split_once('=') {
                if key.trim() == name {
                    Some(value.trim().to_string())
                } else {
                    None
                }
            } else {
                None
            }
        })
}

/// Extract the validated token from the session cookie, if the signature holds.
pub fn session_token(headers: &HeaderMap, secret: &str) -> Option<String> {
    get_cookie_value(headers, SESSION_COOKIE).and_then(|signed_value| {
        if verify_signed_cookie(secret, &signed_value) {
            signed_value.rsplit_once(':').map(|(t, _)| t.to_string())
        } else {
            None
        }
    })
}

pub fn session_cookie_header(secret: &str, token: &str, max_age_secs: u64) -> Option<String> {
    create_signed_cookie(secret, token).ok().map(|signed| {
        format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, signed, max_age_secs
        )
    })
}

pub fn clear_session_cookie_header() -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE)
}
