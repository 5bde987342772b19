#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::AuthConfig;
    use crate::auth::guard::evaluate;
    use chrono::{Duration, Utc};
    use std::fs;
    use tempfile::TempDir;

    fn record(active: bool, expires_at: &str) -> ClientToken {
        ClientToken {
            owner: "Maria".to_string(),
            category: "casamento".to_string(),
            legacy_album: None,
            allowed_albums: vec!["casamento".to_string()],
            active,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            expires_at: expires_at.to_string(),
            download_log: Vec::new(),
        }
    }

    fn test_config(directory_source: &str) -> AuthConfig {
        AuthConfig {
            directory_source: directory_source.to_string(),
            min_token_length: 8,
            directory_fetch_retries: 1,
            retry_base_delay_ms: 1,
            support_hint_threshold: 3,
            access_log: None,
            session_max_age_secs: 3600,
        }
    }

    #[test]
    fn deactivated_wins_over_expiry() {
        // Deactivated even though the expiry is far in the future
        let record = record(false, "2999-01-01T00:00:00Z");
        let result = evaluate(&record, Utc::now());
        assert!(matches!(result, Err(AuthError::Deactivated)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let record = record(true, "2020-01-01T00:00:00Z");
        let result = evaluate(&record, Utc::now());
        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[test]
    fn expiry_boundary_is_strictly_greater_than() {
        let now = Utc::now();
        let record = record(true, &now.to_rfc3339());
        // A token expiring exactly now is still valid for that instant
        let result = evaluate(&record, now);
        assert!(result.is_ok());

        let result = evaluate(&record, now + Duration::seconds(1));
        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[test]
    fn unparseable_expiry_is_a_validation_error() {
        let record = record(true, "next tuesday");
        let result = evaluate(&record, Utc::now());
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }

    #[test]
    fn client_view_carries_days_remaining() {
        let now = Utc::now();
        let record = record(true, &(now + Duration::days(10)).to_rfc3339());
        let view = evaluate(&record, now).unwrap();
        assert_eq!(view.owner, "Maria");
        assert_eq!(view.albums, vec!["casamento"]);
        assert!(view.days_remaining == 9 || view.days_remaining == 10);
    }

    #[test]
    fn resolved_albums_prefers_the_list_field() {
        let mut record = record(true, "2999-01-01");
        record.legacy_album = Some("ignored".to_string());
        assert_eq!(record.resolved_albums(), vec!["casamento"]);
    }

    #[test]
    fn resolved_albums_falls_back_to_legacy_field() {
        let mut record = record(true, "2999-01-01");
        record.allowed_albums.clear();
        record.legacy_album = Some("  batizado  ".to_string());
        assert_eq!(record.resolved_albums(), vec!["batizado"]);

        record.legacy_album = Some("   ".to_string());
        assert!(record.resolved_albums().is_empty());
    }

    #[test]
    fn timestamps_parse_rfc3339_and_date_only() {
        assert!(parse_timestamp("2025-06-01T12:30:00Z").is_some());
        assert!(parse_timestamp("2025-06-01T12:30:00+02:00").is_some());
        assert!(parse_timestamp("2025-06-01T12:30:00").is_some());

        // Hand-written entries are often date-only; that's midnight UTC
        let midnight = parse_timestamp("2025-06-01").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2025-06-01T00:00:00+00:00");

        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn directory_lookup_is_case_sensitive() {
        let json = r#"{
            "ABC12345": {
                "cliente": "Maria",
                "categoria": "batizado",
                "pastas_permitidas": ["batizado"],
                "ativo": true,
                "criado_em": "2024-01-01",
                "expira_em": "2999-01-01"
            }
        }"#;
        let directory: TokenDirectory = serde_json::from_str(json).unwrap();

        assert!(directory.get("abc12345").is_none());
        let record = directory.get("ABC12345").unwrap();
        assert_eq!(record.resolved_albums(), vec!["batizado"]);
    }

    #[test]
    fn revoke_keeps_the_entry() {
        let mut directory = TokenDirectory::new();
        directory.insert("TOKEN123".to_string(), record(true, "2999-01-01"));

        assert!(directory.revoke("TOKEN123"));
        assert!(!directory.revoke("MISSING1"));

        let record = directory.get("TOKEN123").unwrap();
        assert!(!record.active);
    }

    #[test]
    fn attempt_tracker_counts_and_resets() {
        let mut tracker = AttemptTracker::default();
        assert_eq!(tracker.count("1.2.3.4"), 0);
        assert_eq!(tracker.record_failure("1.2.3.4"), 1);
        assert_eq!(tracker.record_failure("1.2.3.4"), 2);
        assert_eq!(tracker.record_failure("5.6.7.8"), 1);

        tracker.reset("1.2.3.4");
        assert_eq!(tracker.count("1.2.3.4"), 0);
        assert_eq!(tracker.count("5.6.7.8"), 1);
    }

    #[test]
    fn signed_cookies_round_trip_and_reject_tampering() {
        let secret = "test-secret";
        let signed = create_signed_cookie(secret, "ABC12345").unwrap();

        assert!(verify_signed_cookie(secret, &signed));
        assert!(!verify_signed_cookie("other-secret", &signed));

        let tampered = signed.replace("ABC12345", "XYZ12345");
        assert!(!verify_signed_cookie(secret, &tampered));
        assert!(!verify_signed_cookie(secret, "no-signature"));
    }

    #[test]
    fn session_token_extraction() {
        use axum::http::HeaderMap;

        let secret = "test-secret";
        let signed = create_signed_cookie(secret, "ABC12345").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            format!("other=1; {}={}", SESSION_COOKIE, signed).parse().unwrap(),
        );

        assert_eq!(session_token(&headers, secret), Some("ABC12345".to_string()));
        assert_eq!(session_token(&headers, "wrong-secret"), None);
    }

    #[tokio::test]
    async fn validate_rejects_short_tokens_before_the_fetch() {
        // The directory source doesn't exist; a short token must fail on
        // length alone, without surfacing a connection error.
        let guard = SessionGuard::new(test_config("/nonexistent/tokens.json"));
        let result = guard.validate("abc").await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn validate_looks_up_the_exact_token() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.json");
        fs::write(
            &path,
            r#"{
                "ABC12345": {
                    "cliente": "Maria",
                    "categoria": "batizado",
                    "pastas_permitidas": ["batizado"],
                    "ativo": true,
                    "criado_em": "2024-01-01",
                    "expira_em": "2999-01-01"
                }
            }"#,
        )
        .unwrap();

        let guard = SessionGuard::new(test_config(path.to_str().unwrap()));

        let view = guard.validate("ABC12345").await.unwrap();
        assert_eq!(view.albums, vec!["batizado"]);

        // Wrong case is NotFound, not a partial match
        let result = guard.validate("abc12345").await;
        assert!(matches!(result, Err(AuthError::NotFound)));

        // Surrounding whitespace is trimmed before the lookup
        let view = guard.validate("  ABC12345  ").await.unwrap();
        assert_eq!(view.owner, "Maria");
    }

    #[tokio::test]
    async fn unreachable_directory_is_a_connection_error() {
        let guard = SessionGuard::new(test_config("/nonexistent/tokens.json"));
        let result = guard.validate("ABC12345").await;
        assert!(matches!(result, Err(AuthError::Connection(_))));
    }

    #[tokio::test]
    async fn failure_message_gains_support_hint_past_the_threshold() {
        let guard = SessionGuard::new(test_config("tokens.json"));

        let message = guard.failure_message(&AuthError::NotFound, 1);
        assert!(!message.contains("contact us"));

        let message = guard.failure_message(&AuthError::NotFound, 3);
        assert!(message.contains("contact us"));
    }
}
