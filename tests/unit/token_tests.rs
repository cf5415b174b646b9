// ==========================
// tests/unit/token_tests.rs
// ==========================
//! Token issuance, validation and revocation
use authgate_backend::auth::{TokenBlacklist, TokenConfig, TokenError, TokenKind, TokenService};
use chrono::{Duration, Utc};
use std::time::Duration as StdDuration;

fn service() -> TokenService {
    TokenService::new(&TokenConfig {
        access_secret: "unit-access".to_string(),
        refresh_secret: "unit-refresh".to_string(),
        access_ttl: StdDuration::from_secs(3600),
        refresh_ttl: StdDuration::from_secs(86400),
    })
    .unwrap()
}

#[test]
fn test_issue_and_validate() {
    let tokens = service();
    let now = Utc::now();

    let issued = tokens.issue(7, TokenKind::Access, now).unwrap();
    assert_eq!(issued.claims.subject_id, 7);
    assert_eq!(issued.claims.expires_at - issued.claims.issued_at, Duration::hours(1));

    let claims = tokens.validate(&issued.token, TokenKind::Access, now).unwrap();
    assert_eq!(claims, issued.claims);
}

#[test]
fn test_expiry_boundary() {
    let tokens = service();
    let now = Utc::now();
    let issued = tokens.issue(7, TokenKind::Access, now).unwrap();
    let expires_at = issued.claims.expires_at;

    assert!(tokens
        .validate(&issued.token, TokenKind::Access, expires_at - Duration::seconds(1))
        .is_ok());
    assert_eq!(
        tokens.validate(&issued.token, TokenKind::Access, expires_at),
        Err(TokenError::Expired)
    );
}

#[test]
fn test_kinds_are_not_interchangeable() {
    let tokens = service();
    let now = Utc::now();
    let access = tokens.issue(7, TokenKind::Access, now).unwrap();
    let refresh = tokens.issue(7, TokenKind::Refresh, now).unwrap();

    assert_eq!(
        tokens.validate(&access.token, TokenKind::Refresh, now),
        Err(TokenError::BadSignature)
    );
    assert_eq!(
        tokens.validate(&refresh.token, TokenKind::Access, now),
        Err(TokenError::BadSignature)
    );
    assert_eq!(
        tokens.validate("garbage", TokenKind::Access, now),
        Err(TokenError::Malformed)
    );
}

#[test]
fn test_refresh_keeps_subject() {
    let tokens = service();
    let now = Utc::now();
    let refresh = tokens.issue(11, TokenKind::Refresh, now).unwrap();

    let access = tokens.refresh(&refresh.token, now + Duration::hours(2)).unwrap();
    assert_eq!(access.claims.subject_id, 11);
    assert_eq!(access.claims.issued_at.timestamp(), (now + Duration::hours(2)).timestamp());

    // not rotated: the same refresh token works again
    assert!(tokens.refresh(&refresh.token, now + Duration::hours(3)).is_ok());
}

#[test]
fn test_tokens_issued_together_differ() {
    let tokens = service();
    let now = Utc::now();
    let a = tokens.issue(1, TokenKind::Access, now).unwrap();
    let b = tokens.issue(1, TokenKind::Access, now).unwrap();
    assert_ne!(a.token, b.token);
}

#[test]
fn test_service_rejects_bad_config() {
    let mut config = TokenConfig {
        access_secret: "same".to_string(),
        refresh_secret: "same".to_string(),
        access_ttl: StdDuration::from_secs(60),
        refresh_ttl: StdDuration::from_secs(60),
    };
    assert!(TokenService::new(&config).is_err());

    config.refresh_secret = String::new();
    assert!(TokenService::new(&config).is_err());

    config.refresh_secret = "other".to_string();
    config.access_ttl = StdDuration::ZERO;
    assert!(TokenService::new(&config).is_err());
}

#[test]
fn test_blacklist_entries_expire_with_the_token() {
    let tokens = service();
    let blacklist = TokenBlacklist::new();
    let now = Utc::now();
    let issued = tokens.issue(3, TokenKind::Access, now).unwrap();

    blacklist.revoke(&issued.token, issued.claims.expires_at, now);
    assert!(blacklist.is_revoked(&issued.token));

    assert_eq!(blacklist.prune_expired(now), 0);
    assert_eq!(blacklist.prune_expired(issued.claims.expires_at), 1);
    assert!(blacklist.is_empty());
}
