// ====================================
// tests/integration/auth_flow_tests.rs
// ====================================
//! End-to-end use cases through `AuthSession`, without the HTTP layer.
use crate::test_utils::{register_request, setup_file_state, setup_state, PASSWORD};
use authgate_backend::auth::{AuthError, OtpError};
use authgate_common::{LoginRequest, ResetPasswordRequest, UpdateProfileRequest};
use chrono::{Duration, Utc};

fn login_request(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_register_then_login() {
    let (state, _) = setup_state();
    let session = &state.session;

    let profile = session
        .register(register_request("alice", "alice@example.com"))
        .await
        .unwrap();
    assert_eq!(profile.username, "alice");
    assert_eq!(profile.email, "alice@example.com");

    let now = Utc::now();
    let outcome = session
        .login(login_request("alice@example.com", PASSWORD), now)
        .await
        .unwrap();
    assert_eq!(outcome.profile.id, profile.id);
    assert_ne!(outcome.access.token, outcome.refresh.token);

    let claims = session.authenticate(&outcome.access.token, now).unwrap();
    assert_eq!(claims.subject_id, profile.id);
}

#[tokio::test]
async fn test_register_rejects_duplicates() {
    let (state, _) = setup_state();
    let session = &state.session;
    session
        .register(register_request("alice", "alice@example.com"))
        .await
        .unwrap();

    let err = session
        .register(register_request("someone", "alice@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateEmail));

    let err = session
        .register(register_request("alice", "other@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateUsername));
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let (state, _) = setup_state();
    let mut req = register_request("alice", "alice@example.com");
    req.password = "alllowercase1".to_string();

    let err = state.session.register(req).await.unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword(_)));

    // nothing was stored
    let err = state
        .session
        .login(login_request("alice@example.com", "alllowercase1"), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (state, _) = setup_state();
    state
        .session
        .register(register_request("alice", "alice@example.com"))
        .await
        .unwrap();

    let wrong_password = state
        .session
        .login(login_request("alice@example.com", "Wr0ngPassword"), Utc::now())
        .await
        .unwrap_err();
    let unknown_email = state
        .session
        .login(login_request("nobody@example.com", PASSWORD), Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[tokio::test]
async fn test_logout_revokes_access_token() {
    let (state, _) = setup_state();
    let session = &state.session;
    session
        .register(register_request("alice", "alice@example.com"))
        .await
        .unwrap();
    let now = Utc::now();
    let outcome = session
        .login(login_request("alice@example.com", PASSWORD), now)
        .await
        .unwrap();

    session.logout(&outcome.access.token, now).unwrap();
    assert!(session.blacklist().is_revoked(&outcome.access.token));

    let err = session.authenticate(&outcome.access.token, now).unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));

    // the refresh token is not revoked by logout
    let access = session.refresh(&outcome.refresh.token, now).unwrap();
    assert!(session.authenticate(&access.token, now).is_ok());
}

#[tokio::test]
async fn test_refresh_flow() {
    let (state, _) = setup_state();
    let session = &state.session;
    let profile = session
        .register(register_request("alice", "alice@example.com"))
        .await
        .unwrap();
    let now = Utc::now();
    let outcome = session
        .login(login_request("alice@example.com", PASSWORD), now)
        .await
        .unwrap();

    let later = now + Duration::minutes(90);
    // the original access token has expired by now
    assert!(session.authenticate(&outcome.access.token, later).is_err());

    let access = session.refresh(&outcome.refresh.token, later).unwrap();
    assert_eq!(access.claims.subject_id, profile.id);
    assert!(session.authenticate(&access.token, later).is_ok());

    // an access token is not accepted where a refresh token is expected
    assert!(matches!(
        session.refresh(&outcome.access.token, now),
        Err(AuthError::InvalidToken)
    ));

    let past_expiry = now + Duration::hours(25);
    assert!(matches!(
        session.refresh(&outcome.refresh.token, past_expiry),
        Err(AuthError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_update_profile() {
    let (state, _) = setup_state();
    let session = &state.session;
    let alice = session
        .register(register_request("alice", "alice@example.com"))
        .await
        .unwrap();
    session
        .register(register_request("bob", "bob@example.com"))
        .await
        .unwrap();

    let err = session
        .update_profile(alice.id, UpdateProfileRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NoFieldsToUpdate));

    let err = session
        .update_profile(
            alice.id,
            UpdateProfileRequest {
                username: Some("bob".to_string()),
                password: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateUsername));

    let updated = session
        .update_profile(
            alice.id,
            UpdateProfileRequest {
                username: Some("alice2".to_string()),
                password: Some("N3wPassword".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.username, "alice2");
    assert!(updated.updated_at >= alice.updated_at);

    assert!(session
        .login(login_request("alice@example.com", PASSWORD), Utc::now())
        .await
        .is_err());
    assert!(session
        .login(login_request("alice@example.com", "N3wPassword"), Utc::now())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_profile_of_unknown_user() {
    let (state, _) = setup_state();
    let err = state.session.profile(42).await.unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound));
}

#[tokio::test]
async fn test_password_reset_flow() {
    let (state, delivery) = setup_state();
    let session = &state.session;
    session
        .register(register_request("alice", "alice@example.com"))
        .await
        .unwrap();

    let now = Utc::now();
    session.forgot_password("alice@example.com", now).await.unwrap();
    let code = delivery.last_code("alice@example.com").unwrap();
    assert_eq!(code.len(), 6);

    let reset = |otp: &str, password: &str| ResetPasswordRequest {
        email: "alice@example.com".to_string(),
        otp: otp.to_string(),
        new_password: password.to_string(),
    };

    // a weak password does not spend the code
    let err = session.reset_password(reset(&code, "weak"), now).await.unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword(_)));

    let wrong = if code == "000000" { "111111" } else { "000000" };
    let err = session.reset_password(reset(wrong, "N3wPassword"), now).await.unwrap_err();
    assert!(matches!(err, AuthError::Otp(OtpError::Mismatch)));

    session.reset_password(reset(&code, "N3wPassword"), now).await.unwrap();

    // single use
    let err = session.reset_password(reset(&code, "N3wPassword"), now).await.unwrap_err();
    assert!(matches!(err, AuthError::Otp(OtpError::NotFound)));

    assert!(session
        .login(login_request("alice@example.com", "N3wPassword"), now)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_password_reset_code_expires() {
    let (state, delivery) = setup_state();
    let session = &state.session;
    session
        .register(register_request("alice", "alice@example.com"))
        .await
        .unwrap();

    let now = Utc::now();
    session.forgot_password("alice@example.com", now).await.unwrap();
    let code = delivery.last_code("alice@example.com").unwrap();

    let err = session
        .reset_password(
            ResetPasswordRequest {
                email: "alice@example.com".to_string(),
                otp: code,
                new_password: "N3wPassword".to_string(),
            },
            now + Duration::minutes(6),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Otp(OtpError::Expired)));
}

#[tokio::test]
async fn test_forgot_password_for_unknown_email_is_silent() {
    let (state, delivery) = setup_state();
    state
        .session
        .forgot_password("nobody@example.com", Utc::now())
        .await
        .unwrap();
    assert_eq!(delivery.sent_count(), 0);
}

#[tokio::test]
async fn test_reissued_code_replaces_previous() {
    let (state, delivery) = setup_state();
    let session = &state.session;
    session
        .register(register_request("alice", "alice@example.com"))
        .await
        .unwrap();

    let now = Utc::now();
    session.forgot_password("alice@example.com", now).await.unwrap();
    let first = delivery.last_code("alice@example.com").unwrap();
    session.forgot_password("alice@example.com", now).await.unwrap();
    let second = delivery.last_code("alice@example.com").unwrap();

    if first != second {
        let err = session
            .reset_password(
                ResetPasswordRequest {
                    email: "alice@example.com".to_string(),
                    otp: first,
                    new_password: "N3wPassword".to_string(),
                },
                now,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Otp(OtpError::Mismatch)));
    }

    session
        .reset_password(
            ResetPasswordRequest {
                email: "alice@example.com".to_string(),
                otp: second,
                new_password: "N3wPassword".to_string(),
            },
            now,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_flat_file_store_backs_the_full_flow() {
    let (state, delivery, _temp_dir) = setup_file_state().await;
    let session = &state.session;
    session
        .register(register_request("alice", "alice@example.com"))
        .await
        .unwrap();

    let now = Utc::now();
    session.forgot_password("alice@example.com", now).await.unwrap();
    let code = delivery.last_code("alice@example.com").unwrap();
    session
        .reset_password(
            ResetPasswordRequest {
                email: "alice@example.com".to_string(),
                otp: code,
                new_password: "N3wPassword".to_string(),
            },
            now,
        )
        .await
        .unwrap();

    assert!(session
        .login(login_request("alice@example.com", "N3wPassword"), now)
        .await
        .is_ok());
}
