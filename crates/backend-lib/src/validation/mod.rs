// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request payload validation.
//!
//! Shape checks only: presence, length and format. Password strength is the
//! password policy's job and happens inside the use cases.

use authgate_common::{
    ForgotPasswordRequest, LoginRequest, RefreshRequest, RegisterRequest, ResetPasswordRequest,
    UpdateProfileRequest,
};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 50;
const MAX_FULL_NAME_LENGTH: usize = 100;
const MIN_PASSWORD_INPUT_LENGTH: usize = 6;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex")
});
static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("username regex"));
static OTP_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{6}$").expect("otp regex"));

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} is not valid email")]
    InvalidEmail(&'static str),

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{0} contains invalid characters")]
    InvalidCharacters(&'static str),

    #[error("otp must be 6 digits")]
    InvalidOtp,
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

fn required<'a>(field: &'static str, value: &'a str) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(value)
}

/// Trim and lower-case an email, then check its format
pub fn normalize_email(field: &'static str, email: &str) -> ValidationResult<String> {
    let email = required(field, email)?;
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_EMAIL_LENGTH,
        });
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(field));
    }
    Ok(email.to_lowercase())
}

/// Check and trim a username
pub fn validate_username(username: &str) -> ValidationResult<String> {
    let username = required("username", username)?;
    let len = username.chars().count();
    if len < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort {
            field: "username",
            min: MIN_USERNAME_LENGTH,
        });
    }
    if len > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "username",
            max: MAX_USERNAME_LENGTH,
        });
    }
    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::InvalidCharacters("username"));
    }
    Ok(username.to_string())
}

/// Minimal shape check; strength rules are applied later by the policy
fn check_password_input(field: &'static str, password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required(field));
    }
    if password.chars().count() < MIN_PASSWORD_INPUT_LENGTH {
        return Err(ValidationError::TooShort {
            field,
            min: MIN_PASSWORD_INPUT_LENGTH,
        });
    }
    Ok(())
}

pub fn validate_register(mut req: RegisterRequest) -> ValidationResult<RegisterRequest> {
    let full_name = required("full_name", &req.full_name)?;
    if full_name.chars().count() > MAX_FULL_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "full_name",
            max: MAX_FULL_NAME_LENGTH,
        });
    }
    req.full_name = full_name.to_string();
    req.username = validate_username(&req.username)?;
    req.email = normalize_email("email", &req.email)?;
    check_password_input("password", &req.password)?;
    Ok(req)
}

pub fn validate_login(mut req: LoginRequest) -> ValidationResult<LoginRequest> {
    req.email = normalize_email("email", &req.email)?;
    check_password_input("password", &req.password)?;
    Ok(req)
}

pub fn validate_refresh(req: RefreshRequest) -> ValidationResult<RefreshRequest> {
    required("refresh_token", &req.refresh_token)?;
    Ok(req)
}

/// Empty strings count as absent, so `{"username": ""}` is an empty update
pub fn validate_update_profile(
    req: UpdateProfileRequest,
) -> ValidationResult<UpdateProfileRequest> {
    let username = match req.username.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Some(validate_username(name)?),
        _ => None,
    };
    let password = match req.password {
        Some(password) if !password.is_empty() => {
            check_password_input("password", &password)?;
            Some(password)
        }
        _ => None,
    };
    Ok(UpdateProfileRequest { username, password })
}

pub fn validate_forgot_password(
    mut req: ForgotPasswordRequest,
) -> ValidationResult<ForgotPasswordRequest> {
    req.email = normalize_email("email", &req.email)?;
    Ok(req)
}

pub fn validate_reset_password(
    mut req: ResetPasswordRequest,
) -> ValidationResult<ResetPasswordRequest> {
    req.email = normalize_email("email", &req.email)?;
    req.otp = required("otp", &req.otp)?.to_string();
    if !OTP_REGEX.is_match(&req.otp) {
        return Err(ValidationError::InvalidOtp);
    }
    check_password_input("new_password", &req.new_password)?;
    Ok(req)
}
