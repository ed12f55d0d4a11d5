use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::password::check_password_policy;
use crate::error::{AuthError, AuthResult};

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn validate_name(name: &str) -> AuthResult<()> {
    if name.trim().is_empty() {
        return Err(AuthError::Validation("Please enter name".into()));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AuthResult<()> {
    if email.is_empty() {
        return Err(AuthError::Validation("Please enter email".into()));
    }
    if !is_valid_email(email) {
        return Err(AuthError::Validation("Please enter valid email address".into()));
    }
    Ok(())
}

/// Field checks a new record must pass before any password derivation happens.
pub fn validate_new_user(name: &str, email: &str, password: &str) -> AuthResult<()> {
    validate_name(name)?;
    validate_email(email)?;
    check_password_policy(password)
}
