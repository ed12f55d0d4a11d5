use tracing::error;

use crate::error::{AuthError, AuthResult};

/// Work factor used when none is configured.
pub const DEFAULT_COST: u32 = 10;

/// Range bcrypt accepts for the work factor.
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// Longest accepted plaintext, counted in characters.
///
/// Inherited from the account schema; bcrypt itself takes up to 72 bytes.
pub const MAX_PASSWORD_CHARS: usize = 6;

pub fn check_password_policy(plain: &str) -> AuthResult<()> {
    if plain.is_empty() {
        return Err(AuthError::Validation("Please enter password".into()));
    }
    if plain.chars().count() > MAX_PASSWORD_CHARS {
        return Err(AuthError::Validation(format!(
            "Password cannot exceed {MAX_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

pub fn hash_password(plain: &str, cost: u32) -> AuthResult<String> {
    check_password_policy(plain)?;
    bcrypt::hash(plain, cost).map_err(|e| {
        error!(error = %e, "bcrypt hash error");
        AuthError::Hashing(e.to_string())
    })
}

/// Compares `plain` against a stored bcrypt string. A mismatch is `Ok(false)`; only an
/// absent or unparsable stored value is an error.
pub fn verify_password(plain: &str, hash: &str) -> AuthResult<bool> {
    if hash.is_empty() {
        return Err(AuthError::MalformedSecret("stored secret is empty".into()));
    }
    bcrypt::verify(plain, hash).map_err(|e| {
        error!(error = %e, "bcrypt parse hash error");
        AuthError::MalformedSecret(e.to_string())
    })
}

/// Runs [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(plain: &str, cost: u32) -> AuthResult<String> {
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&plain, cost))
        .await
        .map_err(|e| AuthError::Hashing(format!("task join error: {e}")))?
}

/// Runs [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(plain: &str, hash: &str) -> AuthResult<bool> {
    let plain = plain.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .map_err(|e| AuthError::Hashing(format!("task join error: {e}")))?
}
