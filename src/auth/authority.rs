use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    auth::{claims::SessionClaims, jwt::JwtKeys, password, reset},
    config::{AuthConfig, MAX_RESET_TTL_MINUTES},
    error::{AuthError, AuthResult},
    users::{Role, UserRecord},
};

/// Owns every rule for turning passwords into stored secrets and for issuing the
/// session and reset proofs derived from them. Immutable once built.
#[derive(Debug, Clone)]
pub struct Authority {
    keys: JwtKeys,
    cost: u32,
    reset_window: Duration,
}

impl Authority {
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        let keys = JwtKeys::new(&config.jwt)?;
        if !(password::MIN_COST..=password::MAX_COST).contains(&config.password_cost) {
            return Err(AuthError::Configuration(format!(
                "password hash cost {} out of range",
                config.password_cost
            )));
        }
        if !(1..=MAX_RESET_TTL_MINUTES).contains(&config.reset_ttl_minutes) {
            return Err(AuthError::Configuration(format!(
                "reset token window must be between 1 and {MAX_RESET_TTL_MINUTES} minutes"
            )));
        }
        Ok(Self {
            keys,
            cost: config.password_cost,
            reset_window: Duration::minutes(config.reset_ttl_minutes),
        })
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub fn reset_window(&self) -> Duration {
        self.reset_window
    }

    pub async fn derive_secret(&self, plain: &str) -> AuthResult<String> {
        password::hash_password_blocking(plain, self.cost).await
    }

    pub async fn verify_password(&self, presented: &str, stored: &str) -> AuthResult<bool> {
        password::verify_password_blocking(presented, stored).await
    }

    /// Derive-before-persist step. `Some` replaces the stored secret; `None` leaves the
    /// record untouched so that saving it again is idempotent. Returns whether the
    /// secret was replaced.
    pub async fn apply_password_change(
        &self,
        user: &mut UserRecord,
        changed: Option<&str>,
    ) -> AuthResult<bool> {
        let Some(plain) = changed else {
            return Ok(false);
        };
        user.password_secret = self.derive_secret(plain).await?;
        debug!(user_id = %user.id, "password secret derived");
        Ok(true)
    }

    pub fn issue_session_token(
        &self,
        user_id: Uuid,
        role: Role,
        now: OffsetDateTime,
    ) -> AuthResult<String> {
        self.keys.sign(user_id, role, now)
    }

    pub fn verify_session_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> AuthResult<SessionClaims> {
        self.keys.verify_at(token, now)
    }

    /// Stores a fresh reset digest and expiry on `user` and returns the plaintext proof,
    /// which is not kept anywhere. Persisting the record is up to the caller.
    pub fn issue_reset_proof(
        &self,
        user: &mut UserRecord,
        now: OffsetDateTime,
    ) -> AuthResult<String> {
        let proof = reset::issue(now, self.reset_window)?;
        user.set_pending_reset(proof.hash, proof.expires_at);
        info!(user_id = %user.id, expires_at = %proof.expires_at, "reset proof issued");
        Ok(proof.token)
    }

    pub fn verify_reset_proof(
        &self,
        presented: &str,
        stored_hash: &str,
        stored_expiry: OffsetDateTime,
        now: OffsetDateTime,
    ) -> bool {
        reset::verify(presented, stored_hash, stored_expiry, now)
    }

    /// Checks `presented` against whatever reset is pending on `user`.
    pub fn verify_pending_reset(
        &self,
        user: &UserRecord,
        presented: &str,
        now: OffsetDateTime,
    ) -> bool {
        match user.pending_reset() {
            Some((hash, expiry)) => self.verify_reset_proof(presented, hash, expiry, now),
            None => false,
        }
    }
}
