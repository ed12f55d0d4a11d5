use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::error::{AuthError, AuthResult};

/// Random bytes behind every reset proof.
pub const RESET_PROOF_BYTES: usize = 20;

/// A freshly issued reset proof. `token` goes to the user once; only `hash` and
/// `expires_at` are kept.
#[derive(Debug, Clone)]
pub struct ResetProof {
    pub token: String,
    pub hash: String,
    pub expires_at: OffsetDateTime,
}

pub fn issue(now: OffsetDateTime, window: Duration) -> AuthResult<ResetProof> {
    let expires_at = now
        .checked_add(window)
        .ok_or_else(|| AuthError::Configuration("reset expiry out of range".into()))?;
    let mut bytes = [0u8; RESET_PROOF_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let hash = digest(&token);
    Ok(ResetProof {
        token,
        hash,
        expires_at,
    })
}

/// Hex SHA-256 of the proof as delivered to the user.
pub fn digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// True only when the digest matches and `now` has not passed `expires_at`.
pub fn verify(
    presented: &str,
    stored_hash: &str,
    expires_at: OffsetDateTime,
    now: OffsetDateTime,
) -> bool {
    digests_match(&digest(presented), stored_hash) && now <= expires_at
}

/// Compares two hex digests without short-circuiting on the first differing byte.
fn digests_match(computed: &str, stored: &str) -> bool {
    let (computed, stored) = (computed.as_bytes(), stored.as_bytes());
    if computed.len() != stored.len() {
        return false;
    }
    computed
        .iter()
        .zip(stored)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
