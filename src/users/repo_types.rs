use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Flat role stored alongside the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,                       // assigned by storage
    pub name: String,
    pub email: String,                  // normalized, unique
    #[serde(skip_serializing)]
    pub password_secret: String,        // bcrypt string, never the plaintext
    pub avatar: Option<String>,
    pub role: Role,
    #[serde(skip_serializing)]
    reset_proof_hash: Option<String>,
    #[serde(skip_serializing)]
    reset_proof_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Fields supplied when a user is first stored. `password_secret` must already be derived.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_secret: String,
    pub avatar: Option<String>,
    pub role: Role,
}

impl UserRecord {
    pub fn new(id: Uuid, new: NewUser, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            name: new.name,
            email: new.email,
            password_secret: new.password_secret,
            avatar: new.avatar,
            role: new.role,
            reset_proof_hash: None,
            reset_proof_expiry: None,
            created_at,
        }
    }

    /// Digest and expiry of the outstanding reset proof, if any.
    pub fn pending_reset(&self) -> Option<(&str, OffsetDateTime)> {
        match (&self.reset_proof_hash, self.reset_proof_expiry) {
            (Some(hash), Some(expiry)) => Some((hash.as_str(), expiry)),
            _ => None,
        }
    }

    pub fn set_pending_reset(&mut self, hash: String, expires_at: OffsetDateTime) {
        self.reset_proof_hash = Some(hash);
        self.reset_proof_expiry = Some(expires_at);
    }

    pub fn clear_pending_reset(&mut self) {
        self.reset_proof_hash = None;
        self.reset_proof_expiry = None;
    }
}
