use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::claims::SessionClaims,
    config::{JwtConfig, MAX_SESSION_TTL},
    error::{AuthError, AuthResult},
    state::AppState,
    users::Role,
};

/// Holds HS256 signing and verification keys with the session lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDuration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> AuthResult<Self> {
        if config.secret.is_empty() {
            return Err(AuthError::Configuration("JWT secret is empty".into()));
        }
        if config.expires_in.is_zero() {
            return Err(AuthError::Configuration("JWT lifetime is zero".into()));
        }
        if config.expires_in > MAX_SESSION_TTL {
            return Err(AuthError::Configuration("JWT lifetime is too long".into()));
        }
        let ttl = TimeDuration::try_from(config.expires_in)
            .map_err(|e| AuthError::Configuration(format!("JWT lifetime out of range: {e}")))?;
        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl.whole_seconds().unsigned_abs())
    }

    /// Signs a token issued at `now`, expiring one lifetime later.
    pub fn sign(&self, user_id: Uuid, role: Role, now: OffsetDateTime) -> AuthResult<String> {
        let exp = now
            .checked_add(self.ttl)
            .ok_or_else(|| AuthError::Configuration("JWT expiry out of range".into()))?;
        let claims = SessionClaims {
            id: user_id,
            role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, role = ?role, "jwt signed");
        Ok(token)
    }

    /// Verifies against the wall clock.
    pub fn verify(&self, token: &str) -> AuthResult<SessionClaims> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Rejects a token whose signature does not match or whose `exp` is before `now`.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> AuthResult<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        if now.unix_timestamp() > data.claims.exp as i64 {
            return Err(AuthError::InvalidToken("token expired".into()));
        }
        debug!(user_id = %data.claims.id, "jwt verified");
        Ok(data.claims)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.authority.keys().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            expires_in: Duration::from_secs(3600),
        })
        .expect("keys should build")
    }

    fn now() -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    #[test]
    fn sign_and_verify_session_token() {
        let keys = make_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, Role::User, now()).expect("sign");
        assert_eq!(token.split('.').count(), 3);

        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.id, user_id);
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret");
        let issued = now() - TimeDuration::hours(2);
        let token = keys.sign(Uuid::new_v4(), Role::User, issued).unwrap();
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(msg) if msg.contains("expired")));
    }

    #[test]
    fn verify_accepts_token_just_before_expiry() {
        let keys = make_keys("dev-secret");
        let issued = now() - TimeDuration::minutes(59);
        let token = keys.sign(Uuid::new_v4(), Role::Admin, issued).unwrap();
        assert_eq!(keys.verify(&token).unwrap().role, Role::Admin);
    }

    #[test]
    fn verify_at_expiry_boundary() {
        let keys = make_keys("dev-secret");
        let issued = datetime!(2024-02-01 12:00 UTC);
        let token = keys.sign(Uuid::new_v4(), Role::User, issued).unwrap();
        assert!(keys.verify_at(&token, datetime!(2024-02-01 13:00 UTC)).is_ok());
        assert!(keys.verify_at(&token, datetime!(2024-02-01 13:00:01 UTC)).is_err());
    }

    #[test]
    fn verify_rejects_other_secret() {
        let token = make_keys("secret-a")
            .sign(Uuid::new_v4(), Role::User, now())
            .unwrap();
        let err = make_keys("secret-b").verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn verify_rejects_any_altered_character() {
        let keys = make_keys("dev-secret");
        let token = keys.sign(Uuid::new_v4(), Role::User, now()).unwrap();
        for (i, c) in token.char_indices() {
            let replacement = if c == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(i..i + 1, &replacement.to_string());
            assert!(keys.verify(&tampered).is_err(), "altered char {i} accepted");
        }
    }

    #[test]
    fn new_rejects_empty_secret_or_zero_ttl() {
        let err = JwtKeys::new(&JwtConfig {
            secret: String::new(),
            expires_in: Duration::from_secs(60),
        })
        .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));

        let err = JwtKeys::new(&JwtConfig {
            secret: "s".into(),
            expires_in: Duration::ZERO,
        })
        .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn new_rejects_oversized_ttl() {
        let err = JwtKeys::new(&JwtConfig {
            secret: "s".into(),
            expires_in: Duration::from_secs(100_000_000 * 86_400),
        })
        .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn sign_near_end_of_time_is_a_configuration_error() {
        let keys = make_keys("dev-secret");
        let err = keys
            .sign(Uuid::new_v4(), Role::User, datetime!(9999-12-31 23:30 UTC))
            .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }
}
