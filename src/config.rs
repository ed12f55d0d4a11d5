use std::time::Duration;

use serde::Deserialize;

use crate::auth::password::{DEFAULT_COST, MAX_COST, MIN_COST};
use crate::error::{AuthError, AuthResult};

pub const DEFAULT_RESET_TTL_MINUTES: i64 = 30;

/// Longest session lifetime accepted from configuration.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Longest reset window accepted from configuration (one week).
pub const MAX_RESET_TTL_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt: JwtConfig,
    pub reset_ttl_minutes: i64,
    pub password_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so it can be exercised without
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AuthError::Configuration(format!("{key} is not set")))
        };

        let database_url = required("DATABASE_URL")?;
        let secret = required("JWT_SECRET")?;
        let expires_in = parse_duration(&required("JWT_EXPIRES_TIME")?)?;
        if expires_in > MAX_SESSION_TTL {
            return Err(AuthError::Configuration(format!(
                "JWT_EXPIRES_TIME exceeds {} days",
                MAX_SESSION_TTL.as_secs() / 86_400
            )));
        }

        let reset_ttl_minutes = match lookup("RESET_TOKEN_TTL_MINUTES") {
            Some(v) => v
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|m| (1..=MAX_RESET_TTL_MINUTES).contains(m))
                .ok_or_else(|| {
                    AuthError::Configuration(format!("RESET_TOKEN_TTL_MINUTES is invalid: {v}"))
                })?,
            None => DEFAULT_RESET_TTL_MINUTES,
        };

        let password_cost = match lookup("PASSWORD_HASH_COST") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|c| (MIN_COST..=MAX_COST).contains(c))
                .ok_or_else(|| {
                    AuthError::Configuration(format!("PASSWORD_HASH_COST is invalid: {v}"))
                })?,
            None => DEFAULT_COST,
        };

        Ok(Self {
            database_url,
            auth: AuthConfig {
                jwt: JwtConfig { secret, expires_in },
                reset_ttl_minutes,
                password_cost,
            },
        })
    }
}

/// Parses a token lifetime such as `3600`, `45s`, `30m`, `12h` or `7d`.
pub fn parse_duration(raw: &str) -> AuthResult<Duration> {
    let raw = raw.trim();
    let invalid = || AuthError::Configuration(format!("invalid duration: {raw:?}"));

    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let multiplier = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        _ => return Err(invalid()),
    };

    let secs = value.checked_mul(multiplier).ok_or_else(invalid)?;
    if secs == 0 {
        return Err(invalid());
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("3600").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("12h").unwrap(), Duration::from_secs(43200));
        assert_eq!(parse_duration("7d").unwrap(), Duration::from_secs(604800));
    }

    #[test]
    fn rejects_bad_durations() {
        for raw in ["", "0", "d", "7w", "-5m", "1.5h"] {
            assert!(
                matches!(parse_duration(raw), Err(AuthError::Configuration(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn loads_with_defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/users"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRES_TIME", "7d"),
        ]))
        .expect("config should load");
        assert_eq!(cfg.auth.jwt.secret, "s3cret");
        assert_eq!(cfg.auth.jwt.expires_in, Duration::from_secs(7 * 24 * 3600));
        assert_eq!(cfg.auth.reset_ttl_minutes, 30);
        assert_eq!(cfg.auth.password_cost, 10);
    }

    #[test]
    fn missing_secret_is_a_configuration_error() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/users"),
            ("JWT_EXPIRES_TIME", "7d"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(msg) if msg.contains("JWT_SECRET")));
    }

    #[test]
    fn missing_expiry_is_a_configuration_error() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/users"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(msg) if msg.contains("JWT_EXPIRES_TIME")));
    }

    #[test]
    fn rejects_oversized_session_lifetime() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/users"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRES_TIME", "100000000d"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(msg) if msg.contains("JWT_EXPIRES_TIME")));
    }

    #[test]
    fn accepts_session_lifetime_at_cap() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/users"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRES_TIME", "365d"),
        ]))
        .expect("one year is allowed");
        assert_eq!(cfg.auth.jwt.expires_in, MAX_SESSION_TTL);
    }

    #[test]
    fn rejects_oversized_reset_window() {
        for raw in ["10081", "9223372036854775807", "0", "-1"] {
            let err = AppConfig::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://localhost/users"),
                ("JWT_SECRET", "s3cret"),
                ("JWT_EXPIRES_TIME", "1h"),
                ("RESET_TOKEN_TTL_MINUTES", raw),
            ]))
            .unwrap_err();
            assert!(
                matches!(
                    err,
                    AuthError::Configuration(ref msg) if msg.contains("RESET_TOKEN_TTL_MINUTES")
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_out_of_range_cost() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/users"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRES_TIME", "1h"),
            ("PASSWORD_HASH_COST", "2"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }
}
