use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use crate::auth::Authority;
use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, AuthConfig};
use crate::error::AuthResult;
use crate::users::{MemoryUserStore, PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub authority: Arc<Authority>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Connects to Postgres, applies migrations and builds the authority. Any
    /// configuration problem surfaces here, before anything is served.
    pub async fn init(config: &AppConfig) -> AuthResult<Self> {
        let authority = Arc::new(Authority::new(&config.auth)?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&db).await?;
        tracing::info!("migrations applied");

        Ok(Self {
            store: Arc::new(PgUserStore::new(db)),
            authority,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn from_parts(
        store: Arc<dyn UserStore>,
        authority: Arc<Authority>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            authority,
            clock,
        }
    }

    /// State backed by [`MemoryUserStore`] and the system clock.
    pub fn in_memory(config: &AuthConfig) -> AuthResult<Self> {
        Ok(Self {
            store: Arc::new(MemoryUserStore::new()),
            authority: Arc::new(Authority::new(config)?),
            clock: Arc::new(SystemClock),
        })
    }
}
