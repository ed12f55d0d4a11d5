pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod state;
pub mod telemetry;
pub mod users;

pub use error::{AuthError, AuthResult};
pub use state::AppState;
