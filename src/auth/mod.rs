pub mod authority;
pub mod claims;
pub mod extractors;
pub mod jwt;
pub mod password;
pub mod reset;

pub use authority::Authority;
pub use claims::SessionClaims;
pub use extractors::AuthUser;
pub use jwt::JwtKeys;
