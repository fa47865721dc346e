pub mod jwt;

pub use jwt::{AppMetadata, JwtError, JwtService, TokenClaims};
