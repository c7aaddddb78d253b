//! # SIGES Config
//!
//! Configuration structures loaded from environment variables.
//!
//! - [`jwt`]: token signing secret and lifetimes
//! - [`database`]: connection string and pool size
//! - [`server`]: bind address, log directory and allowed browser origins
//!
//! Every `from_env` falls back to a development default when a variable is
//! unset or unparsable, except `DATABASE_URL` which has no sensible default.

pub mod database;
pub mod jwt;
pub mod server;

pub use database::DatabaseConfig;
pub use jwt::JwtConfig;
pub use server::{AllowedOrigins, ServerConfig};

pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
