//! # SIGES CLI
//!
//! Administrative commands and database seeding for development.
//!
//! ```ignore
//! use siges_cli::seeder::{seed_all, SeedConfig};
//!
//! let config = SeedConfig::new(3); // 3 schools with defaults
//! seed_all(&pool, config).await?;
//! ```

pub mod admin;
pub mod seeder;
