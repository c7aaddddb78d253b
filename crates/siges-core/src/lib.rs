//! # SIGES Core
//!
//! Core types, errors, and utilities shared by every SIGES crate.
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`password`]: Password hashing and verification
//! - [`serde`]: Custom serde deserialization helpers
//!
//! # Example
//!
//! ```ignore
//! use siges_core::errors::AppError;
//! use siges_core::password::{hash_password, verify_password};
//!
//! let error = AppError::not_found(anyhow::anyhow!("School not found"));
//! let hash = hash_password("secure_password")?;
//! ```

pub mod errors;
pub mod password;
pub mod serde;

pub use errors::{AppError, FieldErrors};
pub use password::{hash_password, verify_password};
