//! Shared helpers for the feature modules.
//!
//! - [`auth_helpers`]: policy calls and ancestry lookups
//! - [`db_errors`]: constraint violation classification
//! - [`scope_sql`]: scope to SQL predicate rendering

pub mod auth_helpers;
pub mod db_errors;
pub mod scope_sql;
