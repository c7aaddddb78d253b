//! # SIGES Auth
//!
//! Authentication tokens and the access policy.
//!
//! - [`claims`] / [`jwt`]: signed access and refresh tokens
//! - [`principal`]: the authenticated account as seen by the policy
//! - [`scope`]: which rows of each entity a principal can reach
//! - [`policy`]: the single decision point, `authorize`
//!
//! The policy modules perform no IO. The HTTP layer resolves a [`Principal`]
//! from the database, asks [`policy::authorize`] for a decision, and renders
//! the scope as a SQL predicate for list queries.
//!
//! ```ignore
//! use siges_auth::policy::{Action, EntityKind, Target, authorize};
//!
//! authorize(Some(&principal), Action::Update, EntityKind::Student, Target::Row(&ancestry))?;
//! ```

pub mod claims;
pub mod jwt;
pub mod policy;
pub mod principal;
pub mod scope;

pub use claims::{Claims, RefreshTokenClaims, TokenType};
pub use jwt::{create_access_token, create_refresh_token, verify_refresh_token, verify_token};
pub use policy::{Action, Deny, EntityKind, Grant, Target, authorize, resolve_level_school};
pub use principal::Principal;
pub use scope::{RowAncestry, Scope, reachable};
