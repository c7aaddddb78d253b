//! Request extractors.
//!
//! - [`auth`]: bearer-token authentication and principal resolution
//!
//! Handlers take [`auth::CurrentPrincipal`] to get an authenticated
//! [`siges_auth::Principal`] whose role and directed schools are read from
//! the database on every request, then hand it to the policy.

pub mod auth;
