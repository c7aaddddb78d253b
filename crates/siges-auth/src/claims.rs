//! JWT claim structures.

use serde::{Deserialize, Serialize};
use siges_models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by access tokens.
///
/// `role` is informational only. Authorization always re-reads the account,
/// so a demoted director loses access on the next request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub token_type: TokenType,
    /// Expiration (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub email: String,
    pub token_type: TokenType,
    pub exp: usize,
    pub iat: usize,
    /// Unique token identifier so two refresh tokens minted in the same
    /// second still differ.
    pub jti: String,
}
