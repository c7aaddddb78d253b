//! Token creation and verification.
//!
//! Access tokens authenticate API calls; refresh tokens can only be traded
//! for a new access token at `/api/token/refresh/`. Each carries a
//! `token_type` claim and is rejected where the other kind is expected.

use anyhow::anyhow;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use siges_config::JwtConfig;
use siges_core::AppError;
use siges_models::{Role, UserId};

use crate::claims::{Claims, RefreshTokenClaims, TokenType};

const INVALID_TOKEN: &str = "Given token not valid for any token type";

pub fn create_access_token(
    user_id: UserId,
    email: &str,
    role: Role,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.access_token_expiry as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        token_type: TokenType::Access,
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow!("Failed to create token: {}", e)))
}

/// Verifies signature, expiry and token type of an access token.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized(INVALID_TOKEN))?;

    if claims.token_type != TokenType::Access {
        return Err(AppError::unauthorized(INVALID_TOKEN));
    }

    Ok(claims)
}

pub fn create_refresh_token(
    user_id: UserId,
    email: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.refresh_token_expiry as usize;

    let claims = RefreshTokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        token_type: TokenType::Refresh,
        exp,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow!("Failed to create refresh token: {}", e)))
}

pub fn verify_refresh_token(
    token: &str,
    jwt_config: &JwtConfig,
) -> Result<RefreshTokenClaims, AppError> {
    let claims = decode::<RefreshTokenClaims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Token is invalid or expired"))?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::unauthorized("Token has wrong type"));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        }
    }

    #[test]
    fn access_token_round_trip() {
        let user_id = UserId::new();
        let token = create_access_token(user_id, "d@school.org", Role::Director, &config()).unwrap();
        let claims = verify_token(&token, &config()).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, Role::Director);
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token =
            create_access_token(UserId::new(), "p@school.org", Role::Parent, &config()).unwrap();
        let other = JwtConfig {
            secret: "another-secret".to_string(),
            ..config()
        };
        let err = verify_token(&token, &other).unwrap_err();
        assert_eq!(err.status.as_u16(), 401);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let refresh = create_refresh_token(UserId::new(), "p@school.org", &config()).unwrap();
        assert!(verify_token(&refresh, &config()).is_err());
        assert!(verify_refresh_token(&refresh, &config()).is_ok());
    }

    #[test]
    fn access_token_is_not_a_refresh_token() {
        let access =
            create_access_token(UserId::new(), "p@school.org", Role::Parent, &config()).unwrap();
        assert!(verify_refresh_token(&access, &config()).is_err());
    }

    #[test]
    fn refresh_tokens_are_unique() {
        let user_id = UserId::new();
        let a = create_refresh_token(user_id, "p@school.org", &config()).unwrap();
        let b = create_refresh_token(user_id, "p@school.org", &config()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: UserId::new().to_string(),
            email: "p@school.org".to_string(),
            role: Role::Parent,
            token_type: TokenType::Access,
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config().secret.as_bytes()),
        )
        .unwrap();
        assert!(verify_token(&token, &config()).is_err());
    }
}
