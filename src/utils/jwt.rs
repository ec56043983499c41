use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    error::{AppError, Result},
    models::UserRole,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub typ: TokenType,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32> {
        self.sub
            .parse::<i32>()
            .map_err(|_| AppError::Unauthorized("Unauthorized".to_string()))
    }
}

fn generate_token(
    config: &AuthConfig,
    user_id: i32,
    role: UserRole,
    typ: TokenType,
    lifetime: Duration,
) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(lifetime)
        .ok_or_else(|| AppError::InternalError("Failed to calculate expiration".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        typ,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(format!("Token generation failed: {}", e)))
}

pub fn generate_access_token(config: &AuthConfig, user_id: i32, role: UserRole) -> Result<String> {
    generate_token(
        config,
        user_id,
        role,
        TokenType::Access,
        Duration::minutes(config.access_token_minutes),
    )
}

pub fn generate_refresh_token(config: &AuthConfig, user_id: i32, role: UserRole) -> Result<String> {
    generate_token(
        config,
        user_id,
        role,
        TokenType::Refresh,
        Duration::days(config.refresh_token_days),
    )
}

/// Decodes a token and checks it is of the expected type.
pub fn verify_token(config: &AuthConfig, token: &str, expected: TokenType) -> Result<Claims> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    if claims.typ != expected {
        return Err(AppError::Unauthorized("Invalid token type".to_string()));
    }

    Ok(claims)
}
