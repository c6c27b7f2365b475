//! Bearer token verification and role extractors.
//!
//! Tokens are HS256 JWTs. Sellers and admins get theirs from the account
//! service; buyers receive a short-lived one after placing an order or
//! looking up their tracking data.

use std::fmt;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use headers::{authorization::Bearer, Authorization};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::normalize_phone;

const NO_TOKEN: &str = "Access denied. No token provided.";
const BAD_TOKEN: &str = "Invalid or expired token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Seller/admin account id, or the buyer's phone
    pub sub: String,
    pub role: Role,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl Claims {
    pub fn account_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    buyer_token_ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, buyer_token_ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            buyer_token_ttl: Duration::days(buyer_token_ttl_days),
        }
    }

    pub fn issue(&self, sub: &str, role: Role, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            role,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {e}")))
    }

    pub fn issue_buyer_token(&self, phone: &str) -> Result<String, AppError> {
        self.issue(phone, Role::Buyer, self.buyer_token_ttl)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AppError::unauthorized(BAD_TOKEN)
            })
    }
}

/// Any caller holding a valid token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<JwtKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized(NO_TOKEN))?;

        let keys = Arc::<JwtKeys>::from_ref(state);
        keys.verify(bearer.token()).map(Self)
    }
}

fn require_role(claims: &Claims, role: Role) -> Result<(), AppError> {
    if claims.role != role {
        return Err(AppError::forbidden(format!(
            "Access denied. {role} role required."
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SellerUser {
    pub seller_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for SellerUser
where
    Arc<JwtKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        require_role(&claims, Role::Seller)?;
        let seller_id = claims
            .account_id()
            .ok_or_else(|| AppError::unauthorized(BAD_TOKEN))?;
        Ok(Self { seller_id })
    }
}

#[derive(Debug, Clone)]
pub struct AdminUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<JwtKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        require_role(&claims, Role::Admin)?;
        Ok(Self(claims))
    }
}

/// Buyer identified by the phone in their token.
#[derive(Debug, Clone)]
pub struct BuyerUser {
    pub phone: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for BuyerUser
where
    Arc<JwtKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        require_role(&claims, Role::Buyer)?;
        Ok(Self {
            phone: normalize_phone(&claims.sub),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buyer_token_round_trips_phone_and_role() {
        let keys = JwtKeys::new("test-secret", 7);
        let token = keys.issue_buyer_token("08012345678").unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "08012345678");
        assert_eq!(claims.role, Role::Buyer);
        assert!(claims.exp > Utc::now().timestamp() + 6 * 24 * 3600);
    }

    #[test]
    fn foreign_and_expired_tokens_are_rejected() {
        let keys = JwtKeys::new("test-secret", 7);
        let other = JwtKeys::new("another-secret", 7);
        let token = other.issue_buyer_token("0801").unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::Unauthorized(_))));

        let expired = keys
            .issue("0801", Role::Buyer, Duration::hours(-2))
            .unwrap();
        assert!(matches!(keys.verify(&expired), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn wrong_role_is_forbidden() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: Role::Buyer,
            exp: 0,
            iat: 0,
        };
        assert!(matches!(
            require_role(&claims, Role::Seller),
            Err(AppError::Forbidden(_))
        ));
    }
}
