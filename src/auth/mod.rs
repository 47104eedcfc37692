//! Bearer-token authentication.
//!
//! Tokens are issued by the identity service that owns user accounts; this
//! service only verifies the HS256 signature and reads the caller's id and role.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::header,
    http::request::Parts,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{errors::ServiceError, AppState};

/// Marketplace roles carried in the `role` claim
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Customer,
    Vendor,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Verification (and, for tooling and tests, issuance) of bearer tokens
#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    expiration_secs: u64,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("expiration_secs", &self.expiration_secs)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, expiration_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            expiration_secs,
        }
    }

    pub fn issue_token(&self, user_id: Uuid, role: Role) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            role,
            name: None,
            iat: now,
            exp: now + self.expiration_secs as i64,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {e}")))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("token has expired".to_string())
            }
            _ => ServiceError::Unauthorized("invalid token".to_string()),
        })
    }
}

/// Authenticated caller extracted from the `Authorization` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_vendor(&self) -> bool {
        self.role == Role::Vendor
    }

    pub fn is_customer(&self) -> bool {
        self.role == Role::Customer
    }

    /// Fails with `Forbidden` unless the caller holds one of `roles`.
    pub fn require_any(&self, roles: &[Role]) -> Result<(), ServiceError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "role {} may not perform this action",
                self.role
            )))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("malformed authorization header".to_string()))?;

        let claims = state.auth.validate_token(token)?;
        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

/// Anonymous callers are allowed; a header that is present must still be valid.
impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(None);
        }
        <AuthUser as FromRequestParts<AppState>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::str::FromStr;

    #[test]
    fn issued_token_round_trips_claims() {
        let auth = AuthConfig::new("0123456789abcdef0123456789abcdef", 60);
        let user = Uuid::new_v4();
        let token = auth.issue_token(user, Role::Vendor).unwrap();

        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Vendor);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = AuthConfig::new("0123456789abcdef0123456789abcdef", 60);
        let verifier = AuthConfig::new("fedcba9876543210fedcba9876543210", 60);
        let token = issuer.issue_token(Uuid::new_v4(), Role::Admin).unwrap();

        assert_matches!(
            verifier.validate_token(&token),
            Err(ServiceError::Unauthorized(_))
        );
    }

    #[test]
    fn require_any_checks_role() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Customer,
        };
        assert!(user.require_any(&[Role::Customer, Role::Admin]).is_ok());
        assert_matches!(
            user.require_any(&[Role::Vendor]),
            Err(ServiceError::Forbidden(_))
        );
    }

    #[test]
    fn role_parses_from_snake_case() {
        assert_eq!(Role::from_str("vendor").unwrap(), Role::Vendor);
        assert_eq!(Role::Admin.to_string(), "admin");
    }
}
