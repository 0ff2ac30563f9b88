use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SELLER: &str = "seller";
pub const ROLE_CUSTOMER: &str = "customer";

/// JWT payload issued by the identity provider.
#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.eq_ignore_ascii_case(role)
    }
}

pub fn ensure_role(user: &AuthUser, role: &str) -> Result<(), AppError> {
    if !user.has_role(role) {
        return Err(AppError::forbidden(
            "You do not have permission to perform this action",
        ));
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, ROLE_ADMIN)
}

pub fn ensure_seller(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, ROLE_SELLER)
}

/// Unwraps an optional principal, turning absence into a soft "not authenticated" failure.
pub fn require_user(user: Option<AuthUser>) -> Result<AuthUser, AppError> {
    user.ok_or(AppError::Unauthorized)
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::bad_request("Invalid Authorization header"))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::bad_request("Invalid Authorization scheme"))?;

    Ok(Some(token.trim()))
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;

    Ok(AuthUser {
        user_id,
        role: decoded.claims.role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AppError::Unauthorized)?;
        decode_token(token, &state.config.jwt_secret)
    }
}

impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        // Anything short of a valid token is treated as an anonymous caller.
        let token = match bearer_token(parts) {
            Ok(Some(token)) => token,
            Ok(None) => return Ok(None),
            Err(err) => {
                tracing::debug!(error = %err, "ignoring malformed Authorization header");
                return Ok(None);
            }
        };

        match decode_token(token, &state.config.jwt_secret) {
            Ok(user) => Ok(Some(user)),
            Err(_) => {
                tracing::debug!("ignoring invalid or expired token");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token_for(user_id: Uuid, role: &str, secret: &str) -> String {
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode token")
    }

    #[test]
    fn decodes_valid_token() {
        let user_id = Uuid::new_v4();
        let token = token_for(user_id, ROLE_SELLER, "secret");
        let user = decode_token(&token, "secret").expect("valid token");
        assert_eq!(user.user_id, user_id);
        assert!(user.has_role(ROLE_SELLER));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = token_for(Uuid::new_v4(), ROLE_ADMIN, "secret");
        assert!(matches!(
            decode_token(&token, "other"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn role_guards() {
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: "Admin".into(),
        };
        assert!(ensure_admin(&admin).is_ok());
        assert!(matches!(ensure_seller(&admin), Err(AppError::Forbidden(_))));
    }
}
