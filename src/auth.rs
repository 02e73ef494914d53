//! Token verification for requests arriving from the upstream identity
//! service. This backend never issues sessions; it only checks the HS256
//! signature, expiry, and token type of what the gateway forwarded.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::response::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub jti: String,
}

/// Mirror of the identity service's token format. Production tokens are
/// minted upstream; this is used by tests and local tooling.
pub fn sign_jwt_for_user(
    user_id: &str,
    secret: &str,
    expires_in_hours: u64,
) -> Result<String, AppError> {
    sign_jwt(user_id, "user", secret, expires_in_hours)
}

pub fn sign_jwt_for_admin(
    admin_id: &str,
    secret: &str,
    expires_in_hours: u64,
) -> Result<String, AppError> {
    sign_jwt(admin_id, "admin", secret, expires_in_hours)
}

fn sign_jwt(
    subject_id: &str,
    token_type: &str,
    secret: &str,
    expires_in_hours: u64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expires_in_hours as i64);
    let claims = Claims {
        sub: subject_id.to_string(),
        token_type: token_type.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(&format!("jwt sign failed: {e}")))
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.algorithms = vec![Algorithm::HS256];

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth_header| auth_header.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

pub fn extract_token_from_headers(headers: &HeaderMap) -> Result<String, AppError> {
    extract_bearer_token(headers).ok_or_else(|| AppError::unauthorized("Missing bearer token"))
}

/// Subject ids become store key prefixes, where `:` is the field separator.
/// The identity service issues colon-free ids; anything else is rejected
/// here rather than trusted into the keyspace.
fn is_valid_subject_id(sub: &str) -> bool {
    !sub.is_empty() && !sub.contains(':')
}

/// The authenticated student whose exam results and weak points are in play.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// A flight-school staff member allowed to manage course content.
#[derive(Debug, Clone)]
pub struct AdminStaff {
    pub admin_id: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = extract_token_from_headers(&parts.headers)?;
        let claims = verify_jwt(&token, &app_state.config().jwt_secret)?;

        if claims.token_type != "user" {
            return Err(AppError::unauthorized("Invalid token type"));
        }
        if !is_valid_subject_id(&claims.sub) {
            return Err(AppError::unauthorized("Invalid token subject"));
        }

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminStaff
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = extract_token_from_headers(&parts.headers)?;
        let claims = verify_jwt(&token, &app_state.config().admin_jwt_secret)?;

        if claims.token_type != "admin" {
            return Err(AppError::unauthorized("Invalid token type"));
        }

        Ok(AdminStaff {
            admin_id: claims.sub,
        })
    }
}
