//! JWT authentication module.
//!
//! Verifies bearer tokens and exposes the caller as [`AuthUser`]. The service
//! has no login flow; tokens are issued by whoever shares the secret (tests
//! and local tooling use [`JwtManager::issue`]).
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! require_auth / require_admin (route layer)
//!        │  missing, malformed, expired  → 401
//!        │  buyer token on /admin/*      → 403
//!        ▼
//! request.extensions += AuthUser { id: sub, role }
//! ```

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Caller role carried in the `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Buyer,
    Admin,
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    /// Issues an HS256 token for `user_id`.
    pub fn issue(&self, user_id: &str, role: Role) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                ApiError::unauthorized("Invalid or expired token")
            })
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Caller Identity
// =============================================================================

/// The authenticated caller, inserted by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

fn authenticate(state: &AppState, req: &Request) -> Result<AuthUser, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

    let token = extract_bearer_token(header)
        .ok_or_else(|| ApiError::unauthorized("Invalid authorization header"))?;

    let claims = state.jwt.validate(token)?;
    Ok(AuthUser {
        id: claims.sub,
        role: claims.role,
    })
}

// =============================================================================
// Middleware
// =============================================================================

/// Any valid token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, &req)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// A valid token with the admin role.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, &req)?;
    if !user.is_admin() {
        return Err(ApiError::forbidden("Admin role required"));
    }
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret-0123456789", 3600);
        let token = manager.issue("buyer-1", Role::Buyer).unwrap();

        let claims = manager.validate(&token).unwrap();
        assert_eq!(claims.sub, "buyer-1");
        assert_eq!(claims.role, Role::Buyer);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("test-secret-0123456789", 3600);
        let verifier = JwtManager::new("another-secret-9876543", 3600);
        let token = issuer.issue("buyer-1", Role::Admin).unwrap();
        assert!(verifier.validate(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Well past the default 60s leeway.
        let manager = JwtManager::new("test-secret-0123456789", -3600);
        let token = manager.issue("buyer-1", Role::Buyer).unwrap();
        assert!(manager.validate(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }
}
