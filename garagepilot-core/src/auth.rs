use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::AppState;
use crate::error::{ShopError, ShopResult};
use crate::pipeline::audit::{ReportSink, UNAUTHORIZED_ATTEMPT};

pub const ADMIN_ROLE: &str = "admin";

/// Claims carried by every bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User name, as shown in the user directory.
    pub sub: String,
    /// `admin` or `mechanic`
    pub role: String,
    pub exp: usize,
}

/// The authenticated caller, stored in request extensions.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub name: String,
    pub role: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case(ADMIN_ROLE)
    }

    /// Mechanic name used to scope listings; admins see everything.
    pub fn scope(&self) -> Option<&str> {
        if self.is_admin() {
            None
        } else {
            Some(self.name.as_str())
        }
    }
}

/// Signs a token for `name` valid for `ttl`.
///
/// Production tokens are minted by the login service that owns the user
/// accounts; this helper signs compatible tokens for tests and local tooling.
pub fn issue_token(secret: &str, name: &str, role: &str, ttl: Duration) -> ShopResult<String> {
    let claims = Claims {
        sub: name.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ShopError::invalid(format!("could not sign token: {}", e)))
}

pub fn verify_token(secret: &str, token: &str) -> ShopResult<CurrentUser> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ShopError::Unauthorized
    })?;

    let name = data.claims.sub.trim();
    if name.is_empty() {
        return Err(ShopError::Unauthorized);
    }
    Ok(CurrentUser {
        name: name.to_string(),
        role: data.claims.role,
    })
}

/// Middleware validating the `Authorization: Bearer` header.
///
/// On success the caller is attached to the request; otherwise a `401`
/// with the usual error body is returned.
pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ShopError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ShopError::Unauthorized)?;

    let user = verify_token(&state.jwt_secret, token.trim())?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(ShopError::Unauthorized)
    }
}

/// Lets admins through. Anyone else gets `Forbidden` and the attempt is
/// filed with the audit sink.
pub async fn require_admin(user: &CurrentUser, audit: &dyn ReportSink, action: &str) -> ShopResult<()> {
    if user.is_admin() {
        return Ok(());
    }

    warn!("{} ({}) attempted admin action: {}", user.name, user.role, action);
    audit
        .submit(
            UNAUTHORIZED_ATTEMPT,
            &user.name,
            &format!("attempted to {}", action),
            Utc::now(),
        )
        .await;
    Err(ShopError::Forbidden(action.to_string()))
}
