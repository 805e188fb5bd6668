//! Authentication middleware and role gating.
//!
//! The request pipeline is: extract bearer token → validate signature and
//! expiry → check the revocation set → resolve the claimed identifier to a
//! stored identity → (optionally) gate on role. Any failure short-circuits
//! with the mapped response and the resource handler never runs. The
//! freshly-read database record, not the token claim, is the role used for
//! gating.

use crate::auth::{
    api::AuthState,
    jwt::TokenError,
    models::{AuthContext, Claims, Role},
};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

/// Auth failure taxonomy. Every variant maps to exactly one response.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header on a protected route.
    Unauthenticated,
    /// Malformed token or bad signature.
    InvalidToken,
    /// Signature fine, expiry passed.
    ExpiredToken,
    /// Token id found in the revocation set.
    RevokedToken,
    /// Claims decoded but no partition holds the identifier.
    IdentityNotFound,
    /// Identity resolved but not allowed here.
    Forbidden,
    /// Identity store failure.
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidToken => (StatusCode::FORBIDDEN, "Invalid token"),
            AuthError::ExpiredToken => (StatusCode::FORBIDDEN, "Token expired"),
            AuthError::RevokedToken => (StatusCode::FORBIDDEN, "Token revoked"),
            AuthError::IdentityNotFound => (StatusCode::NOT_FOUND, "Identity not found"),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
            AuthError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Decode and validate a bearer token, including the revocation check.
fn validated_claims(auth: &AuthState, req: &Request) -> Result<Claims, AuthError> {
    let token = bearer_token(req).ok_or(AuthError::Unauthenticated)?;

    let claims = auth.tokens.validate(&token).map_err(|e| match e {
        TokenError::Expired => AuthError::ExpiredToken,
        TokenError::Invalid => AuthError::InvalidToken,
    })?;

    if auth.revocations.is_revoked(&claims.jti) {
        return Err(AuthError::RevokedToken);
    }

    Ok(claims)
}

/// General-purpose auth middleware: accepts any role, resolving the claimed
/// identifier across partitions in the fixed order student → mentor → admin.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = validated_claims(&auth, &req)?;

    let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
    let identity = auth
        .store
        .resolve_by_id(&id)
        .map_err(|_| AuthError::Internal)?
        .ok_or(AuthError::IdentityNotFound)?;

    if !identity.active {
        return Err(AuthError::Forbidden);
    }

    req.extensions_mut().insert(AuthContext { claims, identity });

    Ok(next.run(req).await)
}

/// Admin-only middleware: resolves only in the admin partition and also
/// requires the token's embedded role claim to be admin.
pub async fn admin_auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = validated_claims(&auth, &req)?;

    if claims.role != Role::Admin {
        return Err(AuthError::Forbidden);
    }

    let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
    let identity = auth
        .store
        .find_by_id(Role::Admin, &id)
        .map_err(|_| AuthError::Internal)?
        .ok_or(AuthError::IdentityNotFound)?;

    if !identity.active {
        return Err(AuthError::Forbidden);
    }

    req.extensions_mut().insert(AuthContext { claims, identity });

    Ok(next.run(req).await)
}

/// Role sets for route gating. Admin-only routes use
/// [`admin_auth_middleware`] instead of a gate.
pub const MENTOR_OR_ADMIN: &[Role] = &[Role::Mentor, Role::Admin];
pub const STUDENT_ONLY: &[Role] = &[Role::Student];

/// Role gate. Pure predicate over the already-resolved identity; must be
/// layered inside an auth middleware so the context is present.
pub async fn require_roles(
    State(allowed): State<&'static [Role]>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = req
        .extensions()
        .get::<AuthContext>()
        .ok_or(AuthError::Unauthenticated)?;

    if !allowed.contains(&context.identity.role) {
        return Err(AuthError::Forbidden);
    }

    Ok(next.run(req).await)
}
