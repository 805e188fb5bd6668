//! Authentication endpoints: login, admin login, verify, logout, me.

use crate::auth::{
    jwt::TokenService,
    models::{
        AuthContext, IdentityResponse, LoginRequest, LoginResponse, Role, VerifyRequest,
        VerifyResponse,
    },
    revocation::RevocationList,
    store::IdentityStore,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Shared auth state.
#[derive(Clone)]
pub struct AuthState {
    pub store: Arc<IdentityStore>,
    pub tokens: Arc<TokenService>,
    pub revocations: RevocationList,
}

impl AuthState {
    pub fn new(store: Arc<IdentityStore>, tokens: Arc<TokenService>) -> Self {
        Self {
            store,
            tokens,
            revocations: RevocationList::new(),
        }
    }
}

/// Login endpoint - POST /api/auth/login
///
/// Searches partitions in the fixed order student → mentor → admin.
pub async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    login_scoped(&state, payload, None).await
}

/// Admin login endpoint - POST /api/auth/admin-login
///
/// Same contract as login, restricted to the admin partition.
pub async fn admin_login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    login_scoped(&state, payload, Some(Role::Admin)).await
}

async fn login_scoped(
    state: &AuthState,
    payload: LoginRequest,
    scope: Option<Role>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AuthApiError::Validation);
    }

    info!(username = %payload.username, "Login attempt");

    // One generic failure for unknown user, wrong password, and inactive
    // record alike.
    let identity = state
        .store
        .verify_credentials(scope, &payload.username, &payload.password)
        .map_err(|_| AuthApiError::InternalError)?
        .ok_or_else(|| {
            warn!(username = %payload.username, "Failed login attempt");
            AuthApiError::InvalidCredentials
        })?;

    let (token, expires_in) = state
        .tokens
        .issue(&identity)
        .map_err(|_| AuthApiError::InternalError)?;

    state
        .store
        .touch_last_login(identity.role, &identity.id)
        .map_err(|_| AuthApiError::InternalError)?;

    info!(
        username = %identity.username,
        role = identity.role.as_str(),
        "Login successful"
    );

    Ok(Json(LoginResponse {
        success: true,
        token,
        expires_in,
        user: IdentityResponse::from_identity(&identity),
    }))
}

/// Token verification endpoint - POST /api/auth/verify
///
/// Any failure shape collapses to 401; a passing token yields the freshly
/// resolved identity.
pub async fn verify(
    State(state): State<AuthState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, AuthApiError> {
    let claims = state
        .tokens
        .validate(&payload.token)
        .map_err(|_| AuthApiError::Unauthorized)?;

    if state.revocations.is_revoked(&claims.jti) {
        return Err(AuthApiError::Unauthorized);
    }

    let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthApiError::Unauthorized)?;
    let identity = state
        .store
        .resolve_by_id(&id)
        .map_err(|_| AuthApiError::InternalError)?
        .ok_or(AuthApiError::Unauthorized)?;

    if !identity.active {
        return Err(AuthApiError::Unauthorized);
    }

    Ok(Json(VerifyResponse {
        valid: true,
        user: IdentityResponse::from_identity(&identity),
    }))
}

/// Logout endpoint - POST /api/auth/logout (protected)
///
/// Adds the presented token's id to the revocation set; the token stops
/// verifying immediately instead of at expiry.
pub async fn logout(
    State(state): State<AuthState>,
    Extension(context): Extension<AuthContext>,
) -> Json<serde_json::Value> {
    state
        .revocations
        .revoke(&context.claims.jti, context.claims.exp as i64);

    info!(username = %context.identity.username, "Logged out");

    Json(json!({ "success": true, "message": "Logged out" }))
}

/// Current identity endpoint - GET /api/auth/me (protected)
///
/// Returns the freshly resolved database record, not the token claims.
pub async fn me(Extension(context): Extension<AuthContext>) -> Json<IdentityResponse> {
    Json(IdentityResponse::from_identity(&context.identity))
}

/// Auth endpoint errors.
#[derive(Debug)]
pub enum AuthApiError {
    Validation,
    InvalidCredentials,
    Unauthorized,
    InternalError,
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::Validation => (StatusCode::BAD_REQUEST, "Username and password are required"),
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid username or password")
            }
            AuthApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthApiError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::NewIdentity;
    use tempfile::NamedTempFile;

    fn create_test_state() -> (AuthState, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = IdentityStore::new(temp_file.path().to_str().unwrap()).unwrap();
        let tokens = TokenService::new("test-secret-key-12345".to_string(), 24);
        let state = AuthState::new(Arc::new(store), Arc::new(tokens));
        (state, temp_file)
    }

    #[test]
    fn test_auth_api_error_responses() {
        assert_eq!(
            AuthApiError::Validation.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthApiError::InvalidCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthApiError::InternalError.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let (state, _temp) = create_test_state();

        state
            .store
            .create(NewIdentity {
                role: Role::Student,
                username: "alice".to_string(),
                password: "correct".to_string(),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                cohort_id: None,
                mentor_id: None,
                expertise: None,
            })
            .unwrap();

        let response = login_scoped(
            &state,
            LoginRequest {
                username: "alice".to_string(),
                password: "correct".to_string(),
            },
            None,
        )
        .await
        .unwrap();

        assert!(response.success);
        assert_eq!(response.user.username, "alice");
        assert_eq!(response.user.role, Role::Student);

        // Token claims carry the identity's id
        let claims = state.tokens.validate(&response.token).unwrap();
        assert_eq!(claims.sub, response.user.id);

        // Successful login stamps last_login
        let refreshed = state
            .store
            .find_by_username(Role::Student, "alice")
            .unwrap()
            .unwrap();
        assert!(refreshed.last_login.is_some());
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (state, _temp) = create_test_state();

        state
            .store
            .create(NewIdentity {
                role: Role::Student,
                username: "alice".to_string(),
                password: "correct".to_string(),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                cohort_id: None,
                mentor_id: None,
                expertise: None,
            })
            .unwrap();

        let wrong_password = login_scoped(
            &state,
            LoginRequest {
                username: "alice".to_string(),
                password: "wrong".to_string(),
            },
            None,
        )
        .await;
        let unknown_user = login_scoped(
            &state,
            LoginRequest {
                username: "mallory".to_string(),
                password: "correct".to_string(),
            },
            None,
        )
        .await;

        assert!(matches!(
            wrong_password.unwrap_err(),
            AuthApiError::InvalidCredentials
        ));
        assert!(matches!(
            unknown_user.unwrap_err(),
            AuthApiError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn test_admin_login_rejects_other_partitions() {
        let (state, _temp) = create_test_state();

        state
            .store
            .create(NewIdentity {
                role: Role::Mentor,
                username: "bob".to_string(),
                password: "hunter2".to_string(),
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
                cohort_id: None,
                mentor_id: None,
                expertise: None,
            })
            .unwrap();

        let result = login_scoped(
            &state,
            LoginRequest {
                username: "bob".to_string(),
                password: "hunter2".to_string(),
            },
            Some(Role::Admin),
        )
        .await;

        assert!(matches!(
            result.unwrap_err(),
            AuthApiError::InvalidCredentials
        ));
    }
}
