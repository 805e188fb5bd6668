//! Router assembly and shared API plumbing.
//!
//! Routes are tiered: public (health, login, verify), protected (any
//! resolved identity), role-gated groups inside the protected tier, and an
//! admin tier behind the admin-only middleware. Auth always runs before any
//! role gate.

use crate::{
    api::{cohorts, community, coursework, dashboard, mentors, students},
    auth::{
        api as auth_api, api::AuthState, middleware::MENTOR_OR_ADMIN, middleware::STUDENT_ONLY,
        admin_auth_middleware, auth_middleware, require_roles, IdentityStore,
    },
    db::PortalDb,
    middleware::attempt_guard::{attempt_guard_middleware, AttemptGuard},
};
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state for the portal handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<PortalDb>,
    pub identities: Arc<IdentityStore>,
}

/// Build the full application router.
pub fn build_router(app_state: AppState, auth_state: AuthState, guard: AttemptGuard) -> Router {
    // Login routes sit behind the attempt guard; verify does not burn
    // attempts.
    let auth_router = Router::new()
        .route("/api/auth/login", post(auth_api::login))
        .route("/api/auth/admin-login", post(auth_api::admin_login))
        .route_layer(middleware::from_fn_with_state(
            guard,
            attempt_guard_middleware,
        ))
        .route("/api/auth/verify", post(auth_api::verify))
        .with_state(auth_state.clone());

    // Mentor/admin tier inside the protected router
    let mentor_admin_routes = Router::new()
        .route("/api/students", get(students::list_students))
        .route("/api/students/:id", get(students::get_student))
        .route("/api/assignments", post(coursework::create_assignment))
        .route(
            "/api/assignments/:id",
            put(coursework::update_assignment).delete(coursework::delete_assignment),
        )
        .route("/api/assessments", post(coursework::create_assessment))
        .route(
            "/api/assessments/:id",
            put(coursework::update_assessment).delete(coursework::delete_assessment),
        )
        .route("/api/resources", post(community::create_resource))
        .route("/api/resources/:id", delete(community::delete_resource))
        .route("/api/events", post(community::create_event))
        .route(
            "/api/events/:id",
            put(community::update_event).delete(community::delete_event),
        )
        .route("/api/announcements", post(community::create_announcement))
        .route(
            "/api/announcements/:id",
            put(community::update_announcement).delete(community::delete_announcement),
        )
        .route(
            "/api/help-requests/:id",
            put(community::update_help_request),
        )
        .route("/api/dashboard/summary", get(dashboard::summary))
        .route_layer(middleware::from_fn_with_state(
            MENTOR_OR_ADMIN,
            require_roles,
        ))
        .with_state(app_state.clone());

    // Student-only tier
    let student_routes = Router::new()
        .route("/api/help-requests", post(community::create_help_request))
        .route_layer(middleware::from_fn_with_state(STUDENT_ONLY, require_roles))
        .with_state(app_state.clone());

    // Open to every resolved identity
    let any_role_routes = Router::new()
        .route("/api/mentors", get(mentors::list_mentors))
        .route("/api/mentors/:id", get(mentors::get_mentor))
        .route("/api/cohorts", get(cohorts::list_cohorts))
        .route("/api/cohorts/:id", get(cohorts::get_cohort))
        .route("/api/assignments", get(coursework::list_assignments))
        .route("/api/assignments/:id", get(coursework::get_assignment))
        .route(
            "/api/tasks",
            get(coursework::list_tasks).post(coursework::create_task),
        )
        .route(
            "/api/tasks/:id",
            get(coursework::get_task)
                .put(coursework::update_task)
                .delete(coursework::delete_task),
        )
        .route("/api/assessments", get(coursework::list_assessments))
        .route("/api/assessments/:id", get(coursework::get_assessment))
        .route(
            "/api/projects",
            get(coursework::list_projects).post(coursework::create_project),
        )
        .route(
            "/api/projects/:id",
            get(coursework::get_project)
                .put(coursework::update_project)
                .delete(coursework::delete_project),
        )
        .route("/api/resources", get(community::list_resources))
        .route("/api/events", get(community::list_events))
        .route("/api/announcements", get(community::list_announcements))
        .route("/api/help-requests", get(community::list_help_requests))
        .route("/api/help-requests/:id", get(community::get_help_request))
        .route(
            "/api/dashboard/students/:id",
            get(dashboard::student_dashboard),
        )
        .with_state(app_state.clone());

    // Session routes share the auth state
    let session_routes = Router::new()
        .route("/api/auth/me", get(auth_api::me))
        .route("/api/auth/logout", post(auth_api::logout))
        .with_state(auth_state.clone());

    let protected_routes = Router::new()
        .merge(mentor_admin_routes)
        .merge(student_routes)
        .merge(any_role_routes)
        .merge(session_routes)
        .route_layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ));

    // Identity lifecycle is admin-only and uses the stricter middleware
    let admin_routes = Router::new()
        .route("/api/students", post(students::create_student))
        .route(
            "/api/students/:id",
            put(students::update_student).delete(students::delete_student),
        )
        .route("/api/mentors", post(mentors::create_mentor))
        .route(
            "/api/mentors/:id",
            put(mentors::update_mentor).delete(mentors::delete_mentor),
        )
        .route("/api/cohorts", post(cohorts::create_cohort))
        .route(
            "/api/cohorts/:id",
            put(cohorts::update_cohort).delete(cohorts::delete_cohort),
        )
        .route_layer(middleware::from_fn_with_state(
            auth_state,
            admin_auth_middleware,
        ))
        .with_state(app_state);

    let public_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(public_routes)
        .merge(auth_router)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
}

// ===== Route Handlers =====

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ===== Error Handling =====

#[derive(Debug)]
pub enum ApiError {
    Database(anyhow::Error),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Forbidden,
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Insufficient permissions".to_string(),
            ),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
