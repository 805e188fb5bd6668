//! Student onboarding and profile endpoints.
//!
//! Reads are gated to mentors and admins at the router; writes go through
//! the admin-only middleware.

use crate::api::routes::{ApiError, AppState};
use crate::auth::models::{Identity, Role};
use crate::auth::store::{IdentityUpdate, NewIdentity};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub cohort_id: Option<Uuid>,
    pub mentor_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub active: Option<bool>,
    pub cohort_id: Option<Uuid>,
    pub mentor_id: Option<Uuid>,
}

/// GET /api/students
pub async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<Identity>>, ApiError> {
    let students = state.identities.list(Role::Student)?;
    Ok(Json(students))
}

/// GET /api/students/:id
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Identity>, ApiError> {
    state
        .identities
        .find_by_id(Role::Student, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Student {} not found", id)))
}

/// POST /api/students
pub async fn create_student(
    State(state): State<AppState>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<Identity>), ApiError> {
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let student = state
        .identities
        .create(NewIdentity {
            role: Role::Student,
            username: payload.username,
            password: payload.password,
            name: payload.name,
            email: payload.email,
            cohort_id: payload.cohort_id,
            mentor_id: payload.mentor_id,
            expertise: None,
        })
        .map_err(|e| ApiError::Conflict(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(student)))
}

/// PUT /api/students/:id
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStudentRequest>,
) -> Result<Json<Identity>, ApiError> {
    state
        .identities
        .update(
            Role::Student,
            &id,
            IdentityUpdate {
                name: payload.name,
                email: payload.email,
                password: payload.password,
                active: payload.active,
                cohort_id: payload.cohort_id.map(Some),
                mentor_id: payload.mentor_id.map(Some),
                expertise: None,
            },
        )?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Student {} not found", id)))
}

/// DELETE /api/students/:id
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.identities.delete(Role::Student, &id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Student {} not found", id)))
    }
}
