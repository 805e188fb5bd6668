//! Mentor onboarding and profile endpoints.

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
pub struct CreateMentorRequest {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub expertise: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMentorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub active: Option<bool>,
    pub expertise: Option<String>,
}

/// GET /api/mentors
pub async fn list_mentors(State(state): State<AppState>) -> Result<Json<Vec<Identity>>, ApiError> {
    let mentors = state.identities.list(Role::Mentor)?;
    Ok(Json(mentors))
}

/// GET /api/mentors/:id
pub async fn get_mentor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Identity>, ApiError> {
    state
        .identities
        .find_by_id(Role::Mentor, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Mentor {} not found", id)))
}

/// POST /api/mentors
pub async fn create_mentor(
    State(state): State<AppState>,
    Json(payload): Json<CreateMentorRequest>,
) -> Result<(StatusCode, Json<Identity>), ApiError> {
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let mentor = state
        .identities
        .create(NewIdentity {
            role: Role::Mentor,
            username: payload.username,
            password: payload.password,
            name: payload.name,
            email: payload.email,
            cohort_id: None,
            mentor_id: None,
            expertise: payload.expertise,
        })
        .map_err(|e| ApiError::Conflict(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(mentor)))
}

/// PUT /api/mentors/:id
pub async fn update_mentor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMentorRequest>,
) -> Result<Json<Identity>, ApiError> {
    state
        .identities
        .update(
            Role::Mentor,
            &id,
            IdentityUpdate {
                name: payload.name,
                email: payload.email,
                password: payload.password,
                active: payload.active,
                cohort_id: None,
                mentor_id: None,
                expertise: payload.expertise.map(Some),
            },
        )?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Mentor {} not found", id)))
}

/// DELETE /api/mentors/:id
pub async fn delete_mentor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.identities.delete(Role::Mentor, &id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Mentor {} not found", id)))
    }
}
