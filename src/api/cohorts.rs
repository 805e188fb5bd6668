//! Cohort endpoints. Reads for any authenticated identity, writes admin-only.

use crate::api::routes::{ApiError, AppState};
use crate::models::{Cohort, CreateCohortRequest, UpdateCohortRequest};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

/// GET /api/cohorts
pub async fn list_cohorts(State(state): State<AppState>) -> Result<Json<Vec<Cohort>>, ApiError> {
    Ok(Json(state.db.list_cohorts()?))
}

/// GET /api/cohorts/:id
pub async fn get_cohort(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Cohort>, ApiError> {
    state
        .db
        .get_cohort(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Cohort {} not found", id)))
}

/// POST /api/cohorts
pub async fn create_cohort(
    State(state): State<AppState>,
    Json(payload): Json<CreateCohortRequest>,
) -> Result<(StatusCode, Json<Cohort>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Cohort name is required".to_string()));
    }

    let cohort = state
        .db
        .create_cohort(&payload.name, &payload.starts_on, &payload.ends_on)?;
    Ok((StatusCode::CREATED, Json(cohort)))
}

/// PUT /api/cohorts/:id
pub async fn update_cohort(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCohortRequest>,
) -> Result<Json<Cohort>, ApiError> {
    state
        .db
        .update_cohort(&id, payload.name, payload.starts_on, payload.ends_on)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Cohort {} not found", id)))
}

/// DELETE /api/cohorts/:id
pub async fn delete_cohort(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_cohort(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Cohort {} not found", id)))
    }
}
