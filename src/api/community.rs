//! Resource, event, announcement, and help-request endpoints.

use crate::api::routes::{ApiError, AppState};
use crate::auth::models::{AuthContext, Role};
use crate::models::{
    Announcement, CreateAnnouncementRequest, CreateEventRequest, CreateHelpRequestRequest,
    CreateResourceRequest, Event, HelpRequest, HelpRequestStatus, Resource,
    UpdateAnnouncementRequest, UpdateEventRequest, UpdateHelpRequestRequest,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

// ===== Resources =====

/// GET /api/resources
pub async fn list_resources(State(state): State<AppState>) -> Result<Json<Vec<Resource>>, ApiError> {
    Ok(Json(state.db.list_resources()?))
}

/// POST /api/resources
pub async fn create_resource(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<Resource>), ApiError> {
    if payload.title.trim().is_empty() || payload.url.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Title and url are required".to_string(),
        ));
    }

    let resource = state.db.create_resource(
        &payload.title,
        &payload.url,
        &payload.kind,
        &context.identity.id,
    )?;
    Ok((StatusCode::CREATED, Json(resource)))
}

/// DELETE /api/resources/:id
pub async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_resource(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Resource {} not found", id)))
    }
}

// ===== Events =====

/// GET /api/events
pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.db.list_events()?))
}

/// POST /api/events
pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    let event = state.db.create_event(
        &payload.title,
        &payload.description,
        &payload.starts_at,
        payload.location,
    )?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// PUT /api/events/:id
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<Event>, ApiError> {
    state
        .db
        .update_event(
            &id,
            payload.title,
            payload.description,
            payload.starts_at,
            payload.location,
        )?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Event {} not found", id)))
}

/// DELETE /api/events/:id
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_event(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Event {} not found", id)))
    }
}

// ===== Announcements =====

/// GET /api/announcements
pub async fn list_announcements(
    State(state): State<AppState>,
) -> Result<Json<Vec<Announcement>>, ApiError> {
    Ok(Json(state.db.list_announcements()?))
}

/// POST /api/announcements
pub async fn create_announcement(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Announcement>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    let announcement = state.db.create_announcement(
        &payload.title,
        &payload.body,
        &context.identity.id,
        payload.pinned.unwrap_or(false),
    )?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

/// PUT /api/announcements/:id
pub async fn update_announcement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAnnouncementRequest>,
) -> Result<Json<Announcement>, ApiError> {
    state
        .db
        .update_announcement(&id, payload.title, payload.body, payload.pinned)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Announcement {} not found", id)))
}

/// DELETE /api/announcements/:id
pub async fn delete_announcement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_announcement(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Announcement {} not found", id)))
    }
}

// ===== Help requests =====

#[derive(Debug, Deserialize)]
pub struct HelpRequestQuery {
    pub status: Option<HelpRequestStatus>,
}

/// GET /api/help-requests
pub async fn list_help_requests(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Query(params): Query<HelpRequestQuery>,
) -> Result<Json<Vec<HelpRequest>>, ApiError> {
    let mut requests = state.db.list_help_requests(params.status)?;

    // Students only see their own requests
    if context.identity.role == Role::Student {
        requests.retain(|r| r.student_id == context.identity.id);
    }

    Ok(Json(requests))
}

/// GET /api/help-requests/:id
pub async fn get_help_request(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<HelpRequest>, ApiError> {
    let request = state
        .db
        .get_help_request(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Help request {} not found", id)))?;

    if context.identity.role == Role::Student && request.student_id != context.identity.id {
        return Err(ApiError::Forbidden);
    }

    Ok(Json(request))
}

/// POST /api/help-requests (students)
///
/// The requester is always the caller; the body carries only the content.
pub async fn create_help_request(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CreateHelpRequestRequest>,
) -> Result<(StatusCode, Json<HelpRequest>), ApiError> {
    if payload.subject.trim().is_empty() {
        return Err(ApiError::BadRequest("Subject is required".to_string()));
    }

    let request =
        state
            .db
            .create_help_request(&context.identity.id, &payload.subject, &payload.body)?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// PUT /api/help-requests/:id (mentors and admins)
///
/// Claiming without an explicit mentor assigns the caller.
pub async fn update_help_request(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateHelpRequestRequest>,
) -> Result<Json<HelpRequest>, ApiError> {
    let mentor_id = match (payload.status, payload.mentor_id) {
        (Some(HelpRequestStatus::Claimed), None) => Some(context.identity.id),
        (_, explicit) => explicit,
    };

    state
        .db
        .update_help_request(&id, payload.status, mentor_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Help request {} not found", id)))
}
