//! Assignment, task, assessment, and project endpoints.
//!
//! Assignment and assessment writes are mentor/admin gated at the router.
//! Tasks and projects are open to every role, but students can only touch
//! records they own.

use crate::api::routes::{ApiError, AppState};
use crate::auth::models::{AuthContext, Role};
use crate::models::{
    Assessment, Assignment, CreateAssessmentRequest, CreateAssignmentRequest, CreateProjectRequest,
    CreateTaskRequest, Project, Task, TaskStatus, UpdateAssessmentRequest, UpdateAssignmentRequest,
    UpdateProjectRequest, UpdateTaskRequest,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

/// Students act only on their own records; mentors and admins on any.
fn check_ownership(context: &AuthContext, student_id: &Uuid) -> Result<(), ApiError> {
    if context.identity.role == Role::Student && context.identity.id != *student_id {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

// ===== Assignments =====

#[derive(Debug, Deserialize)]
pub struct AssignmentQuery {
    pub student_id: Option<Uuid>,
}

/// GET /api/assignments
pub async fn list_assignments(
    State(state): State<AppState>,
    Query(params): Query<AssignmentQuery>,
) -> Result<Json<Vec<Assignment>>, ApiError> {
    Ok(Json(state.db.list_assignments(params.student_id.as_ref())?))
}

/// GET /api/assignments/:id
pub async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, ApiError> {
    state
        .db
        .get_assignment(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Assignment {} not found", id)))
}

/// POST /api/assignments
pub async fn create_assignment(
    State(state): State<AppState>,
    Json(payload): Json<CreateAssignmentRequest>,
) -> Result<(StatusCode, Json<Assignment>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    let assignment = state.db.create_assignment(
        &payload.title,
        &payload.description,
        &payload.mentor_id,
        &payload.student_id,
        payload.due_at,
    )?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// PUT /api/assignments/:id
pub async fn update_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssignmentRequest>,
) -> Result<Json<Assignment>, ApiError> {
    state
        .db
        .update_assignment(
            &id,
            payload.title,
            payload.description,
            payload.due_at,
            payload.status,
        )?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Assignment {} not found", id)))
}

/// DELETE /api/assignments/:id
pub async fn delete_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_assignment(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Assignment {} not found", id)))
    }
}

// ===== Tasks =====

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub student_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
}

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Query(params): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    // Students see their own tasks regardless of the filter they send
    let student_id = if context.identity.role == Role::Student {
        Some(context.identity.id)
    } else {
        params.student_id
    };

    Ok(Json(state.db.list_tasks(student_id.as_ref(), params.status)?))
}

/// GET /api/tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .db
        .get_task(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;

    check_ownership(&context, &task.student_id)?;
    Ok(Json(task))
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }
    check_ownership(&context, &payload.student_id)?;

    let task = state
        .db
        .create_task(&payload.student_id, &payload.title, payload.due_at)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /api/tasks/:id
pub async fn update_task(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .db
        .get_task(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;
    check_ownership(&context, &task.student_id)?;

    state
        .db
        .update_task(&id, payload.title, payload.status, payload.due_at)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))
}

/// DELETE /api/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let task = state
        .db
        .get_task(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;
    check_ownership(&context, &task.student_id)?;

    state.db.delete_task(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Assessments =====

#[derive(Debug, Deserialize)]
pub struct AssessmentQuery {
    pub student_id: Option<Uuid>,
}

/// GET /api/assessments
pub async fn list_assessments(
    State(state): State<AppState>,
    Query(params): Query<AssessmentQuery>,
) -> Result<Json<Vec<Assessment>>, ApiError> {
    Ok(Json(state.db.list_assessments(params.student_id.as_ref())?))
}

/// GET /api/assessments/:id
pub async fn get_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Assessment>, ApiError> {
    state
        .db
        .get_assessment(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Assessment {} not found", id)))
}

/// POST /api/assessments
pub async fn create_assessment(
    State(state): State<AppState>,
    Json(payload): Json<CreateAssessmentRequest>,
) -> Result<(StatusCode, Json<Assessment>), ApiError> {
    if payload.max_score <= 0.0 {
        return Err(ApiError::BadRequest(
            "max_score must be positive".to_string(),
        ));
    }

    let assessment = state.db.create_assessment(
        &payload.student_id,
        &payload.mentor_id,
        &payload.title,
        payload.score,
        payload.max_score,
    )?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

/// PUT /api/assessments/:id
pub async fn update_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssessmentRequest>,
) -> Result<Json<Assessment>, ApiError> {
    state
        .db
        .update_assessment(&id, payload.title, payload.score, payload.max_score)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Assessment {} not found", id)))
}

/// DELETE /api/assessments/:id
pub async fn delete_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_assessment(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Assessment {} not found", id)))
    }
}

// ===== Projects =====

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub student_id: Option<Uuid>,
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    Query(params): Query<ProjectQuery>,
) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(state.db.list_projects(params.student_id.as_ref())?))
}

/// GET /api/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    state
        .db
        .get_project(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }
    check_ownership(&context, &payload.student_id)?;

    let project = state.db.create_project(
        &payload.student_id,
        &payload.title,
        &payload.description,
        payload.repo_url,
    )?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// PUT /api/projects/:id
pub async fn update_project(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, ApiError> {
    let project = state
        .db
        .get_project(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))?;
    check_ownership(&context, &project.student_id)?;

    state
        .db
        .update_project(
            &id,
            payload.title,
            payload.description,
            payload.repo_url,
            payload.status,
        )?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))
}

/// DELETE /api/projects/:id
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let project = state
        .db
        .get_project(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))?;
    check_ownership(&context, &project.student_id)?;

    state.db.delete_project(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
