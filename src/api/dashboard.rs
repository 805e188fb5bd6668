//! Dashboard aggregation endpoints.

use crate::api::routes::{ApiError, AppState};
use crate::auth::models::{AuthContext, Role};
use crate::models::{DashboardSummary, StudentDashboard};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

/// GET /api/dashboard/summary (mentors and admins)
pub async fn summary(State(state): State<AppState>) -> Result<Json<DashboardSummary>, ApiError> {
    let students = state.identities.count(Role::Student)?;
    let mentors = state.identities.count(Role::Mentor)?;

    Ok(Json(state.db.dashboard_summary(students, mentors)?))
}

/// GET /api/dashboard/students/:id
///
/// A student can read their own rollup; mentors and admins can read anyone's.
pub async fn student_dashboard(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<StudentDashboard>, ApiError> {
    if context.identity.role == Role::Student && context.identity.id != id {
        return Err(ApiError::Forbidden);
    }

    if state.identities.find_by_id(Role::Student, &id)?.is_none() {
        return Err(ApiError::NotFound(format!("Student {} not found", id)));
    }

    Ok(Json(state.db.student_dashboard(&id)?))
}
