//! Portal domain models and request/response DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named intake of students with a start and end date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cohort {
    pub id: Uuid,
    pub name: String,
    pub starts_on: String,
    pub ends_on: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCohortRequest {
    pub name: String,
    pub starts_on: String,
    pub ends_on: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCohortRequest {
    pub name: Option<String>,
    pub starts_on: Option<String>,
    pub ends_on: Option<String>,
}

/// Mentor-issued work item for one student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub mentor_id: Uuid,
    pub student_id: Uuid,
    pub due_at: Option<String>,
    pub status: AssignmentStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssignmentStatus {
    #[serde(rename = "assigned")]
    Assigned,
    #[serde(rename = "submitted")]
    Submitted,
    #[serde(rename = "graded")]
    Graded,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::Submitted => "submitted",
            AssignmentStatus::Graded => "graded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "assigned" => Some(AssignmentStatus::Assigned),
            "submitted" => Some(AssignmentStatus::Submitted),
            "graded" => Some(AssignmentStatus::Graded),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAssignmentRequest {
    pub title: String,
    pub description: String,
    pub mentor_id: Uuid,
    pub student_id: Uuid,
    pub due_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssignmentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_at: Option<String>,
    pub status: Option<AssignmentStatus>,
}

/// Student-owned to-do item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub due_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub student_id: Uuid,
    pub title: String,
    pub due_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_at: Option<String>,
}

/// Graded evaluation of a student by a mentor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub mentor_id: Uuid,
    pub title: String,
    pub score: f64,
    pub max_score: f64,
    pub graded_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssessmentRequest {
    pub student_id: Uuid,
    pub mentor_id: Uuid,
    pub title: String,
    pub score: f64,
    pub max_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssessmentRequest {
    pub title: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
}

/// Longer-form student work tracked beyond single assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub description: String,
    pub repo_url: Option<String>,
    pub status: ProjectStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProjectStatus {
    #[serde(rename = "proposed")]
    Proposed,
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "completed")]
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ProjectStatus::Proposed => "proposed",
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "proposed" => Some(ProjectStatus::Proposed),
            "active" => Some(ProjectStatus::Active),
            "completed" => Some(ProjectStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub student_id: Uuid,
    pub title: String,
    pub description: String,
    pub repo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub repo_url: Option<String>,
    pub status: Option<ProjectStatus>,
}

/// Shared learning material (link, document, video).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub kind: String,
    pub created_by: Uuid,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateResourceRequest {
    pub title: String,
    pub url: String,
    pub kind: String,
}

/// Calendar entry visible to everyone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub starts_at: String,
    pub location: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub starts_at: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<String>,
    pub location: Option<String>,
}

/// Broadcast message from a mentor or admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub author_id: Uuid,
    pub pinned: bool,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub body: String,
    pub pinned: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub pinned: Option<bool>,
}

/// A student's request for help, claimable by a mentor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpRequest {
    pub id: Uuid,
    pub student_id: Uuid,
    pub subject: String,
    pub body: String,
    pub status: HelpRequestStatus,
    pub mentor_id: Option<Uuid>,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HelpRequestStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "claimed")]
    Claimed,
    #[serde(rename = "resolved")]
    Resolved,
}

impl HelpRequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            HelpRequestStatus::Open => "open",
            HelpRequestStatus::Claimed => "claimed",
            HelpRequestStatus::Resolved => "resolved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(HelpRequestStatus::Open),
            "claimed" => Some(HelpRequestStatus::Claimed),
            "resolved" => Some(HelpRequestStatus::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateHelpRequestRequest {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHelpRequestRequest {
    pub status: Option<HelpRequestStatus>,
    pub mentor_id: Option<Uuid>,
}

/// Aggregate counts for the portal-wide dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub students: i64,
    pub mentors: i64,
    pub cohorts: i64,
    pub assignments_assigned: i64,
    pub assignments_submitted: i64,
    pub assignments_graded: i64,
    pub open_help_requests: i64,
    pub upcoming_events: i64,
    pub resources: i64,
    pub announcements: i64,
}

/// Per-student dashboard rollup.
#[derive(Debug, Serialize)]
pub struct StudentDashboard {
    pub student_id: String,
    pub tasks_todo: i64,
    pub tasks_in_progress: i64,
    pub tasks_done: i64,
    pub assignments: i64,
    pub projects: i64,
    pub assessment_average: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            r#""in_progress""#
        );
        assert_eq!(
            serde_json::to_string(&AssignmentStatus::Graded).unwrap(),
            r#""graded""#
        );
        assert_eq!(
            serde_json::to_string(&HelpRequestStatus::Open).unwrap(),
            r#""open""#
        );
    }

    #[test]
    fn test_status_string_conversion() {
        assert_eq!(TaskStatus::from_str("todo"), Some(TaskStatus::Todo));
        assert_eq!(TaskStatus::from_str("DONE"), Some(TaskStatus::Done));
        assert_eq!(TaskStatus::from_str("paused"), None);

        assert_eq!(
            AssignmentStatus::from_str("submitted"),
            Some(AssignmentStatus::Submitted)
        );
        assert_eq!(
            ProjectStatus::from_str("active"),
            Some(ProjectStatus::Active)
        );
        assert_eq!(
            HelpRequestStatus::from_str("claimed"),
            Some(HelpRequestStatus::Claimed)
        );
    }
}
