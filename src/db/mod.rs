//! Database-backed portal storage.
//!
//! Holds every non-identity collection (cohorts, assignments, tasks,
//! assessments, projects, resources, events, announcements, help requests)
//! plus the aggregation queries behind the dashboard endpoints.

use crate::models::{
    Announcement, Assessment, Assignment, AssignmentStatus, Cohort, DashboardSummary, Event,
    HelpRequest, HelpRequestStatus, Project, ProjectStatus, Resource, StudentDashboard, Task,
    TaskStatus,
};
use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS cohorts (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    starts_on TEXT NOT NULL,
    ends_on TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assignments (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    mentor_id TEXT NOT NULL,
    student_id TEXT NOT NULL,
    due_at TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL,
    title TEXT NOT NULL,
    status TEXT NOT NULL,
    due_at TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assessments (
    id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL,
    mentor_id TEXT NOT NULL,
    title TEXT NOT NULL,
    score REAL NOT NULL,
    max_score REAL NOT NULL,
    graded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    repo_url TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS resources (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    kind TEXT NOT NULL,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    starts_at TEXT NOT NULL,
    location TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS announcements (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    author_id TEXT NOT NULL,
    pinned INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS help_requests (
    id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    status TEXT NOT NULL,
    mentor_id TEXT,
    created_at TEXT NOT NULL,
    resolved_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_assignments_student ON assignments(student_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_assignments_status ON assignments(status);
CREATE INDEX IF NOT EXISTS idx_tasks_student ON tasks(student_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
CREATE INDEX IF NOT EXISTS idx_assessments_student ON assessments(student_id);
CREATE INDEX IF NOT EXISTS idx_projects_student ON projects(student_id);
CREATE INDEX IF NOT EXISTS idx_events_starts_at ON events(starts_at);
CREATE INDEX IF NOT EXISTS idx_announcements_pinned ON announcements(pinned DESC, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_help_requests_status ON help_requests(status, created_at DESC);
"#;

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_default()
}

fn parse_opt_uuid(s: Option<String>) -> Option<Uuid> {
    s.and_then(|s| Uuid::parse_str(&s).ok())
}

/// Portal entity storage over SQLite.
pub struct PortalDb {
    conn: Arc<Mutex<Connection>>,
}

impl PortalDb {
    pub fn new(db_path: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(db_path, flags)
            .with_context(|| format!("Failed to open portal database at {}", db_path))?;

        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize portal schema")?;

        info!("Portal database initialized at: {}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ===== Cohorts =====

    pub fn create_cohort(&self, name: &str, starts_on: &str, ends_on: &str) -> Result<Cohort> {
        let cohort = Cohort {
            id: Uuid::new_v4(),
            name: name.to_string(),
            starts_on: starts_on.to_string(),
            ends_on: ends_on.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO cohorts (id, name, starts_on, ends_on, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                cohort.id.to_string(),
                cohort.name,
                cohort.starts_on,
                cohort.ends_on,
                cohort.created_at,
            ],
        )
        .context("Failed to insert cohort")?;

        Ok(cohort)
    }

    fn cohort_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cohort> {
        Ok(Cohort {
            id: parse_uuid(row.get(0)?),
            name: row.get(1)?,
            starts_on: row.get(2)?,
            ends_on: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    pub fn get_cohort(&self, id: &Uuid) -> Result<Option<Cohort>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT id, name, starts_on, ends_on, created_at FROM cohorts WHERE id = ?1",
            params![id.to_string()],
            Self::cohort_from_row,
        );

        match result {
            Ok(cohort) => Ok(Some(cohort)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_cohorts(&self) -> Result<Vec<Cohort>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, starts_on, ends_on, created_at FROM cohorts ORDER BY starts_on DESC",
        )?;
        let cohorts = stmt
            .query_map([], Self::cohort_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cohorts)
    }

    pub fn update_cohort(
        &self,
        id: &Uuid,
        name: Option<String>,
        starts_on: Option<String>,
        ends_on: Option<String>,
    ) -> Result<Option<Cohort>> {
        let Some(mut cohort) = self.get_cohort(id)? else {
            return Ok(None);
        };

        if let Some(name) = name {
            cohort.name = name;
        }
        if let Some(starts_on) = starts_on {
            cohort.starts_on = starts_on;
        }
        if let Some(ends_on) = ends_on {
            cohort.ends_on = ends_on;
        }

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE cohorts SET name = ?1, starts_on = ?2, ends_on = ?3 WHERE id = ?4",
            params![
                cohort.name,
                cohort.starts_on,
                cohort.ends_on,
                id.to_string()
            ],
        )
        .context("Failed to update cohort")?;

        Ok(Some(cohort))
    }

    pub fn delete_cohort(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "DELETE FROM cohorts WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ===== Assignments =====

    pub fn create_assignment(
        &self,
        title: &str,
        description: &str,
        mentor_id: &Uuid,
        student_id: &Uuid,
        due_at: Option<String>,
    ) -> Result<Assignment> {
        let assignment = Assignment {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            mentor_id: *mentor_id,
            student_id: *student_id,
            due_at,
            status: AssignmentStatus::Assigned,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO assignments (id, title, description, mentor_id, student_id, due_at, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                assignment.id.to_string(),
                assignment.title,
                assignment.description,
                assignment.mentor_id.to_string(),
                assignment.student_id.to_string(),
                assignment.due_at,
                assignment.status.as_str(),
                assignment.created_at,
            ],
        )
        .context("Failed to insert assignment")?;

        Ok(assignment)
    }

    fn assignment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Assignment> {
        let status: String = row.get(6)?;
        Ok(Assignment {
            id: parse_uuid(row.get(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            mentor_id: parse_uuid(row.get(3)?),
            student_id: parse_uuid(row.get(4)?),
            due_at: row.get(5)?,
            status: AssignmentStatus::from_str(&status).unwrap_or(AssignmentStatus::Assigned),
            created_at: row.get(7)?,
        })
    }

    pub fn get_assignment(&self, id: &Uuid) -> Result<Option<Assignment>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT id, title, description, mentor_id, student_id, due_at, status, created_at
             FROM assignments WHERE id = ?1",
            params![id.to_string()],
            Self::assignment_from_row,
        );

        match result {
            Ok(assignment) => Ok(Some(assignment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_assignments(&self, student_id: Option<&Uuid>) -> Result<Vec<Assignment>> {
        let conn = self.conn.lock();

        let (sql, param): (&str, Option<String>) = match student_id {
            Some(id) => (
                "SELECT id, title, description, mentor_id, student_id, due_at, status, created_at
                 FROM assignments WHERE student_id = ?1 ORDER BY created_at DESC",
                Some(id.to_string()),
            ),
            None => (
                "SELECT id, title, description, mentor_id, student_id, due_at, status, created_at
                 FROM assignments ORDER BY created_at DESC",
                None,
            ),
        };

        let mut stmt = conn.prepare(sql)?;
        let assignments = match param {
            Some(p) => stmt
                .query_map(params![p], Self::assignment_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], Self::assignment_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(assignments)
    }

    pub fn update_assignment(
        &self,
        id: &Uuid,
        title: Option<String>,
        description: Option<String>,
        due_at: Option<String>,
        status: Option<AssignmentStatus>,
    ) -> Result<Option<Assignment>> {
        let Some(mut assignment) = self.get_assignment(id)? else {
            return Ok(None);
        };

        if let Some(title) = title {
            assignment.title = title;
        }
        if let Some(description) = description {
            assignment.description = description;
        }
        if let Some(due_at) = due_at {
            assignment.due_at = Some(due_at);
        }
        if let Some(status) = status {
            assignment.status = status;
        }

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE assignments SET title = ?1, description = ?2, due_at = ?3, status = ?4 WHERE id = ?5",
            params![
                assignment.title,
                assignment.description,
                assignment.due_at,
                assignment.status.as_str(),
                id.to_string(),
            ],
        )
        .context("Failed to update assignment")?;

        Ok(Some(assignment))
    }

    pub fn delete_assignment(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "DELETE FROM assignments WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ===== Tasks =====

    pub fn create_task(
        &self,
        student_id: &Uuid,
        title: &str,
        due_at: Option<String>,
    ) -> Result<Task> {
        let task = Task {
            id: Uuid::new_v4(),
            student_id: *student_id,
            title: title.to_string(),
            status: TaskStatus::Todo,
            due_at,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO tasks (id, student_id, title, status, due_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                task.id.to_string(),
                task.student_id.to_string(),
                task.title,
                task.status.as_str(),
                task.due_at,
                task.created_at,
            ],
        )
        .context("Failed to insert task")?;

        Ok(task)
    }

    fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
        let status: String = row.get(3)?;
        Ok(Task {
            id: parse_uuid(row.get(0)?),
            student_id: parse_uuid(row.get(1)?),
            title: row.get(2)?,
            status: TaskStatus::from_str(&status).unwrap_or(TaskStatus::Todo),
            due_at: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    pub fn get_task(&self, id: &Uuid) -> Result<Option<Task>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT id, student_id, title, status, due_at, created_at FROM tasks WHERE id = ?1",
            params![id.to_string()],
            Self::task_from_row,
        );

        match result {
            Ok(task) => Ok(Some(task)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_tasks(
        &self,
        student_id: Option<&Uuid>,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>> {
        let conn = self.conn.lock();

        let mut sql = String::from(
            "SELECT id, student_id, title, status, due_at, created_at FROM tasks WHERE 1=1",
        );
        let mut bindings: Vec<String> = Vec::new();

        if let Some(id) = student_id {
            bindings.push(id.to_string());
            sql.push_str(&format!(" AND student_id = ?{}", bindings.len()));
        }
        if let Some(status) = status {
            bindings.push(status.as_str().to_string());
            sql.push_str(&format!(" AND status = ?{}", bindings.len()));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(rusqlite::params_from_iter(bindings.iter()), Self::task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    pub fn update_task(
        &self,
        id: &Uuid,
        title: Option<String>,
        status: Option<TaskStatus>,
        due_at: Option<String>,
    ) -> Result<Option<Task>> {
        let Some(mut task) = self.get_task(id)? else {
            return Ok(None);
        };

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(status) = status {
            task.status = status;
        }
        if let Some(due_at) = due_at {
            task.due_at = Some(due_at);
        }

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE tasks SET title = ?1, status = ?2, due_at = ?3 WHERE id = ?4",
            params![
                task.title,
                task.status.as_str(),
                task.due_at,
                id.to_string()
            ],
        )
        .context("Failed to update task")?;

        Ok(Some(task))
    }

    pub fn delete_task(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
        Ok(rows > 0)
    }

    // ===== Assessments =====

    pub fn create_assessment(
        &self,
        student_id: &Uuid,
        mentor_id: &Uuid,
        title: &str,
        score: f64,
        max_score: f64,
    ) -> Result<Assessment> {
        let assessment = Assessment {
            id: Uuid::new_v4(),
            student_id: *student_id,
            mentor_id: *mentor_id,
            title: title.to_string(),
            score,
            max_score,
            graded_at: Utc::now().to_rfc3339(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO assessments (id, student_id, mentor_id, title, score, max_score, graded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                assessment.id.to_string(),
                assessment.student_id.to_string(),
                assessment.mentor_id.to_string(),
                assessment.title,
                assessment.score,
                assessment.max_score,
                assessment.graded_at,
            ],
        )
        .context("Failed to insert assessment")?;

        Ok(assessment)
    }

    fn assessment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Assessment> {
        Ok(Assessment {
            id: parse_uuid(row.get(0)?),
            student_id: parse_uuid(row.get(1)?),
            mentor_id: parse_uuid(row.get(2)?),
            title: row.get(3)?,
            score: row.get(4)?,
            max_score: row.get(5)?,
            graded_at: row.get(6)?,
        })
    }

    pub fn get_assessment(&self, id: &Uuid) -> Result<Option<Assessment>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT id, student_id, mentor_id, title, score, max_score, graded_at
             FROM assessments WHERE id = ?1",
            params![id.to_string()],
            Self::assessment_from_row,
        );

        match result {
            Ok(assessment) => Ok(Some(assessment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_assessments(&self, student_id: Option<&Uuid>) -> Result<Vec<Assessment>> {
        let conn = self.conn.lock();

        let (sql, param): (&str, Option<String>) = match student_id {
            Some(id) => (
                "SELECT id, student_id, mentor_id, title, score, max_score, graded_at
                 FROM assessments WHERE student_id = ?1 ORDER BY graded_at DESC",
                Some(id.to_string()),
            ),
            None => (
                "SELECT id, student_id, mentor_id, title, score, max_score, graded_at
                 FROM assessments ORDER BY graded_at DESC",
                None,
            ),
        };

        let mut stmt = conn.prepare(sql)?;
        let assessments = match param {
            Some(p) => stmt
                .query_map(params![p], Self::assessment_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], Self::assessment_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(assessments)
    }

    pub fn update_assessment(
        &self,
        id: &Uuid,
        title: Option<String>,
        score: Option<f64>,
        max_score: Option<f64>,
    ) -> Result<Option<Assessment>> {
        let Some(mut assessment) = self.get_assessment(id)? else {
            return Ok(None);
        };

        if let Some(title) = title {
            assessment.title = title;
        }
        if let Some(score) = score {
            assessment.score = score;
        }
        if let Some(max_score) = max_score {
            assessment.max_score = max_score;
        }

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE assessments SET title = ?1, score = ?2, max_score = ?3 WHERE id = ?4",
            params![
                assessment.title,
                assessment.score,
                assessment.max_score,
                id.to_string(),
            ],
        )
        .context("Failed to update assessment")?;

        Ok(Some(assessment))
    }

    pub fn delete_assessment(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "DELETE FROM assessments WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ===== Projects =====

    pub fn create_project(
        &self,
        student_id: &Uuid,
        title: &str,
        description: &str,
        repo_url: Option<String>,
    ) -> Result<Project> {
        let project = Project {
            id: Uuid::new_v4(),
            student_id: *student_id,
            title: title.to_string(),
            description: description.to_string(),
            repo_url,
            status: ProjectStatus::Proposed,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO projects (id, student_id, title, description, repo_url, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                project.id.to_string(),
                project.student_id.to_string(),
                project.title,
                project.description,
                project.repo_url,
                project.status.as_str(),
                project.created_at,
            ],
        )
        .context("Failed to insert project")?;

        Ok(project)
    }

    fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
        let status: String = row.get(5)?;
        Ok(Project {
            id: parse_uuid(row.get(0)?),
            student_id: parse_uuid(row.get(1)?),
            title: row.get(2)?,
            description: row.get(3)?,
            repo_url: row.get(4)?,
            status: ProjectStatus::from_str(&status).unwrap_or(ProjectStatus::Proposed),
            created_at: row.get(6)?,
        })
    }

    pub fn get_project(&self, id: &Uuid) -> Result<Option<Project>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT id, student_id, title, description, repo_url, status, created_at
             FROM projects WHERE id = ?1",
            params![id.to_string()],
            Self::project_from_row,
        );

        match result {
            Ok(project) => Ok(Some(project)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_projects(&self, student_id: Option<&Uuid>) -> Result<Vec<Project>> {
        let conn = self.conn.lock();

        let (sql, param): (&str, Option<String>) = match student_id {
            Some(id) => (
                "SELECT id, student_id, title, description, repo_url, status, created_at
                 FROM projects WHERE student_id = ?1 ORDER BY created_at DESC",
                Some(id.to_string()),
            ),
            None => (
                "SELECT id, student_id, title, description, repo_url, status, created_at
                 FROM projects ORDER BY created_at DESC",
                None,
            ),
        };

        let mut stmt = conn.prepare(sql)?;
        let projects = match param {
            Some(p) => stmt
                .query_map(params![p], Self::project_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], Self::project_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(projects)
    }

    pub fn update_project(
        &self,
        id: &Uuid,
        title: Option<String>,
        description: Option<String>,
        repo_url: Option<String>,
        status: Option<ProjectStatus>,
    ) -> Result<Option<Project>> {
        let Some(mut project) = self.get_project(id)? else {
            return Ok(None);
        };

        if let Some(title) = title {
            project.title = title;
        }
        if let Some(description) = description {
            project.description = description;
        }
        if let Some(repo_url) = repo_url {
            project.repo_url = Some(repo_url);
        }
        if let Some(status) = status {
            project.status = status;
        }

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE projects SET title = ?1, description = ?2, repo_url = ?3, status = ?4 WHERE id = ?5",
            params![
                project.title,
                project.description,
                project.repo_url,
                project.status.as_str(),
                id.to_string(),
            ],
        )
        .context("Failed to update project")?;

        Ok(Some(project))
    }

    pub fn delete_project(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "DELETE FROM projects WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ===== Resources =====

    pub fn create_resource(
        &self,
        title: &str,
        url: &str,
        kind: &str,
        created_by: &Uuid,
    ) -> Result<Resource> {
        let resource = Resource {
            id: Uuid::new_v4(),
            title: title.to_string(),
            url: url.to_string(),
            kind: kind.to_string(),
            created_by: *created_by,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO resources (id, title, url, kind, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                resource.id.to_string(),
                resource.title,
                resource.url,
                resource.kind,
                resource.created_by.to_string(),
                resource.created_at,
            ],
        )
        .context("Failed to insert resource")?;

        Ok(resource)
    }

    fn resource_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Resource> {
        Ok(Resource {
            id: parse_uuid(row.get(0)?),
            title: row.get(1)?,
            url: row.get(2)?,
            kind: row.get(3)?,
            created_by: parse_uuid(row.get(4)?),
            created_at: row.get(5)?,
        })
    }

    pub fn list_resources(&self) -> Result<Vec<Resource>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, url, kind, created_by, created_at FROM resources ORDER BY created_at DESC",
        )?;
        let resources = stmt
            .query_map([], Self::resource_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(resources)
    }

    pub fn delete_resource(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "DELETE FROM resources WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ===== Events =====

    pub fn create_event(
        &self,
        title: &str,
        description: &str,
        starts_at: &str,
        location: Option<String>,
    ) -> Result<Event> {
        let event = Event {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            starts_at: starts_at.to_string(),
            location,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO events (id, title, description, starts_at, location, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.id.to_string(),
                event.title,
                event.description,
                event.starts_at,
                event.location,
                event.created_at,
            ],
        )
        .context("Failed to insert event")?;

        Ok(event)
    }

    fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
        Ok(Event {
            id: parse_uuid(row.get(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            starts_at: row.get(3)?,
            location: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    pub fn get_event(&self, id: &Uuid) -> Result<Option<Event>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT id, title, description, starts_at, location, created_at FROM events WHERE id = ?1",
            params![id.to_string()],
            Self::event_from_row,
        );

        match result {
            Ok(event) => Ok(Some(event)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_events(&self) -> Result<Vec<Event>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, description, starts_at, location, created_at FROM events ORDER BY starts_at ASC",
        )?;
        let events = stmt
            .query_map([], Self::event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    pub fn update_event(
        &self,
        id: &Uuid,
        title: Option<String>,
        description: Option<String>,
        starts_at: Option<String>,
        location: Option<String>,
    ) -> Result<Option<Event>> {
        let Some(mut event) = self.get_event(id)? else {
            return Ok(None);
        };

        if let Some(title) = title {
            event.title = title;
        }
        if let Some(description) = description {
            event.description = description;
        }
        if let Some(starts_at) = starts_at {
            event.starts_at = starts_at;
        }
        if let Some(location) = location {
            event.location = Some(location);
        }

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE events SET title = ?1, description = ?2, starts_at = ?3, location = ?4 WHERE id = ?5",
            params![
                event.title,
                event.description,
                event.starts_at,
                event.location,
                id.to_string(),
            ],
        )
        .context("Failed to update event")?;

        Ok(Some(event))
    }

    pub fn delete_event(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM events WHERE id = ?1", params![id.to_string()])?;
        Ok(rows > 0)
    }

    // ===== Announcements =====

    pub fn create_announcement(
        &self,
        title: &str,
        body: &str,
        author_id: &Uuid,
        pinned: bool,
    ) -> Result<Announcement> {
        let announcement = Announcement {
            id: Uuid::new_v4(),
            title: title.to_string(),
            body: body.to_string(),
            author_id: *author_id,
            pinned,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO announcements (id, title, body, author_id, pinned, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                announcement.id.to_string(),
                announcement.title,
                announcement.body,
                announcement.author_id.to_string(),
                announcement.pinned as i64,
                announcement.created_at,
            ],
        )
        .context("Failed to insert announcement")?;

        Ok(announcement)
    }

    fn announcement_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Announcement> {
        Ok(Announcement {
            id: parse_uuid(row.get(0)?),
            title: row.get(1)?,
            body: row.get(2)?,
            author_id: parse_uuid(row.get(3)?),
            pinned: row.get::<_, i64>(4)? != 0,
            created_at: row.get(5)?,
        })
    }

    pub fn get_announcement(&self, id: &Uuid) -> Result<Option<Announcement>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT id, title, body, author_id, pinned, created_at FROM announcements WHERE id = ?1",
            params![id.to_string()],
            Self::announcement_from_row,
        );

        match result {
            Ok(announcement) => Ok(Some(announcement)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_announcements(&self) -> Result<Vec<Announcement>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, body, author_id, pinned, created_at
             FROM announcements ORDER BY pinned DESC, created_at DESC",
        )?;
        let announcements = stmt
            .query_map([], Self::announcement_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(announcements)
    }

    pub fn update_announcement(
        &self,
        id: &Uuid,
        title: Option<String>,
        body: Option<String>,
        pinned: Option<bool>,
    ) -> Result<Option<Announcement>> {
        let Some(mut announcement) = self.get_announcement(id)? else {
            return Ok(None);
        };

        if let Some(title) = title {
            announcement.title = title;
        }
        if let Some(body) = body {
            announcement.body = body;
        }
        if let Some(pinned) = pinned {
            announcement.pinned = pinned;
        }

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE announcements SET title = ?1, body = ?2, pinned = ?3 WHERE id = ?4",
            params![
                announcement.title,
                announcement.body,
                announcement.pinned as i64,
                id.to_string(),
            ],
        )
        .context("Failed to update announcement")?;

        Ok(Some(announcement))
    }

    pub fn delete_announcement(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "DELETE FROM announcements WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ===== Help requests =====

    pub fn create_help_request(
        &self,
        student_id: &Uuid,
        subject: &str,
        body: &str,
    ) -> Result<HelpRequest> {
        let request = HelpRequest {
            id: Uuid::new_v4(),
            student_id: *student_id,
            subject: subject.to_string(),
            body: body.to_string(),
            status: HelpRequestStatus::Open,
            mentor_id: None,
            created_at: Utc::now().to_rfc3339(),
            resolved_at: None,
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO help_requests (id, student_id, subject, body, status, mentor_id, created_at, resolved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, NULL)",
            params![
                request.id.to_string(),
                request.student_id.to_string(),
                request.subject,
                request.body,
                request.status.as_str(),
                request.created_at,
            ],
        )
        .context("Failed to insert help request")?;

        Ok(request)
    }

    fn help_request_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HelpRequest> {
        let status: String = row.get(4)?;
        Ok(HelpRequest {
            id: parse_uuid(row.get(0)?),
            student_id: parse_uuid(row.get(1)?),
            subject: row.get(2)?,
            body: row.get(3)?,
            status: HelpRequestStatus::from_str(&status).unwrap_or(HelpRequestStatus::Open),
            mentor_id: parse_opt_uuid(row.get(5)?),
            created_at: row.get(6)?,
            resolved_at: row.get(7)?,
        })
    }

    pub fn get_help_request(&self, id: &Uuid) -> Result<Option<HelpRequest>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT id, student_id, subject, body, status, mentor_id, created_at, resolved_at
             FROM help_requests WHERE id = ?1",
            params![id.to_string()],
            Self::help_request_from_row,
        );

        match result {
            Ok(request) => Ok(Some(request)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_help_requests(&self, status: Option<HelpRequestStatus>) -> Result<Vec<HelpRequest>> {
        let conn = self.conn.lock();

        let (sql, param): (&str, Option<String>) = match status {
            Some(status) => (
                "SELECT id, student_id, subject, body, status, mentor_id, created_at, resolved_at
                 FROM help_requests WHERE status = ?1 ORDER BY created_at DESC",
                Some(status.as_str().to_string()),
            ),
            None => (
                "SELECT id, student_id, subject, body, status, mentor_id, created_at, resolved_at
                 FROM help_requests ORDER BY created_at DESC",
                None,
            ),
        };

        let mut stmt = conn.prepare(sql)?;
        let requests = match param {
            Some(p) => stmt
                .query_map(params![p], Self::help_request_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], Self::help_request_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(requests)
    }

    /// Update status and mentor. Moving to resolved stamps `resolved_at`.
    pub fn update_help_request(
        &self,
        id: &Uuid,
        status: Option<HelpRequestStatus>,
        mentor_id: Option<Uuid>,
    ) -> Result<Option<HelpRequest>> {
        let Some(mut request) = self.get_help_request(id)? else {
            return Ok(None);
        };

        if let Some(mentor_id) = mentor_id {
            request.mentor_id = Some(mentor_id);
        }
        if let Some(status) = status {
            request.status = status;
            if status == HelpRequestStatus::Resolved && request.resolved_at.is_none() {
                request.resolved_at = Some(Utc::now().to_rfc3339());
            }
        }

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE help_requests SET status = ?1, mentor_id = ?2, resolved_at = ?3 WHERE id = ?4",
            params![
                request.status.as_str(),
                request.mentor_id.map(|id| id.to_string()),
                request.resolved_at,
                id.to_string(),
            ],
        )
        .context("Failed to update help request")?;

        Ok(Some(request))
    }

    // ===== Dashboard aggregation =====

    fn count_where(&self, sql: &str, bindings: &[&str]) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn
            .query_row(sql, rusqlite::params_from_iter(bindings.iter()), |row| {
                row.get(0)
            })
            .context("Failed to run dashboard count")?;
        Ok(count)
    }

    /// Portal-wide counters. Identity partition counts come from the
    /// identity store and are passed in.
    pub fn dashboard_summary(&self, students: i64, mentors: i64) -> Result<DashboardSummary> {
        let now = Utc::now().to_rfc3339();

        Ok(DashboardSummary {
            students,
            mentors,
            cohorts: self.count_where("SELECT COUNT(*) FROM cohorts", &[])?,
            assignments_assigned: self.count_where(
                "SELECT COUNT(*) FROM assignments WHERE status = ?1",
                &["assigned"],
            )?,
            assignments_submitted: self.count_where(
                "SELECT COUNT(*) FROM assignments WHERE status = ?1",
                &["submitted"],
            )?,
            assignments_graded: self.count_where(
                "SELECT COUNT(*) FROM assignments WHERE status = ?1",
                &["graded"],
            )?,
            open_help_requests: self.count_where(
                "SELECT COUNT(*) FROM help_requests WHERE status = ?1",
                &["open"],
            )?,
            upcoming_events: self.count_where(
                "SELECT COUNT(*) FROM events WHERE starts_at > ?1",
                &[now.as_str()],
            )?,
            resources: self.count_where("SELECT COUNT(*) FROM resources", &[])?,
            announcements: self.count_where("SELECT COUNT(*) FROM announcements", &[])?,
        })
    }

    /// Per-student rollup for the student dashboard view.
    pub fn student_dashboard(&self, student_id: &Uuid) -> Result<StudentDashboard> {
        let id = student_id.to_string();

        let assessment_average: Option<f64> = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT AVG(score / max_score) FROM assessments WHERE student_id = ?1 AND max_score > 0",
                params![id],
                |row| row.get(0),
            )
            .context("Failed to average assessments")?
        };

        Ok(StudentDashboard {
            student_id: id.clone(),
            tasks_todo: self.count_where(
                "SELECT COUNT(*) FROM tasks WHERE student_id = ?1 AND status = ?2",
                &[id.as_str(), "todo"],
            )?,
            tasks_in_progress: self.count_where(
                "SELECT COUNT(*) FROM tasks WHERE student_id = ?1 AND status = ?2",
                &[id.as_str(), "in_progress"],
            )?,
            tasks_done: self.count_where(
                "SELECT COUNT(*) FROM tasks WHERE student_id = ?1 AND status = ?2",
                &[id.as_str(), "done"],
            )?,
            assignments: self.count_where(
                "SELECT COUNT(*) FROM assignments WHERE student_id = ?1",
                &[id.as_str()],
            )?,
            projects: self.count_where(
                "SELECT COUNT(*) FROM projects WHERE student_id = ?1",
                &[id.as_str()],
            )?,
            assessment_average,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_db() -> (PortalDb, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db = PortalDb::new(temp_file.path().to_str().unwrap()).unwrap();
        (db, temp_file)
    }

    #[test]
    fn test_cohort_crud() {
        let (db, _temp) = create_test_db();

        let cohort = db
            .create_cohort("Spring 2026", "2026-03-01", "2026-06-30")
            .unwrap();
        assert_eq!(db.list_cohorts().unwrap().len(), 1);

        let updated = db
            .update_cohort(&cohort.id, Some("Spring '26".to_string()), None, None)
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Spring '26");
        assert_eq!(updated.starts_on, "2026-03-01");

        assert!(db.delete_cohort(&cohort.id).unwrap());
        assert!(db.get_cohort(&cohort.id).unwrap().is_none());
    }

    #[test]
    fn test_assignment_lifecycle() {
        let (db, _temp) = create_test_db();
        let mentor = Uuid::new_v4();
        let student = Uuid::new_v4();

        let assignment = db
            .create_assignment("Parser", "Build a parser", &mentor, &student, None)
            .unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Assigned);

        let submitted = db
            .update_assignment(
                &assignment.id,
                None,
                None,
                None,
                Some(AssignmentStatus::Submitted),
            )
            .unwrap()
            .unwrap();
        assert_eq!(submitted.status, AssignmentStatus::Submitted);

        // Filter by student
        assert_eq!(db.list_assignments(Some(&student)).unwrap().len(), 1);
        assert_eq!(db.list_assignments(Some(&mentor)).unwrap().len(), 0);
    }

    #[test]
    fn test_task_filters() {
        let (db, _temp) = create_test_db();
        let student = Uuid::new_v4();
        let other = Uuid::new_v4();

        let t1 = db.create_task(&student, "read chapter 3", None).unwrap();
        db.create_task(&student, "set up toolchain", None).unwrap();
        db.create_task(&other, "unrelated", None).unwrap();

        db.update_task(&t1.id, None, Some(TaskStatus::Done), None)
            .unwrap();

        assert_eq!(db.list_tasks(Some(&student), None).unwrap().len(), 2);
        assert_eq!(
            db.list_tasks(Some(&student), Some(TaskStatus::Done))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(db.list_tasks(None, None).unwrap().len(), 3);
    }

    #[test]
    fn test_help_request_resolution_stamps_timestamp() {
        let (db, _temp) = create_test_db();
        let student = Uuid::new_v4();
        let mentor = Uuid::new_v4();

        let request = db
            .create_help_request(&student, "borrowck", "fighting the borrow checker")
            .unwrap();
        assert_eq!(request.status, HelpRequestStatus::Open);
        assert!(request.resolved_at.is_none());

        let claimed = db
            .update_help_request(&request.id, Some(HelpRequestStatus::Claimed), Some(mentor))
            .unwrap()
            .unwrap();
        assert_eq!(claimed.status, HelpRequestStatus::Claimed);
        assert!(claimed.resolved_at.is_none());

        let resolved = db
            .update_help_request(&request.id, Some(HelpRequestStatus::Resolved), None)
            .unwrap()
            .unwrap();
        assert!(resolved.resolved_at.is_some());
        assert_eq!(resolved.mentor_id, Some(mentor));
    }

    #[test]
    fn test_dashboard_summary_counts() {
        let (db, _temp) = create_test_db();
        let mentor = Uuid::new_v4();
        let student = Uuid::new_v4();

        db.create_assignment("A", "a", &mentor, &student, None)
            .unwrap();
        db.create_assignment("B", "b", &mentor, &student, None)
            .unwrap();
        db.create_help_request(&student, "help", "please").unwrap();
        db.create_resource("The Book", "https://doc.rust-lang.org/book", "link", &mentor)
            .unwrap();

        let summary = db.dashboard_summary(5, 2).unwrap();
        assert_eq!(summary.students, 5);
        assert_eq!(summary.mentors, 2);
        assert_eq!(summary.assignments_assigned, 2);
        assert_eq!(summary.assignments_graded, 0);
        assert_eq!(summary.open_help_requests, 1);
        assert_eq!(summary.resources, 1);
    }

    #[test]
    fn test_student_dashboard_rollup() {
        let (db, _temp) = create_test_db();
        let student = Uuid::new_v4();
        let mentor = Uuid::new_v4();

        let t1 = db.create_task(&student, "one", None).unwrap();
        db.create_task(&student, "two", None).unwrap();
        db.update_task(&t1.id, None, Some(TaskStatus::Done), None)
            .unwrap();

        db.create_assessment(&student, &mentor, "midterm", 8.0, 10.0)
            .unwrap();
        db.create_assessment(&student, &mentor, "final", 6.0, 10.0)
            .unwrap();

        let dashboard = db.student_dashboard(&student).unwrap();
        assert_eq!(dashboard.tasks_todo, 1);
        assert_eq!(dashboard.tasks_done, 1);
        let avg = dashboard.assessment_average.unwrap();
        assert!((avg - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_student_dashboard_empty_average_is_none() {
        let (db, _temp) = create_test_db();
        let dashboard = db.student_dashboard(&Uuid::new_v4()).unwrap();
        assert!(dashboard.assessment_average.is_none());
        assert_eq!(dashboard.assignments, 0);
    }
}
