//! Role-partitioned identity storage.
//!
//! One table per partition (students, mentors, admins). Identifiers and
//! usernames are unique across all partitions, enforced at write time, so
//! cross-partition resolution can never be ambiguous.

use crate::auth::models::{Identity, Role};
use anyhow::{bail, Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS students (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    last_login TEXT,
    created_at TEXT NOT NULL,
    cohort_id TEXT,
    mentor_id TEXT
);

CREATE TABLE IF NOT EXISTS mentors (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    last_login TEXT,
    created_at TEXT NOT NULL,
    expertise TEXT
);

CREATE TABLE IF NOT EXISTS admins (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    last_login TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_students_username ON students(username);
CREATE INDEX IF NOT EXISTS idx_mentors_username ON mentors(username);
CREATE INDEX IF NOT EXISTS idx_admins_username ON admins(username);
CREATE INDEX IF NOT EXISTS idx_students_cohort ON students(cohort_id);
CREATE INDEX IF NOT EXISTS idx_students_mentor ON students(mentor_id);
"#;

/// Fields accepted when creating an identity.
#[derive(Debug)]
pub struct NewIdentity {
    pub role: Role,
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub cohort_id: Option<Uuid>,
    pub mentor_id: Option<Uuid>,
    pub expertise: Option<String>,
}

/// Partial update for an identity record. `None` leaves the field unchanged.
#[derive(Debug, Default)]
pub struct IdentityUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub active: Option<bool>,
    pub cohort_id: Option<Option<Uuid>>,
    pub mentor_id: Option<Option<Uuid>>,
    pub expertise: Option<Option<String>>,
}

/// Identity storage over SQLite.
pub struct IdentityStore {
    conn: Arc<Mutex<Connection>>,
}

impl IdentityStore {
    /// Open the store, initialize the schema, and seed a default admin if
    /// the admin partition is empty.
    pub fn new(db_path: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(db_path, flags)
            .with_context(|| format!("Failed to open identity database at {}", db_path))?;

        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize identity schema")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.seed_default_admin()?;

        Ok(store)
    }

    fn seed_default_admin(&self) -> Result<()> {
        let count: i64 = {
            let conn = self.conn.lock();
            conn.query_row("SELECT COUNT(*) FROM admins", [], |row| row.get(0))
                .context("Failed to check for admin identities")?
        };

        if count == 0 {
            self.create(NewIdentity {
                role: Role::Admin,
                username: "admin".to_string(),
                password: "admin123".to_string(),
                name: "Administrator".to_string(),
                email: "admin@localhost".to_string(),
                cohort_id: None,
                mentor_id: None,
                expertise: None,
            })?;

            info!("🔐 Default admin identity created (username: admin, password: admin123)");
            warn!("⚠️  CHANGE DEFAULT PASSWORD IN PRODUCTION!");
        }

        Ok(())
    }

    /// SELECT list normalized across the three partition tables.
    fn select_clause(role: Role) -> String {
        let extras = match role {
            Role::Student => "cohort_id, mentor_id, NULL AS expertise",
            Role::Mentor => "NULL AS cohort_id, NULL AS mentor_id, expertise",
            Role::Admin => "NULL AS cohort_id, NULL AS mentor_id, NULL AS expertise",
        };
        format!(
            "SELECT id, username, name, email, password_hash, active, last_login, created_at, {} FROM {}",
            extras,
            role.table()
        )
    }

    fn row_to_identity(role: Role, row: &rusqlite::Row<'_>) -> rusqlite::Result<Identity> {
        Ok(Identity {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
            role,
            username: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            password_hash: row.get(4)?,
            active: row.get::<_, i64>(5)? != 0,
            last_login: row.get(6)?,
            created_at: row.get(7)?,
            cohort_id: row
                .get::<_, Option<String>>(8)?
                .and_then(|s| Uuid::parse_str(&s).ok()),
            mentor_id: row
                .get::<_, Option<String>>(9)?
                .and_then(|s| Uuid::parse_str(&s).ok()),
            expertise: row.get(10)?,
        })
    }

    /// True when the username exists in any partition.
    fn username_taken(conn: &Connection, username: &str) -> Result<bool> {
        for role in Role::RESOLUTION_ORDER {
            let count: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {} WHERE username = ?1", role.table()),
                    params![username],
                    |row| row.get(0),
                )
                .context("Failed to check username uniqueness")?;
            if count > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True when the identifier exists in any partition.
    fn id_taken(conn: &Connection, id: &Uuid) -> Result<bool> {
        for role in Role::RESOLUTION_ORDER {
            let count: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {} WHERE id = ?1", role.table()),
                    params![id.to_string()],
                    |row| row.get(0),
                )
                .context("Failed to check id uniqueness")?;
            if count > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Create a new identity in its role partition.
    pub fn create(&self, new: NewIdentity) -> Result<Identity> {
        let password_hash = hash(&new.password, DEFAULT_COST).context("Failed to hash password")?;

        let identity = Identity {
            id: Uuid::new_v4(),
            role: new.role,
            username: new.username,
            name: new.name,
            email: new.email,
            password_hash,
            active: true,
            last_login: None,
            created_at: Utc::now().to_rfc3339(),
            cohort_id: new.cohort_id,
            mentor_id: new.mentor_id,
            expertise: new.expertise,
        };

        let conn = self.conn.lock();

        // Uniqueness is global across partitions, checked before every insert.
        if Self::username_taken(&conn, &identity.username)? {
            bail!("username already exists: {}", identity.username);
        }
        if Self::id_taken(&conn, &identity.id)? {
            bail!("identifier collision: {}", identity.id);
        }

        match new.role {
            Role::Student => {
                conn.execute(
                    "INSERT INTO students (id, username, name, email, password_hash, active, last_login, created_at, cohort_id, mentor_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, 1, NULL, ?6, ?7, ?8)",
                    params![
                        identity.id.to_string(),
                        identity.username,
                        identity.name,
                        identity.email,
                        identity.password_hash,
                        identity.created_at,
                        identity.cohort_id.map(|id| id.to_string()),
                        identity.mentor_id.map(|id| id.to_string()),
                    ],
                )
                .context("Failed to insert student")?;
            }
            Role::Mentor => {
                conn.execute(
                    "INSERT INTO mentors (id, username, name, email, password_hash, active, last_login, created_at, expertise)
                     VALUES (?1, ?2, ?3, ?4, ?5, 1, NULL, ?6, ?7)",
                    params![
                        identity.id.to_string(),
                        identity.username,
                        identity.name,
                        identity.email,
                        identity.password_hash,
                        identity.created_at,
                        identity.expertise,
                    ],
                )
                .context("Failed to insert mentor")?;
            }
            Role::Admin => {
                conn.execute(
                    "INSERT INTO admins (id, username, name, email, password_hash, active, last_login, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 1, NULL, ?6)",
                    params![
                        identity.id.to_string(),
                        identity.username,
                        identity.name,
                        identity.email,
                        identity.password_hash,
                        identity.created_at,
                    ],
                )
                .context("Failed to insert admin")?;
            }
        }

        info!(
            username = %identity.username,
            role = identity.role.as_str(),
            "Identity created"
        );

        Ok(identity)
    }

    /// Look up an identity by username within one partition.
    pub fn find_by_username(&self, role: Role, username: &str) -> Result<Option<Identity>> {
        let conn = self.conn.lock();
        let sql = format!("{} WHERE username = ?1", Self::select_clause(role));
        let result = conn.query_row(&sql, params![username], |row| {
            Self::row_to_identity(role, row)
        });

        match result {
            Ok(identity) => Ok(Some(identity)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up an identity by id within one partition.
    pub fn find_by_id(&self, role: Role, id: &Uuid) -> Result<Option<Identity>> {
        let conn = self.conn.lock();
        let sql = format!("{} WHERE id = ?1", Self::select_clause(role));
        let result = conn.query_row(&sql, params![id.to_string()], |row| {
            Self::row_to_identity(role, row)
        });

        match result {
            Ok(identity) => Ok(Some(identity)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a username across partitions in the fixed order
    /// student → mentor → admin.
    pub fn resolve_by_username(&self, username: &str) -> Result<Option<Identity>> {
        for role in Role::RESOLUTION_ORDER {
            if let Some(identity) = self.find_by_username(role, username)? {
                return Ok(Some(identity));
            }
        }
        Ok(None)
    }

    /// Resolve an identifier across partitions in the fixed order
    /// student → mentor → admin.
    pub fn resolve_by_id(&self, id: &Uuid) -> Result<Option<Identity>> {
        for role in Role::RESOLUTION_ORDER {
            if let Some(identity) = self.find_by_id(role, id)? {
                return Ok(Some(identity));
            }
        }
        Ok(None)
    }

    /// Verify credentials against one partition (`Some(role)`) or across all
    /// of them in resolution order (`None`). Returns the identity only on a
    /// correct password for an active record; every failure shape collapses
    /// to `None` so callers cannot distinguish them.
    pub fn verify_credentials(
        &self,
        scope: Option<Role>,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>> {
        let identity = match scope {
            Some(role) => self.find_by_username(role, username)?,
            None => self.resolve_by_username(username)?,
        };

        let Some(identity) = identity else {
            return Ok(None);
        };

        let valid =
            verify(password, &identity.password_hash).context("Failed to verify password")?;

        if !valid || !identity.active {
            return Ok(None);
        }

        Ok(Some(identity))
    }

    /// Record a successful login.
    pub fn touch_last_login(&self, role: Role, id: &Uuid) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            &format!("UPDATE {} SET last_login = ?1 WHERE id = ?2", role.table()),
            params![Utc::now().to_rfc3339(), id.to_string()],
        )
        .context("Failed to update last_login")?;
        Ok(())
    }

    /// List all identities in one partition.
    pub fn list(&self, role: Role) -> Result<Vec<Identity>> {
        let conn = self.conn.lock();
        let sql = format!("{} ORDER BY created_at DESC", Self::select_clause(role));
        let mut stmt = conn.prepare(&sql)?;

        let identities = stmt
            .query_map([], |row| Self::row_to_identity(role, row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(identities)
    }

    /// Count identities in one partition.
    pub fn count(&self, role: Role) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", role.table()),
                [],
                |row| row.get(0),
            )
            .context("Failed to count identities")?;
        Ok(count)
    }

    /// Apply a partial update and return the refreshed record.
    pub fn update(&self, role: Role, id: &Uuid, update: IdentityUpdate) -> Result<Option<Identity>> {
        let Some(mut identity) = self.find_by_id(role, id)? else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            identity.name = name;
        }
        if let Some(email) = update.email {
            identity.email = email;
        }
        if let Some(password) = update.password {
            identity.password_hash =
                hash(&password, DEFAULT_COST).context("Failed to hash password")?;
        }
        if let Some(active) = update.active {
            identity.active = active;
        }
        if let Some(cohort_id) = update.cohort_id {
            identity.cohort_id = cohort_id;
        }
        if let Some(mentor_id) = update.mentor_id {
            identity.mentor_id = mentor_id;
        }
        if let Some(expertise) = update.expertise {
            identity.expertise = expertise;
        }

        let conn = self.conn.lock();
        match role {
            Role::Student => {
                conn.execute(
                    "UPDATE students SET name = ?1, email = ?2, password_hash = ?3, active = ?4, cohort_id = ?5, mentor_id = ?6
                     WHERE id = ?7",
                    params![
                        identity.name,
                        identity.email,
                        identity.password_hash,
                        identity.active as i64,
                        identity.cohort_id.map(|id| id.to_string()),
                        identity.mentor_id.map(|id| id.to_string()),
                        id.to_string(),
                    ],
                )
                .context("Failed to update student")?;
            }
            Role::Mentor => {
                conn.execute(
                    "UPDATE mentors SET name = ?1, email = ?2, password_hash = ?3, active = ?4, expertise = ?5
                     WHERE id = ?6",
                    params![
                        identity.name,
                        identity.email,
                        identity.password_hash,
                        identity.active as i64,
                        identity.expertise,
                        id.to_string(),
                    ],
                )
                .context("Failed to update mentor")?;
            }
            Role::Admin => {
                conn.execute(
                    "UPDATE admins SET name = ?1, email = ?2, password_hash = ?3, active = ?4
                     WHERE id = ?5",
                    params![
                        identity.name,
                        identity.email,
                        identity.password_hash,
                        identity.active as i64,
                        id.to_string(),
                    ],
                )
                .context("Failed to update admin")?;
            }
        }

        Ok(Some(identity))
    }

    /// Delete an identity. Returns false when the record did not exist.
    pub fn delete(&self, role: Role, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();
        let rows_affected = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", role.table()),
            params![id.to_string()],
        )?;

        if rows_affected > 0 {
            info!(id = %id, role = role.as_str(), "Identity deleted");
        }

        Ok(rows_affected > 0)
    }
}
