//! Identity and authentication data structures.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One person's identity record, stored in a role-partitioned table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
    /// Cohort membership, student partition only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cohort_id: Option<Uuid>,
    /// Assigned mentor, student partition only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentor_id: Option<Uuid>,
    /// Mentor partition only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expertise: Option<String>,
}

/// Identity partitions. Also the role vocabulary for route gating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "student")]
    Student,
    #[serde(rename = "mentor")]
    Mentor,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    /// Partition order used by the general login and the identity resolver.
    /// Usernames and ids are globally unique across partitions, so the order
    /// only makes resolution deterministic.
    pub const RESOLUTION_ORDER: [Role; 3] = [Role::Student, Role::Mentor, Role::Admin];

    pub fn as_str(&self) -> &str {
        match self {
            Role::Student => "student",
            Role::Mentor => "mentor",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "student" => Some(Role::Student),
            "mentor" => Some(Role::Mentor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Table backing this partition.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Role::Student => "students",
            Role::Mentor => "mentors",
            Role::Admin => "admins",
        }
    }
}

/// JWT claims payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject (identity id)
    pub username: String,
    pub role: Role,
    pub jti: String, // token id, keys the revocation set
    pub exp: usize,  // expiration timestamp
}

/// Login request body. Fields default to empty so absent keys surface as a
/// validation failure instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_in: usize, // seconds until expiration
    pub user: IdentityResponse,
}

/// Token verification request body.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// Token verification response.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: IdentityResponse,
}

/// Identity view safe to return to clients (no credential field).
#[derive(Debug, Clone, Serialize)]
pub struct IdentityResponse {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub name: String,
}

impl IdentityResponse {
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            id: identity.id.to_string(),
            username: identity.username.clone(),
            role: identity.role,
            name: identity.name.clone(),
        }
    }
}

/// Per-request identity context attached by the resolver middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
    pub identity: Identity,
}
