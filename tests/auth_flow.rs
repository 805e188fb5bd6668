//! End-to-end auth pipeline tests against the full router.

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use mentorhub_backend::api::{build_router, AppState};
use mentorhub_backend::auth::models::{Claims, Role};
use mentorhub_backend::auth::store::NewIdentity;
use mentorhub_backend::auth::{AuthState, IdentityStore, TokenService};
use mentorhub_backend::db::PortalDb;
use mentorhub_backend::middleware::{AttemptGuard, AttemptGuardConfig};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-secret";

struct Harness {
    app: Router,
    identities: Arc<IdentityStore>,
    _temp: NamedTempFile,
}

fn harness_with_attempts(max_attempts: u32) -> Harness {
    let temp = NamedTempFile::new().unwrap();
    let path = temp.path().to_str().unwrap();

    let identities = Arc::new(IdentityStore::new(path).unwrap());
    let db = Arc::new(PortalDb::new(path).unwrap());
    let tokens = Arc::new(TokenService::new(SECRET.to_string(), 24));
    let auth_state = AuthState::new(identities.clone(), tokens);
    let guard = AttemptGuard::new(AttemptGuardConfig {
        max_attempts,
        window: Duration::from_secs(300),
    });

    let app = build_router(
        AppState {
            db,
            identities: identities.clone(),
        },
        auth_state,
        guard,
    )
    .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9999))));

    Harness {
        app,
        identities,
        _temp: temp,
    }
}

fn harness() -> Harness {
    harness_with_attempts(100)
}

fn seed_student(harness: &Harness, username: &str, password: &str) -> Uuid {
    harness
        .identities
        .create(NewIdentity {
            role: Role::Student,
            username: username.to_string(),
            password: password.to_string(),
            name: username.to_string(),
            email: format!("{}@example.com", username),
            cohort_id: None,
            mentor_id: None,
            expertise: None,
        })
        .unwrap()
        .id
}

fn seed_mentor(harness: &Harness, username: &str, password: &str) -> Uuid {
    harness
        .identities
        .create(NewIdentity {
            role: Role::Mentor,
            username: username.to_string(),
            password: password.to_string(),
            name: username.to_string(),
            email: format!("{}@example.com", username),
            cohort_id: None,
            mentor_id: None,
            expertise: Some("systems".to_string()),
        })
        .unwrap()
        .id
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await
}

// ===== Scenario A: credential checks =====

#[tokio::test]
async fn login_returns_token_with_matching_identifier() {
    let h = harness();
    let alice = seed_student(&h, "alice", "correct-horse");

    let (status, body) = login(&h.app, "alice", "correct-horse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["id"], json!(alice.to_string()));
    assert_eq!(body["user"]["role"], json!("student"));
    assert!(body["token"].as_str().unwrap().len() > 20);
}

#[tokio::test]
async fn login_failures_do_not_reveal_which_part_was_wrong() {
    let h = harness();
    seed_student(&h, "alice", "correct-horse");

    let (wrong_status, wrong_body) = login(&h.app, "alice", "wrong").await;
    let (unknown_status, unknown_body) = login(&h.app, "mallory", "correct-horse").await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    // Identical bodies: no username-existence oracle
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn login_with_missing_fields_is_a_validation_error() {
    let h = harness();

    let (status, body) = send(
        &h.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "alice" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

// ===== Round trip across partitions =====

#[tokio::test]
async fn issued_tokens_verify_for_every_partition() {
    let h = harness();
    seed_student(&h, "alice", "student-pass");
    seed_mentor(&h, "bob", "mentor-pass");
    // The admin partition is seeded with a default admin

    for (username, password, role) in [
        ("alice", "student-pass", "student"),
        ("bob", "mentor-pass", "mentor"),
        ("admin", "admin123", "admin"),
    ] {
        let (status, body) = login(&h.app, username, password).await;
        assert_eq!(status, StatusCode::OK, "login failed for {}", username);
        let token = body["token"].as_str().unwrap();

        let (me_status, me_body) =
            send(&h.app, "GET", "/api/auth/me", Some(token), None).await;
        assert_eq!(me_status, StatusCode::OK);
        assert_eq!(me_body["username"], json!(username));
        assert_eq!(me_body["role"], json!(role));
    }
}

#[tokio::test]
async fn repeated_verification_resolves_the_same_identity() {
    let h = harness();
    let alice = seed_student(&h, "alice", "correct-horse");

    let (_, body) = login(&h.app, "alice", "correct-horse").await;
    let token = body["token"].as_str().unwrap().to_string();

    for _ in 0..3 {
        let (status, me) = send(&h.app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], json!(alice.to_string()));
    }
}

// ===== Scenario B: role gates =====

#[tokio::test]
async fn student_token_is_forbidden_on_admin_routes() {
    let h = harness();
    seed_student(&h, "alice", "correct-horse");

    let (_, body) = login(&h.app, "alice", "correct-horse").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &h.app,
        "POST",
        "/api/students",
        Some(&token),
        Some(json!({
            "username": "eve",
            "password": "longenough",
            "name": "Eve",
            "email": "eve@example.com"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn student_token_is_forbidden_on_mentor_routes() {
    let h = harness();
    seed_student(&h, "alice", "correct-horse");

    let (_, body) = login(&h.app, "alice", "correct-horse").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(&h.app, "GET", "/api/students", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&h.app, "GET", "/api/dashboard/summary", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn mentor_token_passes_the_mentor_gate() {
    let h = harness();
    seed_mentor(&h, "bob", "mentor-pass");

    let (_, body) = login(&h.app, "bob", "mentor-pass").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(&h.app, "GET", "/api/students", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

// ===== Scenarios C and D: token presence and shape =====

#[tokio::test]
async fn garbage_token_is_forbidden() {
    let h = harness();

    let (status, body) = send(&h.app, "GET", "/api/tasks", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("Invalid token"));
}

#[tokio::test]
async fn missing_header_is_unauthenticated() {
    let h = harness();

    let (status, body) = send(&h.app, "GET", "/api/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!("Authentication required"));
}

#[tokio::test]
async fn expired_token_is_rejected_regardless_of_signature() {
    let h = harness();
    let alice = seed_student(&h, "alice", "correct-horse");

    // Correctly signed, already expired
    let claims = Claims {
        sub: alice.to_string(),
        username: "alice".to_string(),
        role: Role::Student,
        jti: Uuid::new_v4().to_string(),
        exp: (chrono::Utc::now().timestamp() - 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let (status, body) = send(&h.app, "GET", "/api/tasks", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("Token expired"));
}

// ===== Scenario E: deleted identity =====

#[tokio::test]
async fn token_for_deleted_identity_is_not_found() {
    let h = harness();
    let alice = seed_student(&h, "alice", "correct-horse");

    let (_, body) = login(&h.app, "alice", "correct-horse").await;
    let token = body["token"].as_str().unwrap().to_string();

    h.identities.delete(Role::Student, &alice).unwrap();

    let (status, body) = send(&h.app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Identity not found"));
}

// ===== Verify endpoint =====

#[tokio::test]
async fn verify_accepts_valid_tokens_and_rejects_garbage() {
    let h = harness();
    seed_student(&h, "alice", "correct-horse");

    let (_, body) = login(&h.app, "alice", "correct-horse").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &h.app,
        "POST",
        "/api/auth/verify",
        None,
        Some(json!({ "token": token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(true));
    assert_eq!(body["user"]["username"], json!("alice"));

    let (status, _) = send(
        &h.app,
        "POST",
        "/api/auth/verify",
        None,
        Some(json!({ "token": "garbage" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ===== Revocation =====

#[tokio::test]
async fn logout_revokes_the_token_immediately() {
    let h = harness();
    seed_student(&h, "alice", "correct-horse");

    let (_, body) = login(&h.app, "alice", "correct-horse").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(&h.app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&h.app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("Token revoked"));

    // The verify endpoint refuses it too
    let (status, _) = send(
        &h.app,
        "POST",
        "/api/auth/verify",
        None,
        Some(json!({ "token": token })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ===== Attempt guard =====

#[tokio::test]
async fn attempt_guard_blocks_after_the_limit() {
    let h = harness_with_attempts(3);
    seed_student(&h, "alice", "correct-horse");

    for _ in 0..3 {
        let (status, _) = login(&h.app, "alice", "wrong").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = login(&h.app, "alice", "correct-horse").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["message"].is_string());
}

// ===== Portal flow =====

#[tokio::test]
async fn admin_onboards_and_portal_flow_works() {
    let h = harness();
    seed_mentor(&h, "bob", "mentor-pass");

    let (_, body) = login(&h.app, "admin", "admin123").await;
    let admin_token = body["token"].as_str().unwrap().to_string();

    // Admin creates a student
    let (status, student) = send(
        &h.app,
        "POST",
        "/api/students",
        Some(&admin_token),
        Some(json!({
            "username": "carol",
            "password": "longenough",
            "name": "Carol",
            "email": "carol@example.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let carol_id = student["id"].as_str().unwrap().to_string();
    assert!(student.get("password_hash").is_none());

    // Duplicate username is a conflict, even in another partition
    let (status, _) = send(
        &h.app,
        "POST",
        "/api/mentors",
        Some(&admin_token),
        Some(json!({
            "username": "carol",
            "password": "longenough",
            "name": "Carol Again",
            "email": "carol2@example.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Mentor assigns work
    let (_, body) = login(&h.app, "bob", "mentor-pass").await;
    let mentor_token = body["token"].as_str().unwrap().to_string();
    let bob_id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &h.app,
        "POST",
        "/api/assignments",
        Some(&mentor_token),
        Some(json!({
            "title": "Build a CLI",
            "description": "Small argument parser",
            "mentor_id": bob_id,
            "student_id": carol_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Student manages her own tasks but not someone else's
    let (_, body) = login(&h.app, "carol", "longenough").await;
    let carol_token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &h.app,
        "POST",
        "/api/tasks",
        Some(&carol_token),
        Some(json!({ "student_id": carol_id, "title": "read the book" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &h.app,
        "POST",
        "/api/tasks",
        Some(&carol_token),
        Some(json!({ "student_id": Uuid::new_v4().to_string(), "title": "sabotage" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Student raises a help request; the mentor claims it
    let (status, request) = send(
        &h.app,
        "POST",
        "/api/help-requests",
        Some(&carol_token),
        Some(json!({ "subject": "lifetimes", "body": "confused by 'static" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = request["id"].as_str().unwrap().to_string();

    let (status, claimed) = send(
        &h.app,
        "PUT",
        &format!("/api/help-requests/{}", request_id),
        Some(&mentor_token),
        Some(json!({ "status": "claimed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claimed["mentor_id"], json!(bob_id));

    // Dashboard reflects all of it
    let (status, summary) = send(
        &h.app,
        "GET",
        "/api/dashboard/summary",
        Some(&mentor_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["students"], json!(1));
    assert_eq!(summary["mentors"], json!(1));
    assert_eq!(summary["assignments_assigned"], json!(1));
    assert_eq!(summary["open_help_requests"], json!(0));

    let (status, rollup) = send(
        &h.app,
        "GET",
        &format!("/api/dashboard/students/{}", carol_id),
        Some(&carol_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rollup["tasks_todo"], json!(1));
    assert_eq!(rollup["assignments"], json!(1));
}
