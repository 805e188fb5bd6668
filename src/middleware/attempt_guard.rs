//! Login attempt guard.
//!
//! In-memory per-IP counters over a fixed window, consulted before the
//! login handlers run. Failed or successful, every attempt counts; when a
//! key exceeds the limit the request is rejected before any credential
//! check happens.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Configuration for the attempt guard.
#[derive(Clone)]
pub struct AttemptGuardConfig {
    /// Maximum attempts per window.
    pub max_attempts: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for AttemptGuardConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window: Duration::from_secs(300),
        }
    }
}

/// Attempt counters keyed by client IP.
#[derive(Clone)]
pub struct AttemptGuard {
    config: AttemptGuardConfig,
    state: Arc<Mutex<HashMap<IpAddr, AttemptEntry>>>,
}

struct AttemptEntry {
    count: u32,
    window_start: Instant,
}

/// Outcome of a guard check.
pub enum AttemptResult {
    Allowed,
    Blocked { retry_after: Duration },
}

impl AttemptGuard {
    pub fn new(config: AttemptGuardConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count this attempt and decide whether it may proceed.
    pub fn check(&self, key: IpAddr) -> AttemptResult {
        let mut state = self.state.lock();
        let now = Instant::now();

        let entry = state.entry(key).or_insert(AttemptEntry {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start) >= self.config.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;

        if entry.count > self.config.max_attempts {
            let reset_at = entry.window_start + self.config.window;
            AttemptResult::Blocked {
                retry_after: reset_at.duration_since(now),
            }
        } else {
            AttemptResult::Allowed
        }
    }

    /// Periodic cleanup of stale entries (call from a background task).
    pub fn cleanup(&self) {
        let mut state = self.state.lock();
        let now = Instant::now();
        let window = self.config.window;

        state.retain(|_, entry| now.duration_since(entry.window_start) < window * 2);
    }
}

/// Middleware guarding the login routes.
pub async fn attempt_guard_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    axum::extract::State(guard): axum::extract::State<AttemptGuard>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = addr.ip();

    match guard.check(ip) {
        AttemptResult::Allowed => next.run(request).await,
        AttemptResult::Blocked { retry_after } => {
            warn!(
                ip = %ip,
                retry_after_secs = retry_after.as_secs(),
                "Login attempts blocked"
            );

            let body = serde_json::json!({
                "message": "Too many login attempts. Please slow down.",
            });

            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_after.as_secs().to_string())],
                axum::Json(body),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_under_limit() {
        let guard = AttemptGuard::new(AttemptGuardConfig {
            max_attempts: 5,
            window: Duration::from_secs(300),
        });
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for _ in 0..5 {
            match guard.check(ip) {
                AttemptResult::Allowed => {}
                _ => panic!("Should be allowed"),
            }
        }
    }

    #[test]
    fn test_blocks_over_limit() {
        let guard = AttemptGuard::new(AttemptGuardConfig {
            max_attempts: 3,
            window: Duration::from_secs(300),
        });
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for _ in 0..3 {
            guard.check(ip);
        }

        match guard.check(ip) {
            AttemptResult::Blocked { retry_after } => {
                assert!(retry_after <= Duration::from_secs(300));
            }
            _ => panic!("Should be blocked"),
        }
    }

    #[test]
    fn test_keys_are_independent() {
        let guard = AttemptGuard::new(AttemptGuardConfig {
            max_attempts: 1,
            window: Duration::from_secs(300),
        });
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        guard.check(a);
        match guard.check(a) {
            AttemptResult::Blocked { .. } => {}
            _ => panic!("a should be blocked"),
        }
        match guard.check(b) {
            AttemptResult::Allowed => {}
            _ => panic!("b should be unaffected"),
        }
    }
}
