//! Cross-cutting request middleware.
//!
//! - Request logging with latency tracking
//! - Login attempt guarding per client IP

pub mod attempt_guard;
pub mod logging;

pub use attempt_guard::{AttemptGuard, AttemptGuardConfig};
pub use logging::request_logging;
