//! Token revocation set.
//!
//! A small in-memory denylist keyed by token id (`jti`). Logout inserts the
//! presented token's id together with its expiry; verification consults the
//! set on every request. Entries are pruned once the underlying token would
//! have expired anyway, which bounds the set's size to the 24-hour token
//! lifetime.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Default)]
pub struct RevocationList {
    // jti -> token expiry (unix seconds)
    revoked: Arc<Mutex<HashMap<String, i64>>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke a token id until its natural expiry.
    pub fn revoke(&self, jti: &str, token_exp: i64) {
        let mut revoked = self.revoked.lock();
        revoked.insert(jti.to_string(), token_exp);
        debug!(jti = %jti, "Token revoked");
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.lock().contains_key(jti)
    }

    /// Drop entries whose tokens have expired on their own
    /// (call from a background task).
    pub fn prune(&self, now: i64) {
        let mut revoked = self.revoked.lock();
        revoked.retain(|_, exp| *exp > now);
    }

    pub fn len(&self) -> usize {
        self.revoked.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.lock().is_empty()
    }
}
