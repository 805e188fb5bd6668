//! Token issuance and validation.

use crate::auth::models::{Claims, Identity};
use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;
use uuid::Uuid;

/// Why a token failed validation. Expiry and tampering map to different
/// taxonomy entries downstream, so the distinction is kept here.
#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
}

/// Issues and validates signed bearer tokens.
pub struct TokenService {
    secret: String,
    expiration_hours: i64,
}

impl TokenService {
    pub fn new(secret: String, expiration_hours: i64) -> Self {
        Self {
            secret,
            expiration_hours,
        }
    }

    /// Issue a token for an identity. Returns the token and its lifetime in
    /// seconds. Every token gets a fresh `jti` so it can be revoked early.
    pub fn issue(&self, identity: &Identity) -> Result<(String, usize)> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(chrono::Duration::hours(self.expiration_hours))
            .context("Invalid timestamp")?
            .timestamp() as usize;

        let expires_in = (self.expiration_hours * 3600) as usize;

        let claims = Claims {
            sub: identity.id.to_string(),
            username: identity.username.clone(),
            role: identity.role,
            jti: Uuid::new_v4().to_string(),
            exp: expiration,
        };

        debug!(
            username = %identity.username,
            role = identity.role.as_str(),
            expires_in_hours = self.expiration_hours,
            "Issuing token"
        );

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign token")?;

        Ok((token, expires_in))
    }

    /// Validate signature and expiry, returning the embedded claims.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })?;

        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;

    fn create_test_identity(role: Role) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            role,
            username: "testuser".to_string(),
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "hash".to_string(),
            active: true,
            last_login: None,
            created_at: Utc::now().to_rfc3339(),
            cohort_id: None,
            mentor_id: None,
            expertise: None,
        }
    }

    #[test]
    fn test_issue_and_validate_round_trip() {
        let service = TokenService::new("test-secret-key-12345".to_string(), 24);

        // Round-trip must hold for identities in every partition
        for role in Role::RESOLUTION_ORDER {
            let identity = create_test_identity(role);
            let (token, expires_in) = service.issue(&identity).unwrap();
            assert!(!token.is_empty());
            assert_eq!(expires_in, 24 * 3600);

            let claims = service.validate(&token).unwrap();
            assert_eq!(claims.sub, identity.id.to_string());
            assert_eq!(claims.username, identity.username);
            assert_eq!(claims.role, role);
            assert!(!claims.jti.is_empty());
        }
    }

    #[test]
    fn test_garbage_token_rejected_as_invalid() {
        let service = TokenService::new("test-secret-key-12345".to_string(), 24);

        let result = service.validate("not.a.token");
        assert_eq!(result.unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_tampered_signature_rejected_as_invalid() {
        let service1 = TokenService::new("secret1".to_string(), 24);
        let service2 = TokenService::new("secret2".to_string(), 24);
        let identity = create_test_identity(Role::Student);

        let (token, _) = service1.issue(&identity).unwrap();

        let result = service2.validate(&token);
        assert_eq!(result.unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_expired_token_rejected_as_expired() {
        let service = TokenService::new("test-secret-key-12345".to_string(), 24);
        let identity = create_test_identity(Role::Mentor);

        // Hand-roll claims already past expiry (beyond the default leeway),
        // signed with the right secret so only the expiry can fail.
        let claims = Claims {
            sub: identity.id.to_string(),
            username: identity.username.clone(),
            role: identity.role,
            jti: Uuid::new_v4().to_string(),
            exp: (Utc::now().timestamp() - 3600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test-secret-key-12345".as_bytes()),
        )
        .unwrap();

        let result = service.validate(&token);
        assert_eq!(result.unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_each_token_gets_distinct_jti() {
        let service = TokenService::new("test-secret-key-12345".to_string(), 24);
        let identity = create_test_identity(Role::Student);

        let (t1, _) = service.issue(&identity).unwrap();
        let (t2, _) = service.issue(&identity).unwrap();

        let c1 = service.validate(&t1).unwrap();
        let c2 = service.validate(&t2).unwrap();
        assert_ne!(c1.jti, c2.jti);
    }
}
