//! CSRF token generation and verification.
//!
//! Each session holds one random secret. Forms carry a token of the form
//! `<secret>.<issued_at>.<signature>`, where the signature is an
//! HMAC-SHA256 over `<secret>.<issued_at>` keyed with the application
//! secret key. A token is accepted when the signature verifies, it is no
//! older than the time limit, and its secret matches the session's.

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tower_sessions::Session;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

/// Session key for storing the per-session CSRF secret.
pub const CSRF_SESSION_KEY: &str = "csrf_token";

/// Form field carrying the signed token.
pub const CSRF_FIELD_NAME: &str = "csrf_token";

/// Token validity period in seconds (1 hour).
pub const TOKEN_VALIDITY_SECS: i64 = 3600;

/// Why a submitted token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CsrfError {
    #[error("The CSRF token is missing.")]
    Missing,

    #[error("The CSRF session token is missing.")]
    SessionMissing,

    #[error("The CSRF token is invalid.")]
    Invalid,

    #[error("The CSRF token has expired.")]
    Expired,

    #[error("The CSRF tokens do not match.")]
    Mismatch,

    /// The session store failed while loading the secret.
    #[error("The CSRF session token could not be loaded.")]
    SessionUnavailable,
}

impl CsrfError {
    /// Whether the failure lies with the server rather than the submission.
    pub fn is_internal(self) -> bool {
        self == CsrfError::SessionUnavailable
    }
}

/// Issues and checks signed CSRF tokens.
#[derive(Debug, Clone)]
pub struct CsrfProtect {
    key: SecretString,
    time_limit: i64,
}

impl CsrfProtect {
    /// Create a protector signing with the given secret key.
    pub fn new(key: SecretString) -> Self {
        Self {
            key,
            time_limit: TOKEN_VALIDITY_SECS,
        }
    }

    /// Override the token lifetime.
    pub fn with_time_limit(mut self, secs: i64) -> Self {
        self.time_limit = secs;
        self
    }

    /// Generate a token for a form, creating the session secret if needed.
    pub async fn generate_token(&self, session: &Session) -> Result<String> {
        let existing: Option<String> = session
            .get(CSRF_SESSION_KEY)
            .await
            .context("failed to read CSRF secret from session")?;

        let secret = match existing {
            Some(secret) => secret,
            None => {
                let secret = new_secret();
                session
                    .insert(CSRF_SESSION_KEY, &secret)
                    .await
                    .context("failed to store CSRF secret")?;
                secret
            }
        };

        self.issue(&secret, chrono::Utc::now().timestamp())
    }

    /// Verify a submitted token against the session.
    ///
    /// Tokens stay valid for their whole lifetime so a re-rendered form can
    /// be submitted again.
    pub async fn verify_token(&self, session: &Session, submitted: &str) -> Result<(), CsrfError> {
        if submitted.is_empty() {
            return Err(CsrfError::Missing);
        }

        let secret: Option<String> = match session.get(CSRF_SESSION_KEY).await {
            Ok(secret) => secret,
            Err(e) => {
                error!(error = %e, "failed to read CSRF secret from session");
                return Err(CsrfError::SessionUnavailable);
            }
        };

        self.check(
            secret.as_deref(),
            submitted,
            chrono::Utc::now().timestamp(),
        )
    }

    /// Build a signed token for `secret` issued at `issued_at`.
    pub(crate) fn issue(&self, secret: &str, issued_at: i64) -> Result<String> {
        let payload = format!("{secret}.{issued_at}");
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Check a token against the session secret at time `now`.
    pub(crate) fn check(
        &self,
        session_secret: Option<&str>,
        submitted: &str,
        now: i64,
    ) -> Result<(), CsrfError> {
        if submitted.is_empty() {
            return Err(CsrfError::Missing);
        }

        let Some(session_secret) = session_secret else {
            return Err(CsrfError::SessionMissing);
        };

        let mut parts = submitted.splitn(3, '.');
        let (Some(secret), Some(issued_at), Some(signature)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(CsrfError::Invalid);
        };

        let Ok(signature) = hex::decode(signature) else {
            return Err(CsrfError::Invalid);
        };

        let payload = format!("{secret}.{issued_at}");
        let mac = self.mac(&payload).map_err(|_| CsrfError::Invalid)?;
        if mac.verify_slice(&signature).is_err() {
            return Err(CsrfError::Invalid);
        }

        let issued_at: i64 = issued_at.parse().map_err(|_| CsrfError::Invalid)?;
        if now - issued_at > self.time_limit {
            return Err(CsrfError::Expired);
        }

        if bool::from(secret.as_bytes().ct_eq(session_secret.as_bytes())) {
            Ok(())
        } else {
            Err(CsrfError::Mismatch)
        }
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid CSRF signing key: {e}"))?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}

fn new_secret() -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    hex::encode(random_bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_739_577_600;

    fn protect() -> CsrfProtect {
        CsrfProtect::new(SecretString::from("test-secret-key"))
    }

    #[test]
    fn test_secret_format() {
        let secret = new_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(secret, new_secret());
    }

    #[test]
    fn test_issued_token_verifies() {
        let csrf = protect();
        let token = csrf.issue("abc123", NOW).unwrap();
        assert!(token.starts_with("abc123."));
        assert_eq!(csrf.check(Some("abc123"), &token, NOW + 10), Ok(()));
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(protect().check(Some("abc"), "", NOW), Err(CsrfError::Missing));
    }

    #[test]
    fn test_missing_session_secret() {
        let csrf = protect();
        let token = csrf.issue("abc123", NOW).unwrap();
        assert_eq!(csrf.check(None, &token, NOW), Err(CsrfError::SessionMissing));
    }

    #[test]
    fn test_malformed_token() {
        let csrf = protect();
        for token in ["garbage", "a.b", "abc123.1.zz", "abc123.notanumber.00"] {
            assert_eq!(
                csrf.check(Some("abc123"), token, NOW),
                Err(CsrfError::Invalid),
                "{token:?}"
            );
        }
    }

    #[test]
    fn test_tampered_timestamp_rejected() {
        let csrf = protect();
        let token = csrf.issue("abc123", NOW).unwrap();
        let signature = token.rsplit('.').next().unwrap();
        let forged = format!("abc123.{}.{signature}", NOW + 7200);
        assert_eq!(
            csrf.check(Some("abc123"), &forged, NOW + 7200),
            Err(CsrfError::Invalid)
        );
    }

    #[test]
    fn test_token_signed_with_other_key_rejected() {
        let other = CsrfProtect::new(SecretString::from("another-key"));
        let token = other.issue("abc123", NOW).unwrap();
        assert_eq!(
            protect().check(Some("abc123"), &token, NOW),
            Err(CsrfError::Invalid)
        );
    }

    #[test]
    fn test_expired_token() {
        let csrf = protect();
        let token = csrf.issue("abc123", NOW).unwrap();
        assert_eq!(
            csrf.check(Some("abc123"), &token, NOW + TOKEN_VALIDITY_SECS),
            Ok(())
        );
        assert_eq!(
            csrf.check(Some("abc123"), &token, NOW + TOKEN_VALIDITY_SECS + 1),
            Err(CsrfError::Expired)
        );

        let short = protect().with_time_limit(5);
        assert_eq!(
            short.check(Some("abc123"), &token, NOW + 6),
            Err(CsrfError::Expired)
        );
    }

    #[test]
    fn test_token_from_other_session_rejected() {
        let csrf = protect();
        let token = csrf.issue("abc123", NOW).unwrap();
        assert_eq!(
            csrf.check(Some("def456"), &token, NOW),
            Err(CsrfError::Mismatch)
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_on_verify_and_generate() {
        let csrf = protect();
        let session = vestibule_test_utils::unreachable_session();
        let token = csrf.issue("abc123", NOW).unwrap();

        let err = csrf.verify_token(&session, &token).await.unwrap_err();
        assert_eq!(err, CsrfError::SessionUnavailable);
        assert!(err.is_internal());
        assert!(csrf.generate_token(&session).await.is_err());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(CsrfError::Missing.to_string(), "The CSRF token is missing.");
        assert_eq!(CsrfError::Mismatch.to_string(), "The CSRF tokens do not match.");
        assert!(!CsrfError::Mismatch.is_internal());
    }
}
