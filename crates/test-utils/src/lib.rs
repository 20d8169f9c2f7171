//! Vestibule test utilities.
//!
//! Helpers for integration testing: response inspection, form submission
//! bodies, log capture, a failing session store, and password hash fixtures.

use std::io;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use axum::body::Body;
use axum::http::header;
use axum::response::Response;
use http_body_util::BodyExt;
use regex::Regex;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, Error as StoreError};
use tower_sessions::{Session, SessionStore};
use tracing_subscriber::fmt::MakeWriter;

/// Read a response body into a string.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = match response.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => panic!("failed to read response body: {e}"),
    };
    String::from_utf8_lossy(&bytes).into_owned()
}

/// The `name=value` pair of the first `Set-Cookie` header, if any.
///
/// Suitable for sending straight back in a `Cookie` request header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(|pair| pair.trim().to_string())
}

#[allow(clippy::unwrap_used)]
static CSRF_INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="csrf_token"[^>]*value="([^"]*)""#).unwrap());

/// Extract the CSRF token from a rendered form.
pub fn csrf_token(html: &str) -> Option<String> {
    CSRF_INPUT
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|token| !token.is_empty())
}

/// Build an `application/x-www-form-urlencoded` body.
pub fn form_body(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencode(k), urlencode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Hash a password with cheap Argon2id parameters.
///
/// Produces a real PHC string that verifies like a production hash, just
/// faster to compute in tests.
pub fn password_hash(password: &str) -> String {
    let params = match Params::new(1024, 1, 1, None) {
        Ok(params) => params,
        Err(e) => panic!("invalid argon2 params: {e}"),
    };
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = match SaltString::from_b64("dGVzdHNhbHR0ZXN0c2FsdA") {
        Ok(salt) => salt,
        Err(e) => panic!("invalid salt: {e}"),
    };
    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => hash.to_string(),
        Err(e) => panic!("failed to hash password: {e}"),
    }
}

/// In-memory log sink for capturing tracing output.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = SharedBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Session store whose every operation fails, as if its backend were down.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreachableSessionStore;

#[async_trait::async_trait]
impl SessionStore for UnreachableSessionStore {
    async fn save(&self, _record: &Record) -> session_store::Result<()> {
        Err(StoreError::Backend("session store unreachable".to_string()))
    }

    async fn load(&self, _session_id: &Id) -> session_store::Result<Option<Record>> {
        Err(StoreError::Backend("session store unreachable".to_string()))
    }

    async fn delete(&self, _session_id: &Id) -> session_store::Result<()> {
        Err(StoreError::Backend("session store unreachable".to_string()))
    }
}

/// A session with an existing id backed by [`UnreachableSessionStore`].
///
/// The first read or write on it fails.
pub fn unreachable_session() -> Session {
    Session::new(Some(Id::default()), Arc::new(UnreachableSessionStore), None)
}

/// Assertion helpers for rendered output.
pub mod assert {
    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }
}
