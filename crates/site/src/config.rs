//! Configuration loaded from environment variables.
//!
//! The secret key is the only mandatory setting. Without it no form can be
//! signed, so loading fails and the server never binds a listener.

use std::env;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

use argon2::PasswordHash;
use secrecy::SecretString;
use thiserror::Error;
use tower_sessions::cookie::SameSite;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default file the non-debug log sink appends to.
pub const DEFAULT_LOG_FILE: &str = "error.log";

/// Errors raised while building a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SECRET_KEY not set in environment variables")]
    MissingSecretKey,

    #[error("{name} must be a valid {expected}: {value:?}")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("ADMIN_PASSWORD_HASH is not a valid password hash string")]
    InvalidPasswordHash,
}

/// Application configuration.
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct Config {
    /// Key used to sign CSRF tokens.
    pub secret_key: SecretString,

    /// Debug mode disables the file log sink.
    pub debug: bool,

    /// Pre-hashed admin password in PHC format (`$argon2id$...`).
    pub admin_password_hash: Option<SecretString>,

    /// Interface to bind (default: 127.0.0.1).
    pub host: IpAddr,

    /// HTTP server port (default: 5000).
    pub port: u16,

    /// Path to the Tera templates directory (default: ./templates).
    pub template_dir: PathBuf,

    /// Path to static assets (default: ./static).
    pub static_dir: PathBuf,

    /// Path of the append-only log file (default: error.log).
    pub log_file: PathBuf,

    /// Cookie SameSite policy for the session cookie.
    pub cookie_same_site: SameSite,

    /// Whether the session cookie is marked `Secure`.
    pub session_cookie_secure: bool,
}

impl Config {
    /// Base configuration with debug disabled.
    pub fn new(secret_key: impl Into<String>) -> Result<Self, ConfigError> {
        let secret_key = secret_key.into();
        if secret_key.trim().is_empty() {
            return Err(ConfigError::MissingSecretKey);
        }

        Ok(Self {
            secret_key: SecretString::from(secret_key),
            debug: false,
            admin_password_hash: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: DEFAULT_PORT,
            template_dir: PathBuf::from("./templates"),
            static_dir: PathBuf::from("./static"),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            cookie_same_site: SameSite::Strict,
            session_cookie_secure: false,
        })
    }

    /// Development preset: same as [`Config::new`] with debug enabled.
    pub fn development(secret_key: impl Into<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new(secret_key)?;
        config.debug = true;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(lookup("SECRET_KEY").unwrap_or_default())?;

        config.debug = lookup("FLASK_DEBUG").is_some_and(|v| is_true(&v));

        config.admin_password_hash = match lookup("ADMIN_PASSWORD_HASH") {
            Some(hash) if !hash.trim().is_empty() => {
                let hash = hash.trim().to_string();
                PasswordHash::new(&hash).map_err(|_| ConfigError::InvalidPasswordHash)?;
                Some(SecretString::from(hash))
            }
            _ => None,
        };

        if let Some(host) = lookup("HOST") {
            config.host = host.parse().map_err(|_| ConfigError::InvalidValue {
                name: "HOST",
                expected: "IP address",
                value: host,
            })?;
        }

        if let Some(port) = lookup("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                expected: "u16",
                value: port,
            })?;
        }

        if let Some(dir) = lookup("TEMPLATE_DIR") {
            config.template_dir = PathBuf::from(dir);
        }

        if let Some(dir) = lookup("STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }

        if let Some(path) = lookup("LOG_FILE") {
            config.log_file = PathBuf::from(path);
        }

        if let Some(policy) = lookup("COOKIE_SAME_SITE") {
            config.cookie_same_site = parse_same_site(&policy)?;
        }

        config.session_cookie_secure = lookup("SESSION_COOKIE_SECURE").is_some_and(|v| is_true(&v));

        Ok(config)
    }

    /// Set the admin password hash, validating its format.
    pub fn with_admin_password_hash(mut self, hash: impl Into<String>) -> Result<Self, ConfigError> {
        let hash = hash.into();
        PasswordHash::new(&hash).map_err(|_| ConfigError::InvalidPasswordHash)?;
        self.admin_password_hash = Some(SecretString::from(hash));
        Ok(self)
    }

    /// Set the templates directory.
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    /// Set the static assets directory.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("secret_key", &"***")
            .field("debug", &self.debug)
            .field(
                "admin_password_hash",
                &self.admin_password_hash.as_ref().map(|_| "***"),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .field("template_dir", &self.template_dir)
            .field("static_dir", &self.static_dir)
            .field("log_file", &self.log_file)
            .field("cookie_same_site", &self.cookie_same_site)
            .field("session_cookie_secure", &self.session_cookie_secure)
            .finish()
    }
}

fn is_true(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_same_site(value: &str) -> Result<SameSite, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "strict" => Ok(SameSite::Strict),
        "lax" => Ok(SameSite::Lax),
        "none" => Ok(SameSite::None),
        _ => Err(ConfigError::InvalidValue {
            name: "COOKIE_SAME_SITE",
            expected: "SameSite policy (strict, lax, none)",
            value: value.to_string(),
        }),
    }
}
