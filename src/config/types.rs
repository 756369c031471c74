//! Configuration types for roleguard
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::access_control::AuthScheme;
use crate::auth::{DEFAULT_SESSION_TIMEOUT, FormAuthenticationConfig};
use crate::auth::form::{
    DEFAULT_AUTHENTICATION_URI, DEFAULT_ERROR_PAGE, DEFAULT_LOGIN_PAGE, DEFAULT_LOGOUT_URI,
};
use crate::identity::DEFAULT_REALM;
use crate::util::SecretString;
use serde::Deserialize;
use std::time::Duration;

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Path protection and form login
    pub security: SecurityConfig,

    /// Roles and users seeded into the identity store
    pub identity: IdentityConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    /// Prefix all application paths live under (empty for the root)
    pub context_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_HTTP_PORT,
            context_path: String::new(),
        }
    }
}

/// Path protection configuration
///
/// `all_paths` sets the requirement for every path; `paths` entries refine
/// it for specific patterns. The most specific matching pattern governs a
/// request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Authentication scheme required for every path
    pub all_paths: Option<AuthScheme>,

    /// Login page, relative to the context path
    pub login_page: String,

    /// Page shown after a failed login
    pub error_page: String,

    /// Final path segment of the login submission URI
    pub authentication_uri: String,

    pub logout_uri: String,

    /// Session lifetime in seconds, also sent as the cookie `Max-Age`
    pub session_timeout_secs: u64,

    /// Per-path rules
    pub paths: Vec<PathConfig>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            all_paths: None,
            login_page: DEFAULT_LOGIN_PAGE.to_string(),
            error_page: DEFAULT_ERROR_PAGE.to_string(),
            authentication_uri: DEFAULT_AUTHENTICATION_URI.to_string(),
            logout_uri: DEFAULT_LOGOUT_URI.to_string(),
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT.as_secs(),
            paths: Vec::new(),
        }
    }
}

impl SecurityConfig {
    /// Form login settings under `context_path`
    pub fn form(&self, context_path: &str) -> FormAuthenticationConfig {
        FormAuthenticationConfig {
            context_path: context_path.to_string(),
            login_page: self.login_page.clone(),
            error_page: self.error_page.clone(),
            authentication_uri: self.authentication_uri.clone(),
            logout_uri: self.logout_uri.clone(),
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

/// Requirements for one pattern or a group of patterns
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Single pattern
    pub path: Option<String>,

    /// Pattern group sharing these requirements
    pub paths: Vec<String>,

    /// Authentication scheme; implied by `roles`
    pub authenticate: Option<AuthScheme>,

    /// Any-of role names
    pub roles: Vec<String>,

    /// Let the patterns through without authentication
    pub unprotected: bool,
}

impl PathConfig {
    /// All patterns this entry declares
    pub fn patterns(&self) -> Vec<String> {
        self.path
            .iter()
            .chain(self.paths.iter())
            .cloned()
            .collect()
    }
}

/// Identity store seed data
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Partition identities are created in
    pub realm: String,

    /// Roles to create at startup
    pub roles: Vec<String>,

    pub users: Vec<UserConfig>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            realm: DEFAULT_REALM.to_string(),
            roles: Vec::new(),
            users: Vec::new(),
        }
    }
}

/// A user account seeded at startup
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub username: String,

    pub password: SecretString,

    /// Role names granted to the user; missing roles are created
    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
