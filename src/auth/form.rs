//! Form authentication scheme
//!
//! Credentials are posted as `j_username` / `j_password` to any path ending
//! in the authentication URI (default `j_security_check`).

use crate::error::{AuthError, ConfigError};
use std::collections::HashMap;

/// Request parameter carrying the username
pub const J_USERNAME: &str = "j_username";

/// Request parameter carrying the password
pub const J_PASSWORD: &str = "j_password";

/// Default login submission URI segment
pub const DEFAULT_AUTHENTICATION_URI: &str = "j_security_check";

/// Default login page, relative to the context path
pub const DEFAULT_LOGIN_PAGE: &str = "/login";

/// Default page for failed logins, relative to the context path
pub const DEFAULT_ERROR_PAGE: &str = "/error";

/// Default logout path, relative to the context path
pub const DEFAULT_LOGOUT_URI: &str = "/logout";

/// Settings for the form login flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormAuthenticationConfig {
    pub context_path: String,
    pub login_page: String,
    pub error_page: String,
    pub authentication_uri: String,
    pub logout_uri: String,
}

impl Default for FormAuthenticationConfig {
    fn default() -> Self {
        Self {
            context_path: String::new(),
            login_page: DEFAULT_LOGIN_PAGE.to_string(),
            error_page: DEFAULT_ERROR_PAGE.to_string(),
            authentication_uri: DEFAULT_AUTHENTICATION_URI.to_string(),
            logout_uri: DEFAULT_LOGOUT_URI.to_string(),
        }
    }
}

impl FormAuthenticationConfig {
    /// Check the settings are usable for building redirects
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.context_path.is_empty()
            && (!self.context_path.starts_with('/') || self.context_path.ends_with('/'))
        {
            return Err(ConfigError::invalid(format!(
                "context_path must be empty or start with '/' without a trailing '/', got: {}",
                self.context_path
            )));
        }

        for (field, value) in [
            ("login_page", &self.login_page),
            ("error_page", &self.error_page),
            ("logout_uri", &self.logout_uri),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::invalid(format!(
                    "{} must start with '/', got: {}",
                    field, value
                )));
            }
        }

        if self.login_page == self.error_page {
            return Err(ConfigError::invalid(format!(
                "login_page and error_page must differ, both are: {}",
                self.login_page
            )));
        }

        if self.authentication_uri.is_empty() || self.authentication_uri.contains('/') {
            return Err(ConfigError::invalid(format!(
                "authentication_uri must be a single path segment, got: {}",
                self.authentication_uri
            )));
        }

        Ok(())
    }

    /// Absolute login page URI
    pub fn login_target(&self) -> String {
        format!("{}{}", self.context_path, self.login_page)
    }

    /// Absolute error page URI
    pub fn error_target(&self) -> String {
        format!("{}{}", self.context_path, self.error_page)
    }

    /// Where to send the client after a successful login with nothing saved
    pub fn context_root(&self) -> String {
        if self.context_path.is_empty() {
            "/".to_string()
        } else {
            self.context_path.clone()
        }
    }

    /// Where to send the client after a successful login.
    ///
    /// A saved target is replayed only when it is a plain local path: one
    /// leading `/` and no `\`. Anything else goes to the context root.
    pub fn post_login_target(&self, saved: Option<&str>) -> String {
        match saved {
            Some(target) if is_local_path(target) => format!("{}{}", self.context_path, target),
            _ => self.context_root(),
        }
    }

    /// Whether a servlet path is a login submission
    pub fn is_authentication_request(&self, servlet_path: &str) -> bool {
        servlet_path
            .strip_suffix(self.authentication_uri.as_str())
            .is_some_and(|head| head.ends_with('/'))
    }

    pub fn is_logout_request(&self, servlet_path: &str) -> bool {
        servlet_path == self.logout_uri
    }
}

fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

/// Credentials extracted from a login submission
#[derive(Debug, Clone)]
pub struct FormCredentials {
    pub username: String,
    pub password: crate::util::SecretString,
}

impl FormCredentials {
    /// Pull `j_username` / `j_password` out of request parameters
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, AuthError> {
        let username = params
            .get(J_USERNAME)
            .filter(|u| !u.is_empty())
            .ok_or(AuthError::MissingCredentials(J_USERNAME))?;
        let password = params
            .get(J_PASSWORD)
            .ok_or(AuthError::MissingCredentials(J_PASSWORD))?;

        Ok(Self {
            username: username.clone(),
            password: crate::util::SecretString::new(password.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets() {
        let config = FormAuthenticationConfig::default();
        assert_eq!(config.login_target(), "/login");
        assert_eq!(config.error_target(), "/error");
        assert_eq!(config.context_root(), "/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_targets_with_context_path() {
        let config = FormAuthenticationConfig {
            context_path: "/app".to_string(),
            ..Default::default()
        };
        assert_eq!(config.login_target(), "/app/login");
        assert_eq!(config.context_root(), "/app");
    }

    #[test]
    fn test_authentication_request_detection() {
        let config = FormAuthenticationConfig::default();
        assert!(config.is_authentication_request("/formProtectedUri/j_security_check"));
        assert!(config.is_authentication_request("/j_security_check"));
        assert!(!config.is_authentication_request("/formProtectedUri/xj_security_check"));
        assert!(!config.is_authentication_request("/onlyManagerRole"));
    }

    #[test]
    fn test_post_login_target() {
        let config = FormAuthenticationConfig::default();
        assert_eq!(config.post_login_target(None), "/");
        assert_eq!(config.post_login_target(Some("/reports?q=1")), "/reports?q=1");
        assert_eq!(config.post_login_target(Some("//evil.example/steal")), "/");
        assert_eq!(config.post_login_target(Some("/\\evil.example")), "/");
        assert_eq!(config.post_login_target(Some("https://evil.example")), "/");

        let config = FormAuthenticationConfig {
            context_path: "/app".to_string(),
            ..Default::default()
        };
        assert_eq!(config.post_login_target(Some("/reports")), "/app/reports");
        assert_eq!(config.post_login_target(Some("//evil.example")), "/app");
    }

    #[test]
    fn test_invalid_settings() {
        let config = FormAuthenticationConfig {
            context_path: "app/".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = FormAuthenticationConfig {
            authentication_uri: "a/b".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = FormAuthenticationConfig {
            login_page: "login".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = FormAuthenticationConfig {
            error_page: "/login".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_from_params() {
        let mut params = HashMap::new();
        params.insert(J_USERNAME.to_string(), "picketlink".to_string());
        assert!(matches!(
            FormCredentials::from_params(&params),
            Err(AuthError::MissingCredentials(J_PASSWORD))
        ));

        params.insert(J_PASSWORD.to_string(), "picketlink".to_string());
        let creds = FormCredentials::from_params(&params).unwrap();
        assert_eq!(creds.username, "picketlink");
        assert_eq!(creds.password.expose_secret(), "picketlink");
    }
}
