//! Security filter
//!
//! The per-request boundary between HTTP and the access policy. A request is
//! reduced to plain data ([`FilterRequest`]); the filter answers with a
//! [`FilterOutcome`] the HTTP layer turns into a redirect, an error response,
//! or a call to the next handler.
//!
//! Order of checks:
//! 1. Login submission (`.../j_security_check`): authenticate, never forwarded
//! 2. Logout path: drop the session, redirect to the context root
//! 3. Everything else: look up the session principal and evaluate the policy

pub mod middleware;

pub use middleware::{MAX_LOGIN_BODY, SecurityLayerState, security_filter};

use crate::access_control::{AccessDecision, Principal, SharedPolicy};
use crate::auth::{FormAuthenticationConfig, FormCredentials, SessionStore, SharedAuthenticator};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Request data the filter needs
#[derive(Debug, Clone, Default)]
pub struct FilterRequest {
    /// Path below the context path, without query string
    pub servlet_path: String,
    pub query: Option<String>,
    /// Query and form parameters
    pub params: HashMap<String, String>,
    pub session_id: Option<String>,
}

impl FilterRequest {
    pub fn new(servlet_path: impl Into<String>) -> Self {
        Self {
            servlet_path: servlet_path.into(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Path plus query string, as saved for the post-login redirect
    fn request_target(&self) -> String {
        match &self.query {
            Some(q) if !q.is_empty() => format!("{}?{}", self.servlet_path, q),
            _ => self.servlet_path.clone(),
        }
    }
}

/// What the HTTP layer should do with the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    /// Forward to the next handler
    Proceed { principal: Option<Principal> },
    /// Send a redirect; the next handler is not invoked
    Redirect { location: String },
    /// Send an error status; the next handler is not invoked
    Error { status: u16, message: String },
}

/// Session cookie change to send with the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCookie {
    Set(String),
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub action: FilterAction,
    pub cookie: Option<SessionCookie>,
}

impl FilterOutcome {
    fn new(action: FilterAction) -> Self {
        Self {
            action,
            cookie: None,
        }
    }

    fn with_cookie(mut self, cookie: SessionCookie) -> Self {
        self.cookie = Some(cookie);
        self
    }

    pub fn proceeds(&self) -> bool {
        matches!(self.action, FilterAction::Proceed { .. })
    }

    pub fn redirect_location(&self) -> Option<&str> {
        match &self.action {
            FilterAction::Redirect { location } => Some(location),
            _ => None,
        }
    }

    pub fn error_status(&self) -> Option<u16> {
        match &self.action {
            FilterAction::Error { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Session id set by this response, if any
    pub fn session_id(&self) -> Option<&str> {
        match &self.cookie {
            Some(SessionCookie::Set(id)) => Some(id),
            _ => None,
        }
    }
}

/// Role-based security filter with form login
pub struct SecurityFilter {
    policy: SharedPolicy,
    form: FormAuthenticationConfig,
    sessions: Arc<SessionStore>,
    authenticator: SharedAuthenticator,
}

impl SecurityFilter {
    pub fn new(
        policy: SharedPolicy,
        form: FormAuthenticationConfig,
        sessions: Arc<SessionStore>,
        authenticator: SharedAuthenticator,
    ) -> Self {
        info!(
            authenticator = authenticator.name(),
            login = %form.login_target(),
            "Security filter ready"
        );
        Self {
            policy,
            form,
            sessions,
            authenticator,
        }
    }

    pub fn policy(&self) -> &SharedPolicy {
        &self.policy
    }

    pub fn form(&self) -> &FormAuthenticationConfig {
        &self.form
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Decide what happens to a request
    pub async fn do_filter(&self, request: &FilterRequest) -> FilterOutcome {
        let path = request.servlet_path.as_str();

        if self.form.is_authentication_request(path) {
            return self.authenticate(request).await;
        }

        if self.form.is_logout_request(path) {
            if let Some(id) = &request.session_id
                && self.sessions.logout(id)
            {
                info!("Session logged out");
            }
            return FilterOutcome::new(FilterAction::Redirect {
                location: self.form.context_root(),
            })
            .with_cookie(SessionCookie::Clear);
        }

        let principal = request
            .session_id
            .as_deref()
            .and_then(|id| self.sessions.principal(id));

        match self.policy.evaluate(path, principal.as_ref()) {
            AccessDecision::Allow => FilterOutcome::new(FilterAction::Proceed { principal }),
            AccessDecision::Redirect(location) => {
                let session_id = self
                    .sessions
                    .save_request(request.session_id.as_deref(), &request.request_target());
                debug!(path, %location, "Redirecting to login");
                FilterOutcome::new(FilterAction::Redirect { location })
                    .with_cookie(SessionCookie::Set(session_id))
            }
            AccessDecision::Deny(status) => {
                let who = principal.as_ref().map(|p| p.id.as_str()).unwrap_or("anonymous");
                warn!(path, principal = who, status, "Access denied");
                FilterOutcome::new(FilterAction::Error {
                    status,
                    message: format!("Access denied to '{}' for '{}'", path, who),
                })
            }
        }
    }

    async fn authenticate(&self, request: &FilterRequest) -> FilterOutcome {
        let failure = || {
            FilterOutcome::new(FilterAction::Redirect {
                location: self.form.error_target(),
            })
        };

        let credentials = match FormCredentials::from_params(&request.params) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "Rejected login submission");
                return failure();
            }
        };

        match self
            .authenticator
            .authenticate(&credentials.username, credentials.password.expose_secret())
            .await
        {
            Ok(principal) => {
                let (session_id, saved) =
                    self.sessions.login(request.session_id.as_deref(), principal);
                let location = self.form.post_login_target(saved.as_deref());

                info!(user = %credentials.username, %location, "Login succeeded");
                FilterOutcome::new(FilterAction::Redirect { location })
                    .with_cookie(SessionCookie::Set(session_id))
            }
            Err(e) => {
                warn!(user = %credentials.username, error = %e, "Login failed");
                failure()
            }
        }
    }
}
