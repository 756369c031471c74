//! HTTP application
//!
//! Wires the security filter in front of a small set of pages: the login
//! form, the login error page, a principal echo and a role listing. Any other
//! path falls through to a resource handler that reports who reached it.

pub mod http;

pub use http::{HttpConfig, run_http, run_http_blocking};

use crate::access_control::{Principal, SecurityConfigurationBuilder, SharedPolicy};
use crate::auth::{SessionStore, create_authenticator};
use crate::config::AppConfig;
use crate::error::Result;
use crate::filter::{MAX_LOGIN_BODY, SecurityFilter, security_filter};
use crate::identity::{IdentityStore, Role, create_identity_store};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub filter: Arc<SecurityFilter>,
    pub identity: Arc<dyn IdentityStore>,
}

impl AppState {
    /// Build the filter, identity store and sessions from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let security = SecurityConfigurationBuilder::from_config(config).build()?;
        let identity: Arc<dyn IdentityStore> = Arc::new(create_identity_store(&config.identity)?);

        let filter = SecurityFilter::new(
            SharedPolicy::new(security.evaluator),
            security.form,
            Arc::new(SessionStore::with_timeout(config.security.session_timeout())),
            create_authenticator(Arc::clone(&identity)),
        );

        Ok(Self {
            filter: Arc::new(filter),
            identity,
        })
    }
}

/// Build the router, nested under the context path when one is set
pub fn build_router(state: AppState) -> Router {
    let form = state.filter.form().clone();

    let app = Router::new()
        .route(&form.login_page, get(login_page))
        .route(&form.error_page, get(error_page))
        .route("/whoami", get(whoami))
        .route("/roles", get(list_roles))
        .fallback(resource)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.filter),
            security_filter,
        ))
        .layer(DefaultBodyLimit::max(MAX_LOGIN_BODY));

    let app = if form.context_path.is_empty() {
        app
    } else {
        Router::new().nest(&form.context_path, app)
    };

    app.layer(TraceLayer::new_for_http())
}

fn principal_of(request: &Request) -> Option<Principal> {
    request.extensions().get::<Principal>().cloned()
}

async fn login_page(State(state): State<AppState>) -> Html<String> {
    let form = state.filter.form();
    let action = format!("{}/{}", form.context_path, form.authentication_uri);
    Html(LOGIN_HTML.replace("{action}", &action))
}

async fn error_page(State(state): State<AppState>) -> impl IntoResponse {
    let login = state.filter.form().login_target();
    (
        StatusCode::UNAUTHORIZED,
        Html(ERROR_HTML.replace("{login}", &login)),
    )
}

#[derive(Serialize)]
struct WhoAmI {
    authenticated: bool,
    principal: Option<Principal>,
}

async fn whoami(request: Request) -> Json<WhoAmI> {
    let principal = principal_of(&request);
    Json(WhoAmI {
        authenticated: principal.is_some(),
        principal,
    })
}

async fn list_roles(State(state): State<AppState>) -> Json<Vec<Role>> {
    Json(state.identity.list_roles())
}

async fn resource(request: Request) -> impl IntoResponse {
    let path = request.uri().path().to_string();
    match principal_of(&request) {
        Some(principal) => format!("{} reached {}", principal.id, path),
        None => format!("anonymous reached {}", path),
    }
}

const LOGIN_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign in</title></head>
<body>
<form method="post" action="{action}">
  <label>Username <input type="text" name="j_username" autofocus></label>
  <label>Password <input type="password" name="j_password"></label>
  <button type="submit">Sign in</button>
</form>
</body>
</html>
"#;

const ERROR_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign in failed</title></head>
<body>
<p>Invalid username or password. <a href="{login}">Try again</a>.</p>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathConfig;
    use crate::error::{AppError, ConfigError};

    fn rule(path: &str, role: &str) -> PathConfig {
        PathConfig {
            path: Some(path.to_string()),
            roles: vec![role.to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_from_config_rejects_ambiguous_rules() {
        let mut config = AppConfig::default();
        config.security.paths = vec![rule("/a/*/c", "Manager"), rule("/*/b/c", "Customer")];

        let result = AppState::from_config(&config);
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::ConflictingRule { .. }))
        ));
    }

    #[test]
    fn test_from_config_uses_session_timeout() {
        let mut config = AppConfig::default();
        config.security.session_timeout_secs = 60;

        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.filter.sessions().timeout().as_secs(), 60);
    }
}
