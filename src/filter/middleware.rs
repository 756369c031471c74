//! axum binding for the security filter
//!
//! Installed with `axum::middleware::from_fn_with_state`. The router it wraps
//! must already see paths relative to the context path (nest it under the
//! context path when one is configured).

use crate::auth::SESSION_COOKIE;
use crate::filter::{FilterAction, FilterOutcome, FilterRequest, SecurityFilter, SessionCookie};
use crate::util::cookie_value;
use axum::{
    Form,
    extract::{FromRequest, Query, Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Largest login form body the filter will read
pub const MAX_LOGIN_BODY: usize = 16 * 1024;

/// State handed to the middleware
pub type SecurityLayerState = Arc<SecurityFilter>;

type Params = HashMap<String, String>;

/// Middleware entry point
pub async fn security_filter(
    State(filter): State<SecurityLayerState>,
    request: Request,
    next: Next,
) -> Response {
    let mut filter_request = FilterRequest::new(request.uri().path());
    filter_request.query = request.uri().query().map(str::to_string);
    filter_request.params = match Query::<Params>::try_from_uri(request.uri()) {
        Ok(Query(params)) => params,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected malformed query string");
            return rejection.into_response();
        }
    };
    filter_request.session_id = request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| cookie_value(v, SESSION_COOKIE))
        .map(str::to_string);

    // Login submissions are consumed here and never reach the application
    let request = if request.method() == Method::POST
        && filter.form().is_authentication_request(&filter_request.servlet_path)
    {
        match Form::<Params>::from_request(request, &()).await {
            Ok(Form(form)) => {
                // Body parameters take precedence over the query string
                filter_request.params.extend(form);
                None
            }
            Err(rejection) => {
                warn!(error = %rejection, "Rejected login form body");
                return rejection.into_response();
            }
        }
    } else {
        Some(request)
    };

    let FilterOutcome { action, cookie } = filter.do_filter(&filter_request).await;
    let cookie_path = filter.form().context_root();

    let mut response = match (action, request) {
        (FilterAction::Proceed { principal }, Some(mut request)) => {
            if let Some(principal) = principal {
                request.extensions_mut().insert(principal);
            }
            next.run(request).await
        }
        (FilterAction::Proceed { .. }, None) => redirect(&cookie_path),
        (FilterAction::Redirect { location }, _) => redirect(&location),
        (FilterAction::Error { status, message }, _) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::FORBIDDEN),
            message,
        )
            .into_response(),
    };

    if let Some(cookie) = cookie
        && let Some(value) = set_cookie_header(&cookie, &cookie_path, filter.sessions().timeout())
    {
        response.headers_mut().append(header::SET_COOKIE, value);
    }

    response
}

/// 302 Found with `Location`
fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Invalid redirect target").into_response(),
    }
}

fn set_cookie_header(cookie: &SessionCookie, path: &str, max_age: Duration) -> Option<HeaderValue> {
    let raw = match cookie {
        SessionCookie::Set(id) => format!(
            "{}={}; Path={}; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            id,
            path,
            max_age.as_secs()
        ),
        SessionCookie::Clear => {
            format!("{}=; Path={}; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE, path)
        }
    };
    HeaderValue::from_str(&raw).ok()
}
