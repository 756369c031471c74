//! Access control types
//!
//! Core types used by the access control system.

use crate::access_control::patterns::PathPattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// HTTP status returned when an authenticated principal lacks a required role
pub const FORBIDDEN: u16 = 403;

/// Authentication scheme required by a path rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// HTML form login posting `j_username` / `j_password`
    #[default]
    Form,
}

impl AuthScheme {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Form => "form",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A path pattern bound to authentication and authorization requirements
#[derive(Debug, Clone)]
pub struct PathRule {
    pub pattern: PathPattern,
    /// Any-of role names; empty means no role constraint
    pub required_roles: BTreeSet<String>,
    pub requires_authentication: bool,
    pub scheme: Option<AuthScheme>,
}

impl PathRule {
    /// Rule that only requires an authenticated principal
    pub fn authenticated(pattern: PathPattern) -> Self {
        Self {
            pattern,
            required_roles: BTreeSet::new(),
            requires_authentication: true,
            scheme: Some(AuthScheme::Form),
        }
    }

    /// Rule requiring `role`; implies authentication
    pub fn with_role(pattern: PathPattern, role: impl Into<String>) -> Self {
        let mut rule = Self::authenticated(pattern);
        rule.required_roles.insert(role.into());
        rule
    }

    /// Whether the rule constrains the principal's roles
    pub fn has_role_constraint(&self) -> bool {
        !self.required_roles.is_empty()
    }

    /// Whether two rules place the same requirements on a request
    pub fn same_requirements(&self, other: &PathRule) -> bool {
        self.required_roles == other.required_roles
            && self.requires_authentication == other.requires_authentication
            && self.scheme == other.scheme
    }
}

/// An identity and its role memberships
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: String,
    pub roles: BTreeSet<String>,
    pub authenticated: bool,
}

impl Principal {
    /// An authenticated principal holding `roles`
    pub fn authenticated<I, S>(id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            authenticated: true,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Whether the principal holds at least one of `roles`
    pub fn has_any_role(&self, roles: &BTreeSet<String>) -> bool {
        roles.iter().any(|r| self.roles.contains(r))
    }
}

/// Result of evaluating a request against the rule set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Forward the request unchanged
    Allow,
    /// Send the client to the login entry point
    Redirect(String),
    /// Reject with an HTTP status code
    Deny(u16),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, AccessDecision::Redirect(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AccessDecision::Deny(_))
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessDecision::Allow => write!(f, "ALLOW"),
            AccessDecision::Redirect(target) => write!(f, "REDIRECT({})", target),
            AccessDecision::Deny(status) => write!(f, "DENY({})", status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_roles() {
        let principal = Principal::authenticated("picketlink", ["Manager", "Customer"]);
        assert!(principal.authenticated);
        assert!(principal.has_role("Manager"));
        assert!(!principal.has_role("Administrator"));

        let wanted: BTreeSet<String> = ["Administrator".to_string(), "Customer".to_string()]
            .into_iter()
            .collect();
        assert!(principal.has_any_role(&wanted));
    }

    #[test]
    fn test_with_role_implies_authentication() {
        let rule = PathRule::with_role(PathPattern::parse("/admin/*").unwrap(), "Manager");
        assert!(rule.requires_authentication);
        assert!(rule.has_role_constraint());
        assert_eq!(rule.scheme, Some(AuthScheme::Form));
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(AccessDecision::Allow.to_string(), "ALLOW");
        assert_eq!(
            AccessDecision::Redirect("/login".into()).to_string(),
            "REDIRECT(/login)"
        );
        assert_eq!(AccessDecision::Deny(FORBIDDEN).to_string(), "DENY(403)");
    }
}
