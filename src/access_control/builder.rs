//! Fluent security configuration builder
//!
//! Declares path protection in the same shape it is read:
//!
//! ```
//! use roleguard::access_control::SecurityConfigurationBuilder;
//!
//! let security = SecurityConfigurationBuilder::new()
//!     .http()
//!     .all_paths()
//!     .authenticate_with()
//!     .form()
//!     .for_path("/onlyManagerRole")
//!     .authorize_with()
//!     .role("Manager")
//!     .for_path("/onlyCustomerRole")
//!     .authorize_with()
//!     .role("Customer")
//!     .build()
//!     .unwrap();
//!
//! assert!(security.evaluator.evaluate("/onlyManagerRole", None).is_redirect());
//! ```
//!
//! Patterns are parsed and checked for conflicts in [`HttpSecurityBuilder::build`],
//! so a bad declaration fails at startup rather than on a request.

use crate::access_control::evaluator::AccessPolicyEvaluator;
use crate::access_control::patterns::PathPattern;
use crate::access_control::types::{AuthScheme, PathRule};
use crate::auth::form::FormAuthenticationConfig;
use crate::config::AppConfig;
use crate::error::ConfigError;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Flattened, validated HTTP security configuration
#[derive(Debug)]
pub struct HttpSecurityConfiguration {
    pub evaluator: AccessPolicyEvaluator,
    pub form: FormAuthenticationConfig,
}

/// Entry point of the fluent API
#[derive(Debug, Default)]
pub struct SecurityConfigurationBuilder {
    form: FormAuthenticationConfig,
}

impl SecurityConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom form login settings
    pub fn with_form(mut self, form: FormAuthenticationConfig) -> Self {
        self.form = form;
        self
    }

    /// Start declaring HTTP path protection
    pub fn http(self) -> HttpSecurityBuilder {
        HttpSecurityBuilder {
            form: self.form,
            paths: Vec::new(),
        }
    }

    /// Declarations from the `[security]` configuration section
    pub fn from_config(config: &AppConfig) -> HttpSecurityBuilder {
        let security = &config.security;
        let mut http = Self::new()
            .with_form(security.form(&config.server.context_path))
            .http();

        if let Some(scheme) = security.all_paths {
            http = http.all_paths().authenticate_with().scheme(scheme).finish();
        }

        for entry in &security.paths {
            let mut path = http.for_paths(entry.patterns());
            if entry.unprotected {
                path = path.unprotected();
            }
            if let Some(scheme) = entry.authenticate {
                path = path.authenticate_with().scheme(scheme);
            }
            if !entry.roles.is_empty() {
                path = path.authorize_with().roles(entry.roles.iter().cloned());
            }
            http = path.finish();
        }

        http
    }
}

/// Unvalidated declaration for one path or path group
#[derive(Debug, Clone, Default)]
struct PathDraft {
    patterns: Vec<String>,
    scheme: Option<AuthScheme>,
    roles: BTreeSet<String>,
    unprotected: bool,
}

/// Collects path declarations
#[derive(Debug)]
pub struct HttpSecurityBuilder {
    form: FormAuthenticationConfig,
    paths: Vec<PathDraft>,
}

impl HttpSecurityBuilder {
    /// Declare requirements for every path (`/*`)
    pub fn all_paths(self) -> PathConfigurationBuilder {
        self.for_paths(["/*"])
    }

    /// Declare requirements for one path pattern
    pub fn for_path(self, pattern: impl Into<String>) -> PathConfigurationBuilder {
        self.for_paths([pattern])
    }

    /// Declare shared requirements for a group of path patterns
    pub fn for_paths<I, S>(self, patterns: I) -> PathConfigurationBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PathConfigurationBuilder {
            http: self,
            draft: PathDraft {
                patterns: patterns.into_iter().map(Into::into).collect(),
                ..Default::default()
            },
        }
    }

    /// Override the context path prefixed to redirect targets
    pub fn context_path(mut self, context_path: impl Into<String>) -> Self {
        self.form.context_path = context_path.into();
        self
    }

    /// Override the login page
    pub fn login_page(mut self, login_page: impl Into<String>) -> Self {
        self.form.login_page = login_page.into();
        self
    }

    /// Override the error page for failed logins
    pub fn error_page(mut self, error_page: impl Into<String>) -> Self {
        self.form.error_page = error_page.into();
        self
    }

    /// Flatten declarations into an evaluator
    pub fn build(self) -> Result<HttpSecurityConfiguration, ConfigError> {
        self.form.validate()?;

        let default_scheme = self
            .paths
            .iter()
            .find(|d| d.patterns.iter().any(|p| matches!(p.trim(), "/*" | "*")))
            .and_then(|d| d.scheme)
            .unwrap_or_default();

        let mut rules: Vec<PathRule> = Vec::new();
        for draft in &self.paths {
            if draft.patterns.is_empty() {
                return Err(ConfigError::invalid("path group declared without patterns"));
            }

            for raw in &draft.patterns {
                let pattern = PathPattern::parse(raw)?;
                let rule = Self::flatten(draft, pattern, default_scheme)?;

                match rules.iter().find(|r| r.pattern == rule.pattern) {
                    Some(existing) if existing.same_requirements(&rule) => {
                        debug!(pattern = %rule.pattern, "Ignoring duplicate path declaration");
                    }
                    Some(existing) => {
                        return Err(ConfigError::ConflictingRule {
                            pattern: rule.pattern.to_string(),
                            reason: format!(
                                "declared with roles {:?} and again with roles {:?}",
                                existing.required_roles, rule.required_roles
                            ),
                        });
                    }
                    None => rules.push(rule),
                }
            }
        }

        Self::check_ambiguity(&rules)?;

        // Login and error pages stay reachable unless declared otherwise
        for page in [&self.form.login_page, &self.form.error_page] {
            if !rules.iter().any(|r| r.pattern.as_str() == page.as_str()) {
                rules.push(PathRule {
                    pattern: PathPattern::parse(page)?,
                    required_roles: BTreeSet::new(),
                    requires_authentication: false,
                    scheme: None,
                });
            }
        }

        info!(rules = rules.len(), login = %self.form.login_target(), "Built HTTP security configuration");

        Ok(HttpSecurityConfiguration {
            evaluator: AccessPolicyEvaluator::new(rules, self.form.login_target()),
            form: self.form,
        })
    }

    /// Reject distinct patterns of equal rank that can govern the same path
    /// with different requirements
    fn check_ambiguity(rules: &[PathRule]) -> Result<(), ConfigError> {
        for (i, first) in rules.iter().enumerate() {
            for second in &rules[i + 1..] {
                if first.pattern.is_ambiguous_with(&second.pattern)
                    && !first.same_requirements(second)
                {
                    return Err(ConfigError::ConflictingRule {
                        pattern: second.pattern.to_string(),
                        reason: format!(
                            "matches the same paths as '{}' at equal precedence with different requirements",
                            first.pattern
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    fn flatten(
        draft: &PathDraft,
        pattern: PathPattern,
        default_scheme: AuthScheme,
    ) -> Result<PathRule, ConfigError> {
        if draft.unprotected {
            if !draft.roles.is_empty() || draft.scheme.is_some() {
                return Err(ConfigError::ConflictingRule {
                    pattern: pattern.to_string(),
                    reason: "declared unprotected but also requires authentication".to_string(),
                });
            }
            return Ok(PathRule {
                pattern,
                required_roles: BTreeSet::new(),
                requires_authentication: false,
                scheme: None,
            });
        }

        let requires_authentication = draft.scheme.is_some() || !draft.roles.is_empty();
        Ok(PathRule {
            pattern,
            required_roles: draft.roles.clone(),
            requires_authentication,
            scheme: requires_authentication.then(|| draft.scheme.unwrap_or(default_scheme)),
        })
    }
}

/// Requirements for the path or group being declared
#[derive(Debug)]
pub struct PathConfigurationBuilder {
    http: HttpSecurityBuilder,
    draft: PathDraft,
}

impl PathConfigurationBuilder {
    pub fn authenticate_with(self) -> AuthenticationBuilder {
        AuthenticationBuilder { path: self }
    }

    pub fn authorize_with(self) -> AuthorizationBuilder {
        AuthorizationBuilder { path: self }
    }

    /// Let these paths through without authentication
    pub fn unprotected(mut self) -> Self {
        self.draft.unprotected = true;
        self
    }

    pub fn all_paths(self) -> PathConfigurationBuilder {
        self.finish().all_paths()
    }

    pub fn for_path(self, pattern: impl Into<String>) -> PathConfigurationBuilder {
        self.finish().for_path(pattern)
    }

    pub fn for_paths<I, S>(self, patterns: I) -> PathConfigurationBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.finish().for_paths(patterns)
    }

    pub fn build(self) -> Result<HttpSecurityConfiguration, ConfigError> {
        self.finish().build()
    }

    /// Close this declaration and return to the HTTP builder
    pub fn finish(self) -> HttpSecurityBuilder {
        let mut http = self.http;
        http.paths.push(self.draft);
        http
    }
}

/// Chooses the authentication scheme for a path
#[derive(Debug)]
pub struct AuthenticationBuilder {
    path: PathConfigurationBuilder,
}

impl AuthenticationBuilder {
    pub fn form(mut self) -> PathConfigurationBuilder {
        self.path.draft.scheme = Some(AuthScheme::Form);
        self.path
    }

    pub fn scheme(mut self, scheme: AuthScheme) -> PathConfigurationBuilder {
        self.path.draft.scheme = Some(scheme);
        self.path
    }
}

/// Adds role constraints to a path
#[derive(Debug)]
pub struct AuthorizationBuilder {
    path: PathConfigurationBuilder,
}

impl AuthorizationBuilder {
    /// Require `role`
    pub fn role(self, role: impl Into<String>) -> PathConfigurationBuilder {
        self.roles([role])
    }

    /// Require any one of `roles`
    pub fn roles<I, S>(mut self, roles: I) -> PathConfigurationBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path
            .draft
            .roles
            .extend(roles.into_iter().map(Into::into));
        self.path
    }
}
