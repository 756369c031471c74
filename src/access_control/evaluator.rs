//! Access policy evaluator
//!
//! Decides, for a servlet path and an optional principal, whether a request
//! is allowed, must be sent to the login page, or is forbidden:
//!
//! 1. No rule governs the path: allow
//! 2. Rule requires authentication and there is no authenticated principal:
//!    redirect to the login entry point
//! 3. Rule requires one of a set of roles the principal does not hold: 403
//! 4. Otherwise: allow

use crate::access_control::types::{AccessDecision, FORBIDDEN, PathRule, Principal};
use std::sync::{Arc, RwLock};
use tracing::{debug, trace, warn};

/// Immutable, thread-safe evaluator over a rule set
#[derive(Debug)]
pub struct AccessPolicyEvaluator {
    /// Rules ordered from most to least specific
    rules: Vec<PathRule>,
    /// Redirect target for unauthenticated access (context path + login page)
    login_target: String,
}

impl AccessPolicyEvaluator {
    /// Create an evaluator; rules are ranked by pattern specificity.
    ///
    /// Rules built through the security builder never tie on a path; for
    /// hand-assembled rule sets declaration order breaks ties.
    pub fn new(mut rules: Vec<PathRule>, login_target: impl Into<String>) -> Self {
        rules.sort_by(|a, b| a.pattern.cmp_specificity(&b.pattern));
        Self {
            rules,
            login_target: login_target.into(),
        }
    }

    /// Evaluator with no rules; every path is allowed
    pub fn allow_all() -> Self {
        Self::new(Vec::new(), "/login")
    }

    /// Find the rule governing `path`
    pub fn governing_rule(&self, path: &str) -> Option<&PathRule> {
        self.rules.iter().find(|rule| rule.pattern.matches(path))
    }

    /// Decide whether a request for `path` may proceed
    pub fn evaluate(&self, path: &str, principal: Option<&Principal>) -> AccessDecision {
        let Some(rule) = self.governing_rule(path) else {
            trace!(path, "No rule governs path");
            return AccessDecision::Allow;
        };

        trace!(path, pattern = %rule.pattern, "Matched rule");

        let principal = principal.filter(|p| p.authenticated);

        let needs_identity = rule.requires_authentication || rule.has_role_constraint();
        let Some(principal) = principal else {
            if needs_identity {
                debug!(path, pattern = %rule.pattern, "Unauthenticated request to protected path");
                return AccessDecision::Redirect(self.login_target.clone());
            }
            return AccessDecision::Allow;
        };

        if rule.has_role_constraint() && !principal.has_any_role(&rule.required_roles) {
            debug!(
                path,
                principal = %principal.id,
                required = ?rule.required_roles,
                "Principal lacks required role"
            );
            return AccessDecision::Deny(FORBIDDEN);
        }

        AccessDecision::Allow
    }

    pub fn rules(&self) -> &[PathRule] {
        &self.rules
    }

    pub fn login_target(&self) -> &str {
        &self.login_target
    }
}

/// Copy-on-write handle to the active evaluator
///
/// Readers take a snapshot `Arc` and evaluate without holding the lock, so a
/// replacement is observed whole or not at all.
#[derive(Debug, Clone)]
pub struct SharedPolicy {
    current: Arc<RwLock<Arc<AccessPolicyEvaluator>>>,
}

impl SharedPolicy {
    pub fn new(evaluator: AccessPolicyEvaluator) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(evaluator))),
        }
    }

    /// Snapshot of the active evaluator
    pub fn load(&self) -> Arc<AccessPolicyEvaluator> {
        let guard = self.current.read().unwrap_or_else(|poisoned| {
            warn!("policy lock poisoned, recovering");
            poisoned.into_inner()
        });
        Arc::clone(&*guard)
    }

    /// Replace the whole rule set; returns the previous evaluator
    pub fn replace(&self, evaluator: AccessPolicyEvaluator) -> Arc<AccessPolicyEvaluator> {
        let next = Arc::new(evaluator);
        let mut guard = self.current.write().unwrap_or_else(|poisoned| {
            warn!("policy lock poisoned, recovering");
            poisoned.into_inner()
        });
        debug!(rules = next.rules().len(), "Replacing access policy");
        std::mem::replace(&mut *guard, next)
    }

    pub fn evaluate(&self, path: &str, principal: Option<&Principal>) -> AccessDecision {
        self.load().evaluate(path, principal)
    }
}
