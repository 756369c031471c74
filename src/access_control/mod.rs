//! Access control module
//!
//! Role-based URL protection for HTTP requests.
//!
//! ## Access Control Model
//!
//! A rule set binds path patterns to requirements. For each request the most
//! specific matching pattern governs:
//!
//! 1. **Exact path** - `/reports/summary`
//! 2. **Segment wildcard** - `/api/*/admin`
//! 3. **Path prefix** - `/admin/*` (longest prefix first)
//! 4. **Extension** - `*.jsf`
//! 5. **Default** - `/*`
//!
//! The governing rule then decides:
//! - no rule: the request proceeds
//! - authentication required, no principal: redirect to the login page
//! - role required, principal holds none of the roles: 403
//! - otherwise the request proceeds
//!
//! ## Example Configuration
//!
//! ```toml
//! [security]
//! all_paths = "form"               # Every path needs a login
//!
//! [[security.paths]]
//! path = "/onlyManagerRole"
//! roles = ["Manager"]
//!
//! [[security.paths]]
//! paths = ["/login", "/static/*"]
//! unprotected = true
//! ```

pub mod builder;
pub mod evaluator;
pub mod patterns;
pub mod types;

pub use builder::{HttpSecurityConfiguration, SecurityConfigurationBuilder};
pub use evaluator::{AccessPolicyEvaluator, SharedPolicy};
pub use patterns::PathPattern;
pub use types::{AccessDecision, AuthScheme, FORBIDDEN, PathRule, Principal};
