//! roleguard
//!
//! Role-based URL protection with form authentication for HTTP services.
//!
//! ## Features
//!
//! - **Servlet-style path patterns**: exact, segment wildcard, prefix, extension and default
//! - **Most specific rule wins**, ties go to the rule declared first
//! - **Form login** with `j_username`/`j_password`, saved-request replay and logout
//! - **Fluent builder** and TOML configuration for the same rule set
//! - **axum middleware** that redirects, rejects or lets requests through
//!
//! ## Decision Model
//!
//! ```text
//! path → governing rule → Allow | Redirect(login) | Deny(403)
//! ```
//!
//! A path with no governing rule is allowed. A rule requiring authentication
//! sends anonymous callers to the login page. A rule listing roles lets in
//! principals holding any one of them and rejects everyone else.
//!
//! ## Example Configuration
//!
//! ```toml
//! [security]
//! all_paths = "form"              # Every path needs a login
//!
//! [[security.paths]]
//! path = "/onlyManagerRole"
//! roles = ["Manager"]
//!
//! [[identity.users]]
//! username = "picketlink"
//! password = "picketlink"
//! roles = ["Manager"]
//! ```

pub mod access_control;
pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod identity;
pub mod server;
pub mod util;

// Re-export main types
pub use access_control::{AccessDecision, AccessPolicyEvaluator, Principal, SecurityConfigurationBuilder};
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use filter::SecurityFilter;
pub use server::{AppState, build_router};
