//! Authentication module
//!
//! Form login: credential verification behind the [`Authenticator`] trait,
//! the form scheme settings, and the session registry that carries the
//! resulting principal between requests.

pub mod form;
pub mod provider;
pub mod session;

pub use form::{FormAuthenticationConfig, FormCredentials, J_PASSWORD, J_USERNAME};
pub use provider::{Authenticator, IdentityAuthenticator, SharedAuthenticator};
pub use session::{DEFAULT_SESSION_TIMEOUT, SESSION_COOKIE, SessionStore};

use crate::identity::IdentityStore;
use std::sync::Arc;

/// Create the authenticator backed by an identity store
pub fn create_authenticator(store: Arc<dyn IdentityStore>) -> SharedAuthenticator {
    Arc::new(IdentityAuthenticator::new(store))
}
