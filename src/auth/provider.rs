//! Authenticator trait
//!
//! Turns submitted credentials into a [`Principal`]. The identity-backed
//! implementation checks users configured in the identity store; other
//! backends (directory lookups, external IdPs) plug in behind the same trait.

use crate::access_control::Principal;
use crate::error::AuthError;
use crate::identity::IdentityStore;
// async_trait required for dyn-compatibility with Arc<dyn Authenticator>
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Credential verification collaborator
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify credentials and build the principal for the session
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError>;

    /// Description of the backend (for logging)
    fn name(&self) -> &'static str;
}

/// Shared authenticator handle
pub type SharedAuthenticator = Arc<dyn Authenticator>;

/// Authenticates against users held in an [`IdentityStore`]
pub struct IdentityAuthenticator {
    store: Arc<dyn IdentityStore>,
}

impl IdentityAuthenticator {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authenticator for IdentityAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        let Some(user) = self.store.get_user(username) else {
            debug!(user = username, "Unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        if !user.password.verify(password) {
            debug!(user = username, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.enabled {
            return Err(AuthError::AccountDisabled(username.to_string()));
        }

        let roles = self.store.effective_roles(username);
        info!(user = username, roles = ?roles, "User authenticated");

        Ok(Principal {
            id: user.username,
            roles,
            authenticated: true,
        })
    }

    fn name(&self) -> &'static str {
        "identity store"
    }
}
