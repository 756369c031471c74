//! Identity module
//!
//! Roles, users and the store that manages them. The store seeds from the
//! `[identity]` configuration section at startup.

pub mod model;
pub mod store;

pub use model::{DEFAULT_REALM, Partition, Role, User};
pub use store::{IdentityStore, InMemoryIdentityStore};

use crate::config::IdentityConfig;
use crate::error::{IdentityError, IdentityResult};
use tracing::info;

/// Build an in-memory store populated from configuration
pub fn create_identity_store(config: &IdentityConfig) -> IdentityResult<InMemoryIdentityStore> {
    let store = InMemoryIdentityStore::new(Partition::new(config.realm.clone()));

    for role in &config.roles {
        store.create_role(role)?;
    }

    for user in &config.users {
        store.add_user(&user.username, user.password.clone())?;
        for role in &user.roles {
            // Roles referenced only by users are created implicitly
            match store.create_role(role) {
                Ok(_) | Err(IdentityError::DuplicateRole(_)) => {}
                Err(e) => return Err(e),
            }
            store.grant_role(&user.username, role)?;
        }
        if !user.enabled {
            store.set_user_enabled(&user.username, false)?;
        }
    }

    info!(
        realm = %config.realm,
        roles = store.list_roles().len(),
        users = config.users.len(),
        "Identity store ready"
    );

    Ok(store)
}
