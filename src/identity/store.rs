//! Identity store
//!
//! Role and user management backed by a process-local map.

use crate::error::{IdentityError, IdentityResult};
use crate::identity::model::{Partition, Role, User};
use crate::util::{SecretString, random_id};
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Role and user management operations
pub trait IdentityStore: Send + Sync {
    /// Partition new identities are created in
    fn partition(&self) -> Partition;

    /// Create a role; fails if the name is taken
    fn create_role(&self, name: &str) -> IdentityResult<Role>;

    /// Look up a role by name
    fn get_role(&self, name: &str) -> Option<Role>;

    /// Persist changes to a role's mutable attributes (enabled, expiration)
    fn update_role(&self, role: &Role) -> IdentityResult<()>;

    /// Remove a role and revoke it from every user
    fn remove_role(&self, role: &Role) -> IdentityResult<()>;

    fn list_roles(&self) -> Vec<Role>;

    /// Create a user; fails if the username is taken
    fn add_user(&self, username: &str, password: SecretString) -> IdentityResult<User>;

    fn get_user(&self, username: &str) -> Option<User>;

    /// Enable or disable a user account
    fn set_user_enabled(&self, username: &str, enabled: bool) -> IdentityResult<()>;

    fn grant_role(&self, username: &str, role: &str) -> IdentityResult<()>;

    fn revoke_role(&self, username: &str, role: &str) -> IdentityResult<()>;

    /// Whether the user currently holds an active grant of `role`
    fn has_role(&self, username: &str, role: &str) -> bool;

    /// Names of the active roles granted to a user
    fn effective_roles(&self, username: &str) -> BTreeSet<String>;
}

/// In-memory identity store
pub struct InMemoryIdentityStore {
    partition: Partition,
    data: RwLock<IdentityData>,
}

/// Roles and users behind a single lock
#[derive(Default)]
struct IdentityData {
    roles: HashMap<String, Role>,
    users: HashMap<String, User>,
}

impl InMemoryIdentityStore {
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            data: RwLock::new(IdentityData::default()),
        }
    }

    fn write_data(&self) -> RwLockWriteGuard<'_, IdentityData> {
        self.data.write().unwrap_or_else(|poisoned| {
            warn!("identity data lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn read_data(&self) -> RwLockReadGuard<'_, IdentityData> {
        self.data.read().unwrap_or_else(|poisoned| {
            warn!("identity data lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn validate_name(name: &str) -> IdentityResult<()> {
        if name.trim().is_empty() || name.trim() != name {
            return Err(IdentityError::InvalidName(name.to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new(Partition::default())
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn partition(&self) -> Partition {
        self.partition.clone()
    }

    fn create_role(&self, name: &str) -> IdentityResult<Role> {
        Self::validate_name(name)?;
        let mut data = self.write_data();

        if data.roles.contains_key(name) {
            return Err(IdentityError::DuplicateRole(name.to_string()));
        }

        let role = Role {
            id: random_id(),
            name: name.to_string(),
            partition: self.partition.clone(),
            enabled: true,
            expiration_date: None,
            created_date: SystemTime::now(),
        };
        data.roles.insert(name.to_string(), role.clone());

        info!(role = name, id = %role.id, "Created role");
        Ok(role)
    }

    fn get_role(&self, name: &str) -> Option<Role> {
        self.read_data().roles.get(name).cloned()
    }

    fn update_role(&self, role: &Role) -> IdentityResult<()> {
        let mut data = self.write_data();
        let stored = data
            .roles
            .get_mut(&role.name)
            .filter(|stored| stored.id == role.id)
            .ok_or_else(|| IdentityError::RoleNotFound(role.name.clone()))?;

        stored.enabled = role.enabled;
        stored.expiration_date = role.expiration_date;
        debug!(role = %role.name, enabled = role.enabled, "Updated role");
        Ok(())
    }

    fn remove_role(&self, role: &Role) -> IdentityResult<()> {
        let mut data = self.write_data();

        match data.roles.get(&role.name) {
            Some(stored) if stored.id == role.id => {}
            _ => return Err(IdentityError::RoleNotFound(role.name.clone())),
        }
        data.roles.remove(&role.name);

        for user in data.users.values_mut() {
            user.roles.remove(&role.name);
        }

        info!(role = %role.name, "Removed role");
        Ok(())
    }

    fn list_roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.read_data().roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }

    fn add_user(&self, username: &str, password: SecretString) -> IdentityResult<User> {
        Self::validate_name(username)?;
        let mut data = self.write_data();

        if data.users.contains_key(username) {
            return Err(IdentityError::DuplicateUser(username.to_string()));
        }

        let user = User {
            id: random_id(),
            username: username.to_string(),
            partition: self.partition.clone(),
            enabled: true,
            password,
            roles: BTreeSet::new(),
            created_date: SystemTime::now(),
        };
        data.users.insert(username.to_string(), user.clone());

        info!(user = username, "Created user");
        Ok(user)
    }

    fn get_user(&self, username: &str) -> Option<User> {
        self.read_data().users.get(username).cloned()
    }

    fn set_user_enabled(&self, username: &str, enabled: bool) -> IdentityResult<()> {
        let mut data = self.write_data();
        let user = data
            .users
            .get_mut(username)
            .ok_or_else(|| IdentityError::UserNotFound(username.to_string()))?;
        user.enabled = enabled;
        Ok(())
    }

    fn grant_role(&self, username: &str, role: &str) -> IdentityResult<()> {
        let mut data = self.write_data();

        if !data.roles.contains_key(role) {
            return Err(IdentityError::RoleNotFound(role.to_string()));
        }
        let user = data
            .users
            .get_mut(username)
            .ok_or_else(|| IdentityError::UserNotFound(username.to_string()))?;

        user.roles.insert(role.to_string());
        debug!(user = username, role, "Granted role");
        Ok(())
    }

    fn revoke_role(&self, username: &str, role: &str) -> IdentityResult<()> {
        let mut data = self.write_data();
        let user = data
            .users
            .get_mut(username)
            .ok_or_else(|| IdentityError::UserNotFound(username.to_string()))?;

        user.roles.remove(role);
        debug!(user = username, role, "Revoked role");
        Ok(())
    }

    fn has_role(&self, username: &str, role: &str) -> bool {
        self.effective_roles(username).contains(role)
    }

    fn effective_roles(&self, username: &str) -> BTreeSet<String> {
        let data = self.read_data();
        let now = SystemTime::now();

        let Some(user) = data.users.get(username) else {
            return BTreeSet::new();
        };

        user.roles
            .iter()
            .filter(|name| data.roles.get(*name).is_some_and(|r| r.is_active(now)))
            .cloned()
            .collect()
    }
}
