//! Identity model types

use crate::util::SecretString;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::SystemTime;

/// Name of the partition identities belong to unless configured otherwise
pub const DEFAULT_REALM: &str = "default";

/// Partition (realm) owning a set of identities
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Partition {
    pub name: String,
}

impl Partition {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self::new(DEFAULT_REALM)
    }
}

/// A named authorization grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub partition: Partition,
    pub enabled: bool,
    pub expiration_date: Option<SystemTime>,
    pub created_date: SystemTime,
}

impl Role {
    /// Whether the role currently grants anything
    pub fn is_active(&self, now: SystemTime) -> bool {
        self.enabled && self.expiration_date.is_none_or(|expires| expires > now)
    }
}

/// A user account with its granted role names
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub partition: Partition,
    pub enabled: bool,
    #[serde(skip)]
    pub password: SecretString,
    pub roles: BTreeSet<String>,
    pub created_date: SystemTime,
}
