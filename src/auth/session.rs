//! Process-local sessions
//!
//! Maps a random session id (carried in a cookie) to the authenticated
//! principal and the protected path the client asked for before login.
//! Sessions live for a fixed lifetime from creation; expired entries are
//! pruned whenever the registry is written.

use crate::access_control::Principal;
use crate::util::random_id;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "ROLEGUARD_SESSION";

/// Session lifetime unless configured otherwise
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
struct Session {
    principal: Option<Principal>,
    saved_path: Option<String>,
    expires_at: Instant,
}

impl Session {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Session registry
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_SESSION_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose sessions expire `timeout` after creation
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    /// Session lifetime, also sent as the cookie `Max-Age`
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn open(&self, now: Instant) -> Session {
        Session {
            principal: None,
            saved_path: None,
            expires_at: now + self.timeout,
        }
    }

    fn prune(sessions: &mut HashMap<String, Session>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, session| session.is_live(now));
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!(pruned, "Dropped expired sessions");
        }
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(|poisoned| {
            warn!("session lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(|poisoned| {
            warn!("session lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Principal bound to a session, if any
    pub fn principal(&self, session_id: &str) -> Option<Principal> {
        let now = Instant::now();
        self.read_sessions()
            .get(session_id)
            .filter(|s| s.is_live(now))
            .and_then(|s| s.principal.clone())
    }

    /// Whether `session_id` names a live session
    pub fn contains(&self, session_id: &str) -> bool {
        let now = Instant::now();
        self.read_sessions()
            .get(session_id)
            .is_some_and(|s| s.is_live(now))
    }

    /// Remember the path to return to after login.
    ///
    /// Reuses `session_id` when it names a live session, otherwise opens a
    /// new anonymous one. Returns the id in use.
    pub fn save_request(&self, session_id: Option<&str>, path: &str) -> String {
        let now = Instant::now();
        let mut sessions = self.write_sessions();
        Self::prune(&mut sessions, now);

        let id = match session_id {
            Some(id) if sessions.contains_key(id) => id.to_string(),
            _ => random_id(),
        };

        sessions
            .entry(id.clone())
            .or_insert_with(|| self.open(now))
            .saved_path = Some(path.to_string());
        debug!(path, "Saved request for post-login redirect");
        id
    }

    /// Bind a principal to a fresh session id, dropping the old session.
    ///
    /// Returns the new id and any path saved on the old session.
    pub fn login(&self, session_id: Option<&str>, principal: Principal) -> (String, Option<String>) {
        let now = Instant::now();
        let mut sessions = self.write_sessions();
        Self::prune(&mut sessions, now);

        let saved_path = session_id
            .and_then(|id| sessions.remove(id))
            .and_then(|s| s.saved_path);

        let id = random_id();
        sessions.insert(
            id.clone(),
            Session {
                principal: Some(principal),
                ..self.open(now)
            },
        );

        (id, saved_path)
    }

    /// Drop a session; returns whether it existed
    pub fn logout(&self, session_id: &str) -> bool {
        self.write_sessions().remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.read_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_sessions().is_empty()
    }
}
