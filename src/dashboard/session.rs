use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::account::{
    model::Identity,
    repo::AccountSource,
    resolver::ActiveAccountResolver,
    selection::{PersistedSelection, SessionStorage},
};

struct SessionEntry {
    resolver: Arc<ActiveAccountResolver>,
    expires_at: Option<DateTime<Utc>>,
    last_seen: DateTime<Utc>,
}

impl SessionEntry {
    fn is_over(&self, now: DateTime<Utc>, idle_ttl: Duration) -> bool {
        self.expires_at.is_some_and(|at| at <= now) || now - self.last_seen >= idle_ttl
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    Unknown,
    /// The session belongs to another identity and was left open.
    NotOwner,
}

/// One resolver per authenticated browser session, each with its own
/// session storage. A session ends at sign-out, when its credential expires,
/// or after `idle_ttl` without a request.
pub struct SessionRegistry {
    source: Arc<dyn AccountSource>,
    idle_ttl: Duration,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(source: Arc<dyn AccountSource>, idle_ttl: Duration) -> Self {
        Self {
            source,
            idle_ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn open(
        &self,
        session_id: &str,
        identity: Identity,
        expires_at: Option<DateTime<Utc>>,
    ) -> Arc<ActiveAccountResolver> {
        self.open_at(session_id, identity, expires_at, Utc::now())
    }

    /// Returns the session's resolver, creating it on first use. A session id
    /// presented by a different identity starts over with fresh storage.
    pub fn open_at(
        &self,
        session_id: &str,
        identity: Identity,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Arc<ActiveAccountResolver> {
        let mut sessions = self.lock();
        self.sweep_locked(&mut sessions, now);

        if let Some(entry) = sessions.get_mut(session_id) {
            if entry.resolver.identity().id == identity.id {
                entry.last_seen = now;
                entry.expires_at = expires_at;
                return Arc::clone(&entry.resolver);
            }
            entry.resolver.clear();
        }
        info!(session = %session_id, identity = %identity.id, "session started");
        let selection = PersistedSelection::new(SessionStorage::new());
        let resolver = Arc::new(ActiveAccountResolver::new(
            identity,
            Arc::clone(&self.source),
            Arc::new(selection),
        ));
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                resolver: Arc::clone(&resolver),
                expires_at,
                last_seen: now,
            },
        );
        resolver
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<ActiveAccountResolver>> {
        self.lock()
            .get(session_id)
            .map(|entry| Arc::clone(&entry.resolver))
    }

    /// Sign-out on behalf of `identity`.
    pub fn close(&self, session_id: &str, identity: &Identity) -> CloseOutcome {
        let mut sessions = self.lock();
        let owner = sessions
            .get(session_id)
            .map(|entry| entry.resolver.identity().id.clone());
        match owner {
            None => CloseOutcome::Unknown,
            Some(owner) if owner != identity.id => CloseOutcome::NotOwner,
            Some(_) => {
                if let Some(entry) = sessions.remove(session_id) {
                    entry.resolver.clear();
                }
                info!(session = %session_id, identity = %identity.id, "session closed");
                CloseOutcome::Closed
            }
        }
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// Drops expired and idle sessions, returning how many were removed.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.lock();
        self.sweep_locked(&mut sessions, now)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep_locked(
        &self,
        sessions: &mut HashMap<String, SessionEntry>,
        now: DateTime<Utc>,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|session_id, entry| {
            let over = entry.is_over(now, self.idle_ttl);
            if over {
                entry.resolver.clear();
                debug!(session = %session_id, identity = %entry.resolver.identity().id, "session ended");
            }
            !over
        });
        before - sessions.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
