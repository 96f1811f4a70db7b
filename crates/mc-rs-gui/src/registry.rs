//! Active sessions, one per player.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::session::GuiSession;

/// Thread-safe map of player → open GUI session.
///
/// Cloning shares the same underlying map.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, GuiSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, GuiSession>> {
        self.sessions.lock()
    }

    /// The session currently open for `player`.
    pub fn get(&self, player: Uuid) -> Option<GuiSession> {
        self.lock().get(&player).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of every active session.
    pub fn sessions(&self) -> Vec<GuiSession> {
        self.lock().values().cloned().collect()
    }

    /// Force-close every active session.
    pub fn close_all(&self) {
        // Closing removes entries, so iterate over a snapshot.
        let sessions = self.sessions();
        debug!("Closing {} active GUI sessions", sessions.len());
        for session in sessions {
            session.force_close();
        }
    }

    pub(crate) fn insert(&self, session: GuiSession) {
        self.lock().insert(session.player(), session);
    }

    /// Remove `session` if it is still the active entry for its player.
    pub(crate) fn remove(&self, session: &GuiSession) -> bool {
        let mut sessions = self.lock();
        match sessions.get(&session.player()) {
            Some(active) if active.same_session(session) => {
                sessions.remove(&session.player());
                true
            }
            _ => false,
        }
    }
}
