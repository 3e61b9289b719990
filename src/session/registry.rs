use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use super::{SessionEvent, SessionState};
use crate::types::{AppError, AppResult};

pub const DEFAULT_MAX_SESSIONS: usize = 100;

struct Slot {
    created_at: DateTime<Utc>,
    state: Arc<Mutex<SessionState>>,
}

/// Latest state of every live session.
///
/// Events on one session run one at a time: each holds that session's mutex
/// from reading the state until the new state is stored. Different sessions
/// do not block each other. Beyond `max_sessions` the oldest session is
/// evicted, which drops its dataset and deletes its upload file once no
/// in-flight request still holds it.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Slot>>>,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            max_sessions: max_sessions.max(1),
        }
    }

    pub async fn insert(&self, state: SessionState) {
        let mut guard = self.inner.write().await;

        while guard.len() >= self.max_sessions && !guard.contains_key(&state.id) {
            let oldest = guard
                .iter()
                .min_by_key(|(_, slot)| slot.created_at)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    guard.remove(&id);
                    info!(session_id = %id, "Session evicted");
                }
                None => break,
            }
        }

        guard.insert(
            state.id,
            Slot {
                created_at: state.created_at,
                state: Arc::new(Mutex::new(state)),
            },
        );
    }

    async fn slot(&self, id: Uuid) -> AppResult<Arc<Mutex<SessionState>>> {
        let guard = self.inner.read().await;
        guard
            .get(&id)
            .map(|slot| slot.state.clone())
            .ok_or_else(|| AppError::NotFound(format!("session {}", id)))
    }

    /// Current state; waits for an in-flight event on the session to finish.
    pub async fn get(&self, id: Uuid) -> Option<SessionState> {
        let slot = self.slot(id).await.ok()?;
        let state = slot.lock().await;
        Some(state.clone())
    }

    /// Drop a session. Returns false when the id is unknown.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.inner.write().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Session removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Apply one event to a session and store the resulting state.
    pub async fn apply(&self, id: Uuid, event: SessionEvent) -> AppResult<SessionState> {
        let slot = self.slot(id).await?;
        let mut current = slot.lock().await;
        let next = current.apply(event).await?;
        if next.revision != current.revision {
            *current = next.clone();
        }
        Ok(next)
    }

    /// Run a synchronous step against the current state while holding the
    /// session's lock. The step returns the new state plus a result for the
    /// caller; on error the stored state is left unchanged.
    pub async fn update<T>(
        &self,
        id: Uuid,
        step: impl FnOnce(&SessionState) -> AppResult<(SessionState, T)>,
    ) -> AppResult<(SessionState, T)> {
        let slot = self.slot(id).await?;
        let mut current = slot.lock().await;
        let (next, output) = step(&*current)?;
        *current = next.clone();
        Ok((next, output))
    }
}
