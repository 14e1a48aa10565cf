//! In-memory session registry.
//!
//! Each session owns one transcript behind an async mutex so concurrent
//! tasks can never interleave writes to the same conversation. Generation
//! slots are bounded process-wide; within a session, a second submission
//! while a stream is in flight is rejected rather than cancelling the
//! in-flight generator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::transcript::Transcript;

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub turn_count: usize,
    pub preview: Option<String>,
}

#[derive(Debug, Error)]
pub enum GenerationRejected {
    #[error("a generation is already streaming for this session")]
    SessionBusy,
    #[error("no free generation slots")]
    NoFreeSlots,
}

pub struct ChatSession {
    pub id: String,
    created_at: String,
    updated_at: RwLock<String>,
    transcript: Mutex<Transcript>,
    generating: AtomicBool,
}

impl ChatSession {
    fn new(id: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id,
            created_at: now.clone(),
            updated_at: RwLock::new(now),
            transcript: Mutex::new(Transcript::new()),
            generating: AtomicBool::new(false),
        }
    }

    pub async fn transcript(&self) -> MutexGuard<'_, Transcript> {
        self.transcript.lock().await
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    pub fn touch(&self) {
        if let Ok(mut updated) = self.updated_at.write() {
            *updated = chrono::Utc::now().to_rfc3339();
        }
    }

    async fn info(&self) -> SessionInfo {
        let transcript = self.transcript.lock().await;
        let preview = transcript
            .turns()
            .iter()
            .find_map(|turn| turn.question.clone())
            .map(|q| q.chars().take(80).collect());
        SessionInfo {
            id: self.id.clone(),
            created_at: self.created_at.clone(),
            updated_at: self
                .updated_at
                .read()
                .map(|s| s.clone())
                .unwrap_or_else(|_| self.created_at.clone()),
            turn_count: transcript.len(),
            preview,
        }
    }
}

/// Holds a session's generation exclusively for the duration of one turn.
/// Dropping it releases both the session flag and the process-wide slot.
pub struct GenerationGuard {
    session: Arc<ChatSession>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.session.generating.store(false, Ordering::SeqCst);
    }
}

pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<ChatSession>>>,
    slots: Arc<Semaphore>,
}

impl SessionManager {
    pub fn new(max_concurrent_generations: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            slots: Arc::new(Semaphore::new(max_concurrent_generations.max(1))),
        }
    }

    pub fn create(&self) -> Arc<ChatSession> {
        let id = uuid::Uuid::new_v4().to_string();
        self.get_or_create(&id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<ChatSession>> {
        self.sessions
            .read()
            .ok()
            .and_then(|map| map.get(id).cloned())
    }

    pub fn get_or_create(&self, id: &str) -> Arc<ChatSession> {
        if let Some(session) = self.get(id) {
            return session;
        }

        let session = Arc::new(ChatSession::new(id.to_string()));
        if let Ok(mut map) = self.sessions.write() {
            return map
                .entry(id.to_string())
                .or_insert_with(|| session.clone())
                .clone();
        }
        session
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions
            .write()
            .ok()
            .and_then(|mut map| map.remove(id))
            .is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|map| map.len()).unwrap_or(0)
    }

    pub async fn session_infos(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<ChatSession>> = self
            .sessions
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default();

        let mut infos = Vec::with_capacity(sessions.len());
        for session in sessions {
            infos.push(session.info().await);
        }
        infos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        infos
    }

    /// Claims the session for one generation, enforcing the reject policy
    /// and the process-wide slot bound.
    pub fn begin_generation(
        &self,
        session: &Arc<ChatSession>,
    ) -> Result<GenerationGuard, GenerationRejected> {
        let permit = match self.slots.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::NoPermits) => return Err(GenerationRejected::NoFreeSlots),
            Err(TryAcquireError::Closed) => return Err(GenerationRejected::NoFreeSlots),
        };

        if session
            .generating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(GenerationRejected::SessionBusy);
        }

        Ok(GenerationGuard {
            session: session.clone(),
            _permit: permit,
        })
    }
}
