use crate::domain::lead::{GenerationRequest, GenerationResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Transient per-user state. Lives only in process memory; a cleared or
/// restarted session starts from scratch.
#[derive(Debug, Default)]
pub struct Session {
    last_request: Option<GenerationRequest>,
    result: Option<GenerationResult>,
    request_count: u64,
}

impl Session {
    /// Returns the held result when the incoming request matches the last
    /// successful one. Requests must already be normalized.
    pub fn cached_result_for(&self, request: &GenerationRequest) -> Option<GenerationResult> {
        if self.last_request.as_ref() == Some(request) {
            return self.result.clone();
        }
        None
    }

    pub fn store_success(&mut self, request: GenerationRequest, result: GenerationResult) {
        self.last_request = Some(request);
        self.result = Some(result);
        self.request_count += 1;
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        self.result.as_ref()
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }
}

/// In-memory session map. Each session is wrapped in its own async mutex so a
/// submission holds exactly one generation in flight per session; the outer
/// std mutex only guards map access.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, id: Uuid) -> Arc<tokio::sync::Mutex<Session>> {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        sessions
            .entry(id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(Session::default())))
            .clone()
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<tokio::sync::Mutex<Session>>> {
        let sessions = self.sessions.lock().expect("session map poisoned");
        sessions.get(&id).cloned()
    }

    pub fn clear(&self, id: Uuid) -> bool {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        sessions.remove(&id).is_some()
    }
}
