// src/services/session_manager.rs
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::message::{ChatMessage, ChatRole};
use crate::services::chatbot::GREETING;

#[derive(Clone, Debug)]
pub struct Session {
    pub id: String,
    pub transcript: Vec<ChatMessage>,
    pub last_active: Instant,
}

impl Session {
    // Every conversation opens with the assistant greeting.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transcript: vec![ChatMessage::new(ChatRole::Assistant, GREETING)],
            last_active: Instant::now(),
        }
    }

    fn push(&mut self, message: ChatMessage, max_len: usize) {
        self.transcript.push(message);
        let excess = self.transcript.len().saturating_sub(max_len);
        if excess > 0 {
            self.transcript.drain(..excess);
        }
        self.last_active = Instant::now();
    }
}

pub const DEFAULT_MAX_TRANSCRIPT_LEN: usize = 200;

/// In-memory chat transcripts, expired after `ttl` of inactivity.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
    max_transcript: usize,
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .field("max_transcript", &self.max_transcript)
            .finish()
    }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_transcript: DEFAULT_MAX_TRANSCRIPT_LEN,
        }
    }

    /// Oldest messages are dropped once a transcript exceeds `max_len`.
    pub fn with_max_transcript(mut self, max_len: usize) -> Self {
        self.max_transcript = max_len.max(2);
        self
    }

    // Create a fresh session and return its id.
    pub async fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let mut guard = self.inner.write().await;
        guard.insert(id.clone(), Session::new(id.clone()));
        id
    }

    // Ensure there's a session with this id.
    pub async fn ensure_session(&self, id: &str) -> String {
        {
            let guard = self.inner.read().await;
            if guard.contains_key(id) {
                return id.to_string();
            }
        }
        let mut guard = self.inner.write().await;
        guard
            .entry(id.to_string())
            .or_insert_with(|| Session::new(id.to_string()));
        id.to_string()
    }

    /// Append a message and touch `last_active`. Returns the transcript length.
    pub async fn append_message(
        &self,
        session_id: &str,
        role: ChatRole,
        content: impl Into<String>,
    ) -> usize {
        let mut guard = self.inner.write().await;
        let entry = guard
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string()));
        entry.push(ChatMessage::new(role, content), self.max_transcript);
        entry.transcript.len()
    }

    /// Append a user message and the assistant reply to it as one unit, so
    /// concurrent turns on the same session never interleave.
    pub async fn append_turn(
        &self,
        session_id: &str,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) -> usize {
        let mut guard = self.inner.write().await;
        let entry = guard
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string()));
        entry.push(ChatMessage::new(ChatRole::User, user), self.max_transcript);
        entry.push(ChatMessage::new(ChatRole::Assistant, assistant), self.max_transcript);
        entry.transcript.len()
    }

    /// Get a copy of the session transcript
    pub async fn get_history(&self, session_id: &str) -> Option<Vec<ChatMessage>> {
        let guard = self.inner.read().await;
        guard.get(session_id).map(|s| s.transcript.clone())
    }

    /// Remove a session by id
    pub async fn remove_session(&self, session_id: &str) -> bool {
        let mut guard = self.inner.write().await;
        guard.remove(session_id).is_some()
    }

    /// Remove sessions idle longer than ttl. Returns number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut guard = self.inner.write().await;
        let now = Instant::now();
        let before = guard.len();
        guard.retain(|_, s| now.duration_since(s.last_active) < self.ttl);
        before - guard.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
