// src/state.rs
use std::sync::Arc;
use std::time::Duration;

use crate::services::chatbot::HistoryPolicy;
use crate::services::metrics_manager::MetricsManager;
use crate::services::model_client::ModelClient;
use crate::services::session_manager::SessionManager;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub model: Arc<dyn ModelClient>,
    pub sessions: SessionManager,
    pub metrics: MetricsManager,
    pub history_policy: HistoryPolicy,
    pub admin_key: Option<String>,
}

impl AppState {
    pub fn new(model: Arc<dyn ModelClient>, session_ttl: Duration) -> Self {
        Self {
            model,
            sessions: SessionManager::new(session_ttl),
            metrics: MetricsManager::new(),
            history_policy: HistoryPolicy::default(),
            admin_key: None,
        }
    }

    pub fn with_history_policy(mut self, policy: HistoryPolicy) -> Self {
        self.history_policy = policy;
        self
    }

    pub fn with_max_transcript(mut self, max_len: usize) -> Self {
        self.sessions = self.sessions.with_max_transcript(max_len);
        self
    }

    pub fn with_admin_key(mut self, key: Option<String>) -> Self {
        self.admin_key = key;
        self
    }
}
