use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AssistantError;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceCounts {
    pub succeeded: u64,
    pub invalid_request: u64,
    pub validation_failed: u64,
    pub upstream_failed: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCounts {
    pub replied: u64,
    pub fallback: u64,
    pub invalid_request: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsData {
    pub guidance: GuidanceCounts,
    pub chat: ChatCounts,
}

/// Outcome counters for both flows, served at `/admin/metrics`.
#[derive(Debug, Clone)]
pub struct MetricsManager {
    inner: Arc<RwLock<MetricsData>>,
}

impl Default for MetricsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsData::default())),
        }
    }

    pub async fn record_guidance<T>(&self, result: &Result<T, AssistantError>) {
        let mut data = self.inner.write().await;
        let counts = &mut data.guidance;
        match result {
            Ok(_) => counts.succeeded += 1,
            Err(AssistantError::InvalidRequest(_)) => counts.invalid_request += 1,
            Err(AssistantError::Validation(_)) => counts.validation_failed += 1,
            Err(AssistantError::Upstream(_)) => counts.upstream_failed += 1,
        }
    }

    pub async fn record_chat(&self, fallback: bool) {
        let mut data = self.inner.write().await;
        if fallback {
            data.chat.fallback += 1;
        } else {
            data.chat.replied += 1;
        }
    }

    pub async fn record_chat_rejected(&self) {
        self.inner.write().await.chat.invalid_request += 1;
    }

    pub async fn get_metrics(&self) -> MetricsData {
        self.inner.read().await.clone()
    }
}
