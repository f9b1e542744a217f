#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use modoc_backend::error::UpstreamError;
use modoc_backend::services::model_client::{ModelClient, ModelReply, ModelRequest};

/// Plays back scripted results in order and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, UpstreamError>>>,
    requests: Mutex<Vec<ModelRequest>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, UpstreamError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn failing(err: UpstreamError) -> Self {
        Self::new(vec![Err(err)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ModelRequest {
        self.requests().pop().expect("model was never called")
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(UpstreamError::Transport("script exhausted".to_string())));
        next.map(|text| ModelReply { text })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub const VALID_GUIDANCE: &str = r#"{
    "specialties": ["Orthopedics", "Physical Medicine and Rehabilitation"],
    "nextSteps": ["Book a consultation with an orthopedic specialist", "Note when the pain gets worse"],
    "disclaimer": "This information is not a medical diagnosis. Please consult a qualified healthcare professional."
}"#;
