//! Gemini `generateContent` client.
//!
//! Implements [`ModelClient`] over the public REST endpoint:
//! `POST {base}/v1beta/models/{model}:generateContent`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UpstreamError;
use crate::message::{ChatMessage, ChatRole};
use crate::services::model_client::{ModelClient, ModelReply, ModelRequest, OutputFormat};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply, UpstreamError> {
        let body = GenerateContentRequest::from_model_request(request);

        tracing::debug!(model = %self.model, turns = body.contents.len(), "calling gemini");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(UpstreamError::Status { status: status.as_u16(), body });
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        reply.into_text().map(|text| ModelReply { text })
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    fn from_model_request(request: &ModelRequest) -> Self {
        let mut contents: Vec<Content> = request
            .history
            .iter()
            .filter_map(Content::from_history)
            .collect();
        contents.push(Content::user(&request.prompt));

        let generation_config = match &request.output {
            OutputFormat::Text => None,
            OutputFormat::Json(schema) => Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema.clone(),
            }),
        };

        Self {
            system_instruction: request.system.as_deref().map(Content::system),
            contents,
            generation_config,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self::with_role(Some("user"), text)
    }

    fn system(text: &str) -> Self {
        Self::with_role(None, text)
    }

    fn with_role(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: Some(text.to_string()) }],
        }
    }

    // Gemini only knows `user` and `model` turns.
    fn from_history(message: &ChatMessage) -> Option<Self> {
        match message.role {
            ChatRole::User => Some(Self::with_role(Some("user"), &message.content)),
            ChatRole::Assistant => Some(Self::with_role(Some("model"), &message.content)),
            ChatRole::System => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, UpstreamError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(UpstreamError::EmptyReply(reason));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate
                .finish_reason
                .unwrap_or_else(|| "empty candidate".to_string());
            return Err(UpstreamError::EmptyReply(reason));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_maps_roles_and_schema() {
        let request = ModelRequest::text("How long should a cold last?")
            .with_system("be kind")
            .with_history(vec![
                ChatMessage::new(ChatRole::System, "ignored"),
                ChatMessage::new(ChatRole::User, "hi"),
                ChatMessage::new(ChatRole::Assistant, "hello"),
            ])
            .with_json_schema(json!({"type": "OBJECT"}));

        let body = serde_json::to_value(GenerateContentRequest::from_model_request(&request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be kind");
        assert!(body["systemInstruction"].get("role").is_none());
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "How long should a cold last?");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn text_request_has_no_generation_config() {
        let body = serde_json::to_value(GenerateContentRequest::from_model_request(
            &ModelRequest::text("hello"),
        ))
        .unwrap();
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn reply_text_joins_parts() {
        let reply: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Rest "}, {"text": "and hydrate."}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(reply.into_text().unwrap(), "Rest and hydrate.");
    }

    #[test]
    fn blocked_prompt_is_empty_reply() {
        let reply: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert_eq!(
            reply.into_text(),
            Err(UpstreamError::EmptyReply("SAFETY".to_string()))
        );
    }
}
