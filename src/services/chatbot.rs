// src/services/chatbot.rs
use crate::error::{AssistantError, UpstreamError};
use crate::message::{ChatMessage, ChatRequest, ChatResponse, ChatRole};
use crate::services::model_client::{ModelClient, ModelRequest};

pub const HEALTH_ASSISTANT_PERSONA: &str = "\
You are MoDoc AI, a friendly and professional health assistant for a medical platform in Tamil Nadu, India.
Your goal is to help users navigate their health concerns, explain medical concepts simply, and suggest when they should see a specialist.

CRITICAL RULES:
1. NEVER provide a definitive medical diagnosis.
2. NEVER prescribe medication.
3. ALWAYS include a disclaimer if the user describes serious symptoms.
4. If symptoms sound like an emergency (chest pain, severe bleeding, etc.), tell them to call emergency services (108 in India) immediately.
5. Mention Coimbatore hospitals (KG Hospital, Ganga Hospital, PSG, KMCH) if relevant to their location.

Keep your tone empathetic, helpful, and concise.";

pub const GREETING: &str =
    "Hello! I'm MoDoc AI. How can I help you with your health concerns today?";

pub const FALLBACK_REPLY: &str =
    "I'm sorry, I'm having trouble connecting right now. Please try again later.";

pub const DEFAULT_MAX_FORWARDED_TURNS: usize = 20;

/// Whether prior turns of a chat request reach the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryPolicy {
    /// History is accepted but only the latest message is sent.
    #[default]
    Ignore,
    /// The most recent `max_turns` user and assistant turns are sent.
    /// System turns and fallback apologies never are.
    Forward { max_turns: usize },
}

impl HistoryPolicy {
    pub fn forward() -> Self {
        HistoryPolicy::Forward { max_turns: DEFAULT_MAX_FORWARDED_TURNS }
    }

    fn select(self, history: Option<&[ChatMessage]>) -> Vec<ChatMessage> {
        let (HistoryPolicy::Forward { max_turns }, Some(history)) = (self, history) else {
            return Vec::new();
        };
        let eligible: Vec<&ChatMessage> = history
            .iter()
            .filter(|m| m.role != ChatRole::System && !m.content.trim().is_empty())
            .filter(|m| !is_fallback_turn(m))
            .collect();
        let skip = eligible.len().saturating_sub(max_turns);
        eligible.into_iter().skip(skip).cloned().collect()
    }
}

// Fallback apologies were never said by the model.
fn is_fallback_turn(message: &ChatMessage) -> bool {
    message.role == ChatRole::Assistant && message.content == FALLBACK_REPLY
}

/// `GetChatReply`: the latest message plus the fixed persona.
pub async fn get_chat_reply(
    model: &dyn ModelClient,
    request: &ChatRequest,
    policy: HistoryPolicy,
) -> Result<ChatResponse, AssistantError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AssistantError::InvalidRequest(
            "Message cannot be empty".to_string(),
        ));
    }

    let history = policy.select(request.history.as_deref());
    if policy == HistoryPolicy::Ignore {
        if let Some(dropped) = request.history.as_ref().filter(|h| !h.is_empty()) {
            tracing::debug!(turns = dropped.len(), "chat history accepted but not forwarded");
        }
    }

    let model_request = ModelRequest::text(message)
        .with_system(HEALTH_ASSISTANT_PERSONA)
        .with_history(history);

    let reply = model.generate(&model_request).await?;
    if reply.text.trim().is_empty() {
        return Err(UpstreamError::EmptyReply("blank text".to_string()).into());
    }
    Ok(ChatResponse { text: reply.text })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    pub response: ChatResponse,
    pub fallback: bool,
}

/// Like [`get_chat_reply`], but an upstream failure becomes [`FALLBACK_REPLY`].
/// Invalid input is still an error.
pub async fn chat_reply_or_fallback(
    model: &dyn ModelClient,
    request: &ChatRequest,
    policy: HistoryPolicy,
) -> Result<ChatOutcome, AssistantError> {
    match get_chat_reply(model, request, policy).await {
        Ok(response) => Ok(ChatOutcome { response, fallback: false }),
        Err(AssistantError::Upstream(err)) => {
            tracing::warn!(client = model.name(), error = %err, "chat model call failed, using fallback");
            Ok(ChatOutcome {
                response: ChatResponse { text: FALLBACK_REPLY.to_string() },
                fallback: true,
            })
        }
        Err(err) => Err(err),
    }
}
