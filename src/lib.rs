pub mod config;
pub mod error;
pub mod logger;
pub mod message;
pub mod routes;
pub mod services;
pub mod state;

pub use error::{AssistantError, UpstreamError, ValidationError};
pub use services::chatbot::{HistoryPolicy, chat_reply_or_fallback, get_chat_reply};
pub use services::guidance::get_specialty_guidance;
pub use services::model_client::{ModelClient, ModelReply, ModelRequest};
