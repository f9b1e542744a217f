// src/services/mod.rs
pub mod chatbot;
pub mod gemini;
pub mod guidance;
pub mod metrics_manager;
pub mod model_client;
pub mod session_manager;
