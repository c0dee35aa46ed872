//! Text-completion client for the lesson-video workspace
//!
//! Provides one interface over OpenAI-style chat completion endpoints:
//! - OpenAI
//! - OpenRouter (multi-model access)
//! - Cerebras (fast Llama inference)
//!
//! plus a scriptable [`MockProvider`] for tests.

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;

pub use config::{Config, ModelPreset, ProviderConfig};
pub use error::{LlmError, Result};
pub use provider::{LlmProvider, LlmRequest, LlmResponse, TokenUsage};
pub use providers::{MockProvider, ProviderKind, get_provider};
