//! Mock completion provider for testing
//!
//! Replies can be scripted per call, so a multi-stage prompt pipeline can be
//! driven end to end without network access. Every prompt received is recorded
//! for later assertions.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse};

/// One scripted outcome.
enum Reply {
    Content(String),
    Fail(LlmError),
}

/// A mock provider that replays scripted replies in order
pub struct MockProvider {
    /// Replies consumed front to back
    script: Mutex<VecDeque<Reply>>,
    /// Reply used once the script runs dry (None = fail with EmptyResponse)
    fallback: Option<Reply>,
    /// Prompts received, in call order
    prompts: Mutex<Vec<LlmRequest>>,
    call_count: AtomicUsize,
    name: &'static str,
}

impl MockProvider {
    fn with_script(script: VecDeque<Reply>, fallback: Option<Reply>) -> Self {
        Self {
            script: Mutex::new(script),
            fallback,
            prompts: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            name: "mock",
        }
    }

    /// Create a provider that answers every request with the same text
    pub fn always_succeeds(response: &str) -> Self {
        Self::with_script(VecDeque::new(), Some(Reply::Content(response.to_string())))
    }

    /// Create a provider that always fails with the given error
    pub fn always_fails(error: LlmError) -> Self {
        Self::with_script(VecDeque::new(), Some(Reply::Fail(error)))
    }

    /// Create a provider that fails `n` times with the given error, then succeeds
    pub fn fails_then_succeeds(n: usize, error: LlmError, response: &str) -> Self {
        let mut script = VecDeque::new();
        for _ in 0..n {
            script.push_back(Reply::Fail(clone_error(&error)));
        }
        Self::with_script(script, Some(Reply::Content(response.to_string())))
    }

    /// Create a provider that returns each response once, in order
    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = responses
            .into_iter()
            .map(|r| Reply::Content(r.into()))
            .collect();
        Self::with_script(script, None)
    }

    /// Get the number of times complete() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.iter().map(|r| r.prompt.clone()).collect())
            .unwrap_or_default()
    }

    /// Full requests received so far, in call order
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Set a custom provider name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    fn next_reply(&self) -> Reply {
        let mut script = match self.script.lock() {
            Ok(script) => script,
            Err(poisoned) => poisoned.into_inner(),
        };

        match script.pop_front() {
            Some(reply) => reply,
            None => match &self.fallback {
                Some(Reply::Content(text)) => Reply::Content(text.clone()),
                Some(Reply::Fail(err)) => Reply::Fail(clone_error(err)),
                None => Reply::Fail(LlmError::EmptyResponse {
                    provider: self.name.to_string(),
                }),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request);
        }

        match self.next_reply() {
            Reply::Content(content) => Ok(LlmResponse {
                content,
                model: "mock-model".to_string(),
                usage: None,
            }),
            Reply::Fail(err) => Err(err),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> Result<()> {
        Ok(())
    }
}

/// Clone an LlmError (needed because LlmError doesn't implement Clone)
fn clone_error(err: &LlmError) -> LlmError {
    match err {
        LlmError::ServerOverloaded { message } => LlmError::ServerOverloaded {
            message: message.clone(),
        },
        LlmError::MissingApiKey { provider, env_var } => LlmError::MissingApiKey {
            provider: provider.clone(),
            env_var: env_var.clone(),
        },
        LlmError::RateLimited { retry_after } => LlmError::RateLimited {
            retry_after: *retry_after,
        },
        LlmError::ApiError {
            message,
            status_code,
        } => LlmError::ApiError {
            message: message.clone(),
            status_code: *status_code,
        },
        LlmError::EmptyResponse { provider } => LlmError::EmptyResponse {
            provider: provider.clone(),
        },
        LlmError::ProviderUnavailable(s) => LlmError::ProviderUnavailable(s.clone()),
        LlmError::ConfigError(s) => LlmError::ConfigError(s.clone()),
        LlmError::InvalidPreset(s) => LlmError::InvalidPreset(s.clone()),
        // Io and Toml errors can't be cloned; substitute a config error
        LlmError::Io(_) => LlmError::ConfigError("IO error (mock)".to_string()),
        LlmError::TomlParse(_) => LlmError::ConfigError("TOML parse error (mock)".to_string()),
        LlmError::TomlSerialize(_) => {
            LlmError::ConfigError("TOML serialize error (mock)".to_string())
        }
    }
}
