//! Lesson authoring: from a learning prompt to a timed narration script.
//!
//! Each stage is one prompt template plus a completion call. Stage outputs are
//! ordered by topic as the model returned them.

mod prompts;

use anyhow::{Context, Result};
use llm_client::{Config, LlmError, LlmProvider, LlmRequest, get_provider};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Speaking rate used to size the narration.
pub const WORDS_PER_MINUTE: f32 = 140.0;

const SYSTEM_PROMPT: &str = "You are a helpful AI teaching assistant.";
const TEMPERATURE: f32 = 0.4;
const MAX_TOKENS: u32 = 1200;
const MAX_ATTEMPTS: u32 = 3;

/// Learning objectives split by importance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicTiers {
    /// Main topic and everything essential to it
    #[serde(default)]
    pub tier_1: Vec<String>,
    /// Helpful supporting topics
    #[serde(default)]
    pub tier_2: Vec<String>,
    /// Background topics
    #[serde(default)]
    pub tier_3: Vec<String>,
}

impl TopicTiers {
    pub fn is_empty(&self) -> bool {
        self.tier_1.is_empty() && self.tier_2.is_empty() && self.tier_3.is_empty()
    }
}

/// Beginner-sized steps for one topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicSteps {
    pub topic: String,
    pub steps: Vec<String>,
}

/// Lesson text for one topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicLesson {
    pub topic: String,
    pub text: String,
}

/// Connect to the completion provider for `preset` (or the configured default).
pub fn connect(preset: Option<&str>) -> Result<Box<dyn LlmProvider>> {
    let config = Config::load().context("Failed to load LLM configuration")?;

    let preset_name = preset.unwrap_or_else(|| config.get_default_for_program("lesson-video"));
    let preset = config
        .get_preset(preset_name)
        .with_context(|| format!("Unknown preset: {}", preset_name))?;

    let provider = get_provider(preset, config.get_provider_config(&preset.provider))
        .with_context(|| {
            format!(
                "Failed to initialize provider '{}' for preset '{}'",
                preset.provider, preset_name
            )
        })?;
    provider.is_available()?;

    debug!("Using LLM provider: {} (model: {})", provider.name(), preset.model);
    Ok(provider)
}

/// Runs the lesson stages against one provider.
pub struct LessonPlanner<'a> {
    provider: &'a dyn LlmProvider,
    retry_delay: Duration,
}

impl<'a> LessonPlanner<'a> {
    pub fn new(provider: &'a dyn LlmProvider) -> Self {
        Self {
            provider,
            retry_delay: Duration::from_secs(2),
        }
    }

    /// Base delay between attempts after a transient provider error.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    async fn complete(&self, prompt: String, max_tokens: u32) -> Result<String> {
        let request = LlmRequest::new(prompt)
            .with_system_prompt(SYSTEM_PROMPT)
            .with_temperature(TEMPERATURE)
            .with_max_tokens(max_tokens);

        let mut attempt = 1;
        loop {
            match self.provider.complete(request.clone()).await {
                Ok(response) => return Ok(response.content.trim().to_string()),
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    let delay = match &e {
                        LlmError::RateLimited {
                            retry_after: Some(secs),
                        } => Duration::from_secs(*secs),
                        _ => self.retry_delay * attempt,
                    };
                    warn!(
                        "{} request failed ({}), retrying in {:?}",
                        self.provider.name(),
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e).context("LLM request failed"),
            }
        }
    }

    /// Split a learning prompt into topic tiers.
    pub async fn discover(&self, prompt: &str) -> Result<TopicTiers> {
        let reply = self.complete(prompts::discovery(prompt), MAX_TOKENS).await?;
        match serde_json::from_str(strip_code_fence(&reply)) {
            Ok(tiers) => Ok(tiers),
            Err(e) => {
                warn!("Could not parse topic tiers ({}); raw reply: {}", e, reply);
                Ok(TopicTiers::default())
            }
        }
    }

    /// Break tier 1 and tier 2 topics into teachable steps.
    pub async fn simplify(&self, tiers: &TopicTiers) -> Result<Vec<TopicSteps>> {
        if tiers.tier_1.is_empty() && tiers.tier_2.is_empty() {
            warn!("No topics provided for breakdown");
            return Ok(Vec::new());
        }

        let reply = self.complete(prompts::simplification(tiers), MAX_TOKENS).await?;
        match serde_json::from_str::<Map<String, Value>>(strip_code_fence(&reply)) {
            Ok(map) => Ok(map
                .into_iter()
                .map(|(topic, steps)| TopicSteps {
                    topic,
                    steps: string_list(steps),
                })
                .collect()),
            Err(e) => {
                warn!("Could not parse teaching steps ({}); raw reply: {}", e, reply);
                Ok(Vec::new())
            }
        }
    }

    /// Write a beginner lesson per topic.
    pub async fn teach(&self, steps: &[TopicSteps]) -> Result<Vec<TopicLesson>> {
        let mut lessons = Vec::with_capacity(steps.len());
        for topic in steps {
            let text = self.complete(prompts::teaching(topic), MAX_TOKENS).await?;
            lessons.push(TopicLesson {
                topic: topic.topic.clone(),
                text,
            });
        }
        Ok(lessons)
    }

    /// Rewrite each lesson with reflection prompts and imagery.
    pub async fn engage(&self, lessons: &[TopicLesson]) -> Result<Vec<TopicLesson>> {
        let mut engaged = Vec::with_capacity(lessons.len());
        for lesson in lessons {
            let text = self.complete(prompts::engagement(lesson), MAX_TOKENS).await?;
            engaged.push(TopicLesson {
                topic: lesson.topic.clone(),
                text,
            });
        }
        Ok(engaged)
    }

    /// Write one narration script of about `minutes` spoken length.
    pub async fn write_narration(
        &self,
        lessons: &[TopicLesson],
        minutes: f32,
        extra_context: Option<&str>,
    ) -> Result<String> {
        let target_words = target_words(minutes);
        let prompt = prompts::narration(lessons, minutes, target_words, extra_context);
        // Roughly two tokens per word leaves room for the whole script
        let max_tokens = MAX_TOKENS.max((target_words * 2) as u32);
        let script = self.complete(prompt, max_tokens).await?;
        Ok(limit_words(&script, target_words))
    }

    /// Answer a follow-up question about a lesson.
    pub async fn clarify(&self, question: &str, lesson: &str, context: Option<&Value>) -> Result<String> {
        let context = context.map(Value::to_string);
        self.complete(
            prompts::clarification(question, lesson, context.as_deref()),
            MAX_TOKENS,
        )
        .await
    }
}

/// Words a script of `minutes` should hold.
pub fn target_words(minutes: f32) -> usize {
    (minutes.max(0.0) * WORDS_PER_MINUTE) as usize
}

/// Cut `script` to `max_words`, then back to the last full stop.
///
/// With no full stop in the cut text, `...` is appended instead.
pub fn limit_words(script: &str, max_words: usize) -> String {
    let words: Vec<&str> = script.split_whitespace().collect();
    if words.len() <= max_words {
        return script.trim().to_string();
    }

    let cut = words[..max_words].join(" ");
    match cut.rfind('.') {
        Some(pos) if pos > 0 => cut[..=pos].to_string(),
        _ => format!("{}...", cut),
    }
}

/// Remove a surrounding ``` fence (with optional language tag).
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) if rest[..newline].chars().all(|c| c.is_ascii_alphabetic()) => {
            &rest[newline + 1..]
        }
        _ => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => vec![s],
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}
