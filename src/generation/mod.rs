//! Generation Port and implementations
//!
//! The core only needs `generate(prompt) -> text`. Latency, determinism and
//! model choice are the implementation's business.

use crate::decision::{DECISION_MARKER, PROPOSAL_MARKER};
use crate::error::OrchestrationError;
use crate::models::DecisionToken;
use crate::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub mod gemini;
pub mod retry;

pub use gemini::GeminiClient;
pub use retry::{ResilientGenerator, RetryPolicy};

/// Trait for text generation (LLM controlled)
#[async_trait]
pub trait GenerationPort: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Call the port once on behalf of `role`.
///
/// Trims the reply; a port error or an empty reply becomes a
/// `GenerationFailure` carrying the role and the attempted prompt.
pub async fn generate_as(
    port: &dyn GenerationPort,
    role: &str,
    prompt: String,
) -> Result<String> {
    let reason = match port.generate(&prompt).await {
        Ok(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
            "empty response".to_string()
        }
        Err(e) => e.to_string(),
    };

    Err(OrchestrationError::GenerationFailure {
        role: role.to_string(),
        prompt,
        reason,
    })
}

/// Mock generator for development & testing
/// Keeps the pipeline runnable without an LLM dependency.
///
/// Replies are keyed off the first line of the prompt (the role header) and
/// every prompt is captured for inspection.
pub struct MockGenerator {
    decision: DecisionToken,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            decision: DecisionToken::Hold,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Token the trader and portfolio manager replies will carry
    pub fn with_decision(mut self, decision: DecisionToken) -> Self {
        self.decision = decision;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    fn canned_reply(&self, prompt: &str, call: usize) -> String {
        let header = prompt
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("");
        let token = self.decision.as_str();

        if header.contains("Trading Agent") {
            format!(
                "Enter on pullbacks and keep a stop-loss 8% below entry.\n{} **{}**",
                PROPOSAL_MARKER, token
            )
        } else if header.contains("Portfolio Manager") {
            format!(
                "The plan holds up against the risks raised in the debate.\n{} **{}**",
                DECISION_MARKER, token
            )
        } else if header.contains("Research Manager") {
            format!(
                "Recommendation: {}. Plan: size the position conservatively and reassess after earnings.",
                token
            )
        } else {
            let speaker = header
                .trim_start_matches("ROLE:")
                .trim()
                .trim_end_matches('.');
            format!("{} argument #{}", speaker, call)
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationPort for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        Ok(self.canned_reply(prompt, call))
    }
}
