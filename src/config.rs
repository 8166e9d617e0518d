//! Runtime settings loaded from the environment (and `.env`)

use crate::debate::{DebateSettings, FailurePolicy};
use crate::error::OrchestrationError;
use crate::generation::RetryPolicy;
use crate::pipeline::PipelineConfig;
use crate::Result;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini_api_key: Option<String>,
    pub quick_thinking_model: String,
    pub deep_thinking_model: String,
    pub research_debate_rounds: u32,
    pub risk_debate_rounds: u32,
    pub max_workers: usize,
    pub generation_timeout: Duration,
    pub generation_max_retries: u32,
    pub generation_retry_backoff: Duration,
    pub debate_deadline: Option<Duration>,
    pub failure_policy: FailurePolicy,
    pub memory_seed_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            quick_thinking_model: "gemini-2.0-flash".to_string(),
            deep_thinking_model: "gemini-2.5-pro".to_string(),
            research_debate_rounds: 1,
            risk_debate_rounds: 1,
            max_workers: 10,
            generation_timeout: Duration::from_secs(60),
            generation_max_retries: 2,
            generation_retry_backoff: Duration::from_millis(500),
            debate_deadline: None,
            failure_policy: FailurePolicy::Abort,
            memory_seed_path: None,
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let failure_policy = match get("DEBATE_FAILURE_POLICY") {
            None => defaults.failure_policy,
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "abort" => FailurePolicy::Abort,
                "placeholder" => FailurePolicy::Placeholder,
                _ => {
                    return Err(OrchestrationError::ConfigError(format!(
                        "DEBATE_FAILURE_POLICY must be 'abort' or 'placeholder', got '{}'",
                        raw
                    )))
                }
            },
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            quick_thinking_model: get("QUICK_THINKING_MODEL")
                .unwrap_or(defaults.quick_thinking_model),
            deep_thinking_model: get("DEEP_THINKING_MODEL")
                .unwrap_or(defaults.deep_thinking_model),
            research_debate_rounds: parse_or(
                "RESEARCH_DEBATE_ROUNDS",
                get("RESEARCH_DEBATE_ROUNDS"),
                defaults.research_debate_rounds,
            )?,
            risk_debate_rounds: parse_or(
                "RISK_DEBATE_ROUNDS",
                get("RISK_DEBATE_ROUNDS"),
                defaults.risk_debate_rounds,
            )?,
            max_workers: parse_or("MAX_WORKERS", get("MAX_WORKERS"), defaults.max_workers)?
                .max(1),
            generation_timeout: Duration::from_secs(parse_or(
                "GENERATION_TIMEOUT_SECS",
                get("GENERATION_TIMEOUT_SECS"),
                defaults.generation_timeout.as_secs(),
            )?),
            generation_max_retries: parse_or(
                "GENERATION_MAX_RETRIES",
                get("GENERATION_MAX_RETRIES"),
                defaults.generation_max_retries,
            )?,
            generation_retry_backoff: Duration::from_millis(parse_or(
                "GENERATION_RETRY_BACKOFF_MS",
                get("GENERATION_RETRY_BACKOFF_MS"),
                defaults.generation_retry_backoff.as_millis() as u64,
            )?),
            debate_deadline: get("DEBATE_DEADLINE_SECS")
                .map(|raw| parse_value::<u64>("DEBATE_DEADLINE_SECS", &raw))
                .transpose()?
                .map(Duration::from_secs),
            failure_policy,
            memory_seed_path: get("MEMORY_SEED_PATH").map(PathBuf::from),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.generation_max_retries,
            initial_backoff: self.generation_retry_backoff,
            call_timeout: self.generation_timeout,
            ..RetryPolicy::default()
        }
    }

    pub fn debate_settings(&self) -> DebateSettings {
        DebateSettings {
            deadline: self.debate_deadline,
            failure_policy: self.failure_policy,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            research_rounds: self.research_debate_rounds,
            risk_rounds: self.risk_debate_rounds,
            max_workers: self.max_workers,
            debate: self.debate_settings(),
        }
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse::<T>().map_err(|_| {
        OrchestrationError::ConfigError(format!("{} has an invalid value '{}'", key, raw))
    })
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}
