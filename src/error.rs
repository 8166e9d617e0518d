//! Error types for the debate trading orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Generation
    // =============================

    /// A single Generation Port call failed (transport, status, timeout, empty body)
    #[error("LLM error: {0}")]
    LlmError(String),

    /// A turn gave up after the port failed; carries who was speaking and what was asked
    #[error("Generation failure for {role}: {reason}")]
    GenerationFailure {
        role: String,
        prompt: String,
        reason: String,
    },

    // =============================
    // Memory
    // =============================

    #[error("Memory retrieval failure: {0}")]
    MemoryRetrievalFailure(String),

    // =============================
    // Pipeline contracts
    // =============================

    #[error("Missing field '{field}' required by stage '{stage}'")]
    MissingField { stage: String, field: String },

    #[error("Contract violation in stage '{stage}' on field '{field}': {reason}")]
    ContractViolation {
        stage: String,
        field: String,
        reason: String,
    },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // =============================
    // Debate
    // =============================

    #[error("Invalid cast: {0}")]
    InvalidCast(String),

    #[error("Debate deadline exceeded after {completed_turns} of {expected_turns} turns")]
    DebateTimeout {
        completed_turns: usize,
        expected_turns: usize,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OrchestrationError {
    /// Transient failures that a bounded retry may fix
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrchestrationError::LlmError(_) | OrchestrationError::HttpError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(OrchestrationError::LlmError("quota".into()).is_retryable());
        assert!(!OrchestrationError::MissingField {
            stage: "judgment".into(),
            field: "research_debate_transcript".into(),
        }
        .is_retryable());
        assert!(!OrchestrationError::InvalidCast("empty".into()).is_retryable());
    }

    #[test]
    fn test_missing_field_message_names_stage_and_field() {
        let err = OrchestrationError::MissingField {
            stage: "portfolio_decision".into(),
            field: "risk_debate_transcript".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("portfolio_decision"));
        assert!(msg.contains("risk_debate_transcript"));
    }
}
