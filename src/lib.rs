//! Debate Trading Orchestrator
//!
//! Turns four analyst reports about a subject into a trading decision by
//! running LLM-backed roles through two structured debates:
//! - Bull and Bear argue the research case, each with private memory
//! - A research manager judges the debate and writes an investment plan
//! - A trader turns the plan into a proposal with a BUY/SELL/HOLD token
//! - Risky, Safe and Neutral analysts debate the proposal
//! - A portfolio manager issues the final decision
//!
//! PIPELINE:
//! RESEARCH DEBATE → JUDGMENT → TRADE PROPOSAL → RISK DEBATE → PORTFOLIO DECISION

pub mod config;
pub mod debate;
pub mod decision;
pub mod error;
pub mod fingerprint;
pub mod generation;
pub mod memory;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod roles;

pub use error::Result;

// Re-export common types
pub use config::Settings;
pub use debate::{DebateController, DebateOutcome, DebateSettings, FailurePolicy, Transcript};
pub use decision::{extract_decision, DecisionExtractor};
pub use generation::{GenerationPort, MockGenerator};
pub use memory::{InMemoryMemoryStore, MemoryRecord, MemoryStore};
pub use models::*;
pub use pipeline::{Pipeline, PipelineConfig, PipelinePorts, Stage};
pub use roles::{Cast, Role, RoleId};
