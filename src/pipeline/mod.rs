//! Pipeline stages and assembler
//!
//! A stage declares the record fields it reads and writes. The assembler
//! checks those contracts before any record runs, then folds every record
//! through the stages in order:
//!
//! RESEARCH DEBATE → JUDGMENT → TRADE PROPOSAL → RISK DEBATE → PORTFOLIO DECISION

use crate::error::OrchestrationError;
use crate::models::Record;
use crate::Result;
use async_trait::async_trait;

pub mod assembler;
pub mod stages;

pub use assembler::{validate_topology, Pipeline, PipelineConfig, PipelinePorts};
pub use stages::{
    JudgmentStage, PortfolioDecisionStage, ResearchDebateStage, RiskDebateStage,
    TradeProposalStage,
};

/// Static input/output field contract of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldContract {
    pub inputs: &'static [&'static str],
    pub outputs: &'static [&'static str],
}

/// Trait for a named, field-contracted record transformation
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn contract(&self) -> FieldContract;

    /// Produce the stage's new fields. Never sees undeclared inputs.
    async fn run(&self, input: StageInput<'_>) -> Result<StageOutput>;
}

/// Read-only view of a record limited to a stage's declared inputs
pub struct StageInput<'a> {
    stage: &'static str,
    declared: &'static [&'static str],
    record: &'a Record,
}

impl<'a> StageInput<'a> {
    pub fn new(stage: &'static str, contract: FieldContract, record: &'a Record) -> Self {
        Self {
            stage,
            declared: contract.inputs,
            record,
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn field(&self, name: &str) -> Result<&'a str> {
        if !self.declared.contains(&name) {
            return Err(OrchestrationError::ContractViolation {
                stage: self.stage.to_string(),
                field: name.to_string(),
                reason: "read of an undeclared input".to_string(),
            });
        }

        self.record
            .get(name)
            .ok_or_else(|| OrchestrationError::MissingField {
                stage: self.stage.to_string(),
                field: name.to_string(),
            })
    }
}

/// New fields produced by a stage, optionally flagged as interrupted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutput {
    fields: Vec<(String, String)>,
    interruption: Option<String>,
}

impl StageOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push((name.to_string(), value.into()));
        self
    }

    /// Mark the output as partial; the record stops after this stage
    pub fn interrupted(mut self, reason: impl Into<String>) -> Self {
        self.interruption = Some(reason.into());
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn is_interrupted(&self) -> bool {
        self.interruption.is_some()
    }

    pub fn into_parts(self) -> (Vec<(String, String)>, Option<String>) {
        (self.fields, self.interruption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: FieldContract = FieldContract {
        inputs: &["research_plan"],
        outputs: &["trade_proposal"],
    };

    #[test]
    fn test_stage_input_reads_declared_field() {
        let record = Record::new().with_field("research_plan", "HOLD");
        let input = StageInput::new("trade_proposal", CONTRACT, &record);
        assert_eq!(input.field("research_plan").unwrap(), "HOLD");
    }

    #[test]
    fn test_stage_input_refuses_undeclared_field() {
        let record = Record::new()
            .with_field("research_plan", "HOLD")
            .with_field("subject_id", "AI_CORP");
        let input = StageInput::new("trade_proposal", CONTRACT, &record);
        assert!(matches!(
            input.field("subject_id"),
            Err(OrchestrationError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_stage_input_absent_declared_field() {
        let record = Record::new();
        let input = StageInput::new("trade_proposal", CONTRACT, &record);
        assert!(matches!(
            input.field("research_plan"),
            Err(OrchestrationError::MissingField { .. })
        ));
    }

    #[test]
    fn test_stage_output_builder() {
        let output = StageOutput::new()
            .with("trade_proposal", "text")
            .interrupted("deadline");
        assert!(output.is_interrupted());
        let (fields, reason) = output.into_parts();
        assert_eq!(fields.len(), 1);
        assert_eq!(reason.as_deref(), Some("deadline"));
    }
}
