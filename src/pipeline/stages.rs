//! The five stages of the standard topology

use crate::debate::{DebateBrief, DebateController, DebateOutcome, Transcript};
use crate::decision::{extract_decision, DecisionExtractor, DECISION_MARKER};
use crate::generation::{generate_as, GenerationPort};
use crate::models::fields;
use crate::pipeline::{FieldContract, Stage, StageInput, StageOutput};
use crate::roles::{Cast, Role, RoleId};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Combined analyst reports the research debate argues over
pub fn analysis_summary(market: &str, news: &str, social: &str, fundamentals: &str) -> String {
    format!(
        "Market Report: {}\nNews Report: {}\nSocial Media Sentiment: {}\nFundamentals Report: {}",
        market, news, social, fundamentals
    )
}

/// Transcript field plus an interruption marker when the debate ran out of time
fn debate_output(output: StageOutput, field: &str, outcome: DebateOutcome) -> StageOutput {
    let interruption = outcome.timeout_error();
    let output = output.with(field, outcome.transcript.render());
    match interruption {
        Some(e) => output.interrupted(e.to_string()),
        None => output,
    }
}

//
// ================= Research debate =================
//

pub struct ResearchDebateStage {
    controller: Arc<DebateController>,
    cast: Cast,
    rounds: u32,
}

impl ResearchDebateStage {
    pub fn new(controller: Arc<DebateController>, cast: Cast, rounds: u32) -> Self {
        Self {
            controller,
            cast,
            rounds,
        }
    }
}

#[async_trait]
impl Stage for ResearchDebateStage {
    fn name(&self) -> &'static str {
        "research_debate"
    }

    fn contract(&self) -> FieldContract {
        FieldContract {
            inputs: &[
                fields::MARKET_REPORT,
                fields::NEWS_REPORT,
                fields::SOCIAL_REPORT,
                fields::FUNDAMENTALS_REPORT,
            ],
            outputs: &[fields::ANALYSIS_SUMMARY, fields::RESEARCH_DEBATE_TRANSCRIPT],
        }
    }

    async fn run(&self, input: StageInput<'_>) -> Result<StageOutput> {
        let summary = analysis_summary(
            input.field(fields::MARKET_REPORT)?,
            input.field(fields::NEWS_REPORT)?,
            input.field(fields::SOCIAL_REPORT)?,
            input.field(fields::FUNDAMENTALS_REPORT)?,
        );

        let outcome = self
            .controller
            .run_debate(
                &self.cast,
                self.rounds,
                &DebateBrief::research(&summary),
                Transcript::new(),
            )
            .await?;

        let output = StageOutput::new().with(fields::ANALYSIS_SUMMARY, summary);
        Ok(debate_output(output, fields::RESEARCH_DEBATE_TRANSCRIPT, outcome))
    }
}

//
// ================= Judgment =================
//

pub struct JudgmentStage {
    generator: Arc<dyn GenerationPort>,
    role: Role,
}

impl JudgmentStage {
    pub fn new(generator: Arc<dyn GenerationPort>) -> Self {
        Self {
            generator,
            role: Role::new(RoleId::ResearchManager),
        }
    }
}

#[async_trait]
impl Stage for JudgmentStage {
    fn name(&self) -> &'static str {
        "judgment"
    }

    fn contract(&self) -> FieldContract {
        FieldContract {
            inputs: &[fields::RESEARCH_DEBATE_TRANSCRIPT],
            outputs: &[fields::RESEARCH_PLAN],
        }
    }

    async fn run(&self, input: StageInput<'_>) -> Result<StageOutput> {
        let prompt = format!(
            "{}\n\nHere is the full debate history:\n{}",
            self.role.instructions(),
            input.field(fields::RESEARCH_DEBATE_TRANSCRIPT)?
        );

        let plan = generate_as(self.generator.as_ref(), self.role.name(), prompt).await?;

        Ok(StageOutput::new().with(fields::RESEARCH_PLAN, plan))
    }
}

//
// ================= Trade proposal =================
//

pub struct TradeProposalStage {
    generator: Arc<dyn GenerationPort>,
    role: Role,
}

impl TradeProposalStage {
    pub fn new(generator: Arc<dyn GenerationPort>) -> Self {
        Self {
            generator,
            role: Role::new(RoleId::Trader),
        }
    }
}

#[async_trait]
impl Stage for TradeProposalStage {
    fn name(&self) -> &'static str {
        "trade_proposal"
    }

    fn contract(&self) -> FieldContract {
        FieldContract {
            inputs: &[fields::RESEARCH_PLAN],
            outputs: &[fields::TRADE_PROPOSAL, fields::FINAL_PROPOSAL_TOKEN],
        }
    }

    async fn run(&self, input: StageInput<'_>) -> Result<StageOutput> {
        let prompt = format!(
            "{}\n---\nProposed Investment Plan:\n{}",
            self.role.instructions(),
            input.field(fields::RESEARCH_PLAN)?
        );

        let proposal = generate_as(self.generator.as_ref(), self.role.name(), prompt).await?;
        let token = extract_decision(&proposal);

        info!(stage = self.name(), token = %token, "Trade proposal extracted");

        Ok(StageOutput::new()
            .with(fields::TRADE_PROPOSAL, proposal)
            .with(fields::FINAL_PROPOSAL_TOKEN, token.as_str()))
    }
}

//
// ================= Risk debate =================
//

pub struct RiskDebateStage {
    controller: Arc<DebateController>,
    cast: Cast,
    rounds: u32,
}

impl RiskDebateStage {
    pub fn new(controller: Arc<DebateController>, cast: Cast, rounds: u32) -> Self {
        Self {
            controller,
            cast,
            rounds,
        }
    }
}

#[async_trait]
impl Stage for RiskDebateStage {
    fn name(&self) -> &'static str {
        "risk_debate"
    }

    fn contract(&self) -> FieldContract {
        FieldContract {
            inputs: &[fields::TRADE_PROPOSAL],
            outputs: &[fields::RISK_DEBATE_TRANSCRIPT],
        }
    }

    async fn run(&self, input: StageInput<'_>) -> Result<StageOutput> {
        let brief = DebateBrief::risk(input.field(fields::TRADE_PROPOSAL)?);

        let outcome = self
            .controller
            .run_debate(&self.cast, self.rounds, &brief, Transcript::new())
            .await?;

        Ok(debate_output(
            StageOutput::new(),
            fields::RISK_DEBATE_TRANSCRIPT,
            outcome,
        ))
    }
}

//
// ================= Portfolio decision =================
//

pub struct PortfolioDecisionStage {
    generator: Arc<dyn GenerationPort>,
    role: Role,
    extractor: DecisionExtractor,
}

impl PortfolioDecisionStage {
    pub fn new(generator: Arc<dyn GenerationPort>) -> Self {
        Self {
            generator,
            role: Role::new(RoleId::PortfolioManager),
            extractor: DecisionExtractor::new(DECISION_MARKER),
        }
    }
}

#[async_trait]
impl Stage for PortfolioDecisionStage {
    fn name(&self) -> &'static str {
        "portfolio_decision"
    }

    fn contract(&self) -> FieldContract {
        FieldContract {
            inputs: &[fields::TRADE_PROPOSAL, fields::RISK_DEBATE_TRANSCRIPT],
            outputs: &[fields::FINAL_DECISION_TEXT, fields::FINAL_DECISION_TOKEN],
        }
    }

    async fn run(&self, input: StageInput<'_>) -> Result<StageOutput> {
        let prompt = format!(
            "{}\n---\nTrader's Investment Plan:\n{}\n\nRisk Debate History:\n{}",
            self.role.instructions(),
            input.field(fields::TRADE_PROPOSAL)?,
            input.field(fields::RISK_DEBATE_TRANSCRIPT)?
        );

        let decision = generate_as(self.generator.as_ref(), self.role.name(), prompt).await?;
        let token = self.extractor.extract(&decision);

        info!(stage = self.name(), token = %token, "Final decision extracted");

        Ok(StageOutput::new()
            .with(fields::FINAL_DECISION_TEXT, decision)
            .with(fields::FINAL_DECISION_TOKEN, token.as_str()))
    }
}
