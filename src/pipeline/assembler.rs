//! Pipeline assembly and the concurrent batch runner

use crate::debate::{DebateController, DebateSettings};
use crate::error::OrchestrationError;
use crate::fingerprint::compute_record_fingerprint;
use crate::generation::GenerationPort;
use crate::memory::MemoryStore;
use crate::models::{fields, Record, RecordOutcome, RecordStatus};
use crate::pipeline::stages::{
    JudgmentStage, PortfolioDecisionStage, ResearchDebateStage, RiskDebateStage,
    TradeProposalStage,
};
use crate::pipeline::{FieldContract, Stage, StageInput, StageOutput};
use crate::roles::Cast;
use crate::Result;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// External collaborators of the standard topology
#[derive(Clone)]
pub struct PipelinePorts {
    /// Debaters and the trader
    pub quick: Arc<dyn GenerationPort>,
    /// Research manager and portfolio manager
    pub deep: Arc<dyn GenerationPort>,
    pub bull_memory: Arc<dyn MemoryStore>,
    pub bear_memory: Arc<dyn MemoryStore>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub research_rounds: u32,
    pub risk_rounds: u32,
    pub max_workers: usize,
    pub debate: DebateSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            research_rounds: 1,
            risk_rounds: 1,
            max_workers: 10,
            debate: DebateSettings::default(),
        }
    }
}

/// Check that every stage input is produced upstream and no field is written twice
pub fn validate_topology(input_schema: &[&str], stages: &[Arc<dyn Stage>]) -> Result<()> {
    let mut available: HashSet<&str> = input_schema.iter().copied().collect();

    for stage in stages {
        let contract = stage.contract();

        for field in contract.inputs {
            if !available.contains(field) {
                return Err(OrchestrationError::MissingField {
                    stage: stage.name().to_string(),
                    field: field.to_string(),
                });
            }
        }

        for field in contract.outputs {
            if !available.insert(*field) {
                return Err(OrchestrationError::ContractViolation {
                    stage: stage.name().to_string(),
                    field: field.to_string(),
                    reason: "field is already produced upstream".to_string(),
                });
            }
        }
    }

    Ok(())
}

/// A validated, ordered sequence of stages
#[derive(Clone)]
pub struct Pipeline {
    input_schema: Arc<Vec<String>>,
    stages: Arc<Vec<Arc<dyn Stage>>>,
    max_workers: usize,
}

impl Pipeline {
    pub fn assemble(
        input_schema: &[&str],
        stages: Vec<Arc<dyn Stage>>,
        max_workers: usize,
    ) -> Result<Self> {
        validate_topology(input_schema, &stages)?;

        info!(
            stages = stages.len(),
            max_workers,
            "Pipeline assembled"
        );

        Ok(Self {
            input_schema: Arc::new(input_schema.iter().map(|f| f.to_string()).collect()),
            stages: Arc::new(stages),
            max_workers: max_workers.max(1),
        })
    }

    /// RESEARCH DEBATE → JUDGMENT → TRADE PROPOSAL → RISK DEBATE → PORTFOLIO DECISION
    pub fn standard(ports: PipelinePorts, config: &PipelineConfig) -> Result<Self> {
        Self::assemble(
            fields::INPUT_SCHEMA,
            standard_stages(ports, config),
            config.max_workers,
        )
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Fold one record through every stage. Never returns an error: failures
    /// are reported in the outcome's status.
    pub async fn run_record(&self, record: Record) -> RecordOutcome {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let input_fingerprint = compute_record_fingerprint(&record);
        let subject_id = record.subject_id().map(str::to_string);

        info!(
            %run_id,
            subject = subject_id.as_deref().unwrap_or("-"),
            "Record run started"
        );

        let mut completed_stages = Vec::new();
        let mut current = record;

        let status = match self.check_input(&current) {
            Err(e) => RecordStatus::Failed {
                stage: "input".to_string(),
                error: e.to_string(),
            },
            Ok(()) => {
                let mut status = RecordStatus::Complete;

                for stage in self.stages.iter() {
                    let contract = stage.contract();
                    let input = StageInput::new(stage.name(), contract, &current);

                    let applied = match stage.run(input).await {
                        Ok(output) => apply_output(stage.name(), contract, &current, output),
                        Err(e) => Err(e),
                    };

                    match applied {
                        Ok((next, None)) => {
                            current = next;
                            completed_stages.push(stage.name().to_string());
                            debug!(%run_id, stage = stage.name(), "Stage complete");
                        }
                        Ok((next, Some(reason))) => {
                            current = next;
                            warn!(%run_id, stage = stage.name(), %reason, "Stage interrupted");
                            status = RecordStatus::Incomplete {
                                stage: stage.name().to_string(),
                                reason,
                            };
                            break;
                        }
                        Err(e) => {
                            warn!(%run_id, stage = stage.name(), error = %e, "Stage failed");
                            status = RecordStatus::Failed {
                                stage: stage.name().to_string(),
                                error: e.to_string(),
                            };
                            break;
                        }
                    }
                }

                status
            }
        };

        info!(
            %run_id,
            complete = status.is_complete(),
            stages = completed_stages.len(),
            "Record run finished"
        );

        RecordOutcome {
            run_id,
            subject_id,
            record: current,
            status,
            completed_stages,
            input_fingerprint,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Run every record with at most `max_workers` in flight. Outcomes come
    /// back in input order, one per record.
    pub async fn run_batch(&self, records: Vec<Record>) -> Vec<RecordOutcome> {
        let total = records.len();
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut join_set = JoinSet::new();

        info!(records = total, max_workers = self.max_workers, "Batch started");

        // Kept so a worker that dies still yields an outcome for its record
        let originals = records.clone();

        for (index, record) in records.into_iter().enumerate() {
            let pipeline = self.clone();
            let semaphore = semaphore.clone();

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, pipeline.run_record(record).await)
            });
        }

        let mut slots: Vec<Option<RecordOutcome>> = (0..total).map(|_| None).collect();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!(error = %e, "Record worker did not finish"),
            }
        }

        let outcomes: Vec<RecordOutcome> = slots
            .into_iter()
            .zip(originals)
            .map(|(slot, original)| slot.unwrap_or_else(|| worker_lost(original)))
            .collect();

        let complete = outcomes.iter().filter(|o| o.status.is_complete()).count();
        info!(records = total, complete, "Batch finished");

        outcomes
    }

    fn check_input(&self, record: &Record) -> Result<()> {
        match self.input_schema.iter().find(|f| !record.contains(f)) {
            Some(missing) => Err(OrchestrationError::InvalidRecord(format!(
                "missing input field '{}'",
                missing
            ))),
            None => Ok(()),
        }
    }
}

/// The five standard stages, wired to their ports
pub fn standard_stages(ports: PipelinePorts, config: &PipelineConfig) -> Vec<Arc<dyn Stage>> {
    let controller = Arc::new(DebateController::new(
        ports.quick.clone(),
        config.debate.clone(),
    ));

    vec![
        Arc::new(ResearchDebateStage::new(
            controller.clone(),
            Cast::research(ports.bull_memory, ports.bear_memory),
            config.research_rounds,
        )),
        Arc::new(JudgmentStage::new(ports.deep.clone())),
        Arc::new(TradeProposalStage::new(ports.quick)),
        Arc::new(RiskDebateStage::new(
            controller,
            Cast::risk(),
            config.risk_rounds,
        )),
        Arc::new(PortfolioDecisionStage::new(ports.deep)),
    ]
}

/// Validate a stage's output against its contract and append it to the record
fn apply_output(
    stage: &str,
    contract: FieldContract,
    record: &Record,
    output: StageOutput,
) -> Result<(Record, Option<String>)> {
    let (additions, interruption) = output.into_parts();

    if let Some((name, _)) = additions
        .iter()
        .find(|(name, _)| !contract.outputs.contains(&name.as_str()))
    {
        return Err(OrchestrationError::ContractViolation {
            stage: stage.to_string(),
            field: name.clone(),
            reason: "output not declared by the stage".to_string(),
        });
    }

    if interruption.is_none() {
        if let Some(missing) = contract
            .outputs
            .iter()
            .find(|f| !additions.iter().any(|(name, _)| name == *f))
        {
            return Err(OrchestrationError::ContractViolation {
                stage: stage.to_string(),
                field: missing.to_string(),
                reason: "declared output was not produced".to_string(),
            });
        }
    }

    let next = record.extend(stage, additions)?;
    Ok((next, interruption))
}

fn worker_lost(record: Record) -> RecordOutcome {
    let now = Utc::now();
    RecordOutcome {
        run_id: Uuid::new_v4(),
        subject_id: record.subject_id().map(str::to_string),
        input_fingerprint: compute_record_fingerprint(&record),
        record,
        status: RecordStatus::Failed {
            stage: "worker".to_string(),
            error: "record task panicked or was cancelled".to_string(),
        },
        completed_stages: Vec::new(),
        started_at: now,
        finished_at: now,
    }
}
