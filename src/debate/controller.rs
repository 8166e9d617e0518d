//! Debate Controller
//!
//! Drives a cast through a fixed number of rounds:
//! ROUND 1..=R → each role in cast order → TURN → next history
//!
//! Turns are strictly sequential. An optional deadline stops the debate early
//! and returns what was said so far, tagged as timed out.

use crate::debate::transcript::{Transcript, Utterance};
use crate::debate::turn::{opponent_context, take_turn, DebateBrief};
use crate::error::OrchestrationError;
use crate::generation::GenerationPort;
use crate::roles::{Cast, Role};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What to do when a turn's generation fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Propagate the first failure; the partial transcript is dropped
    #[default]
    Abort,
    /// Record a placeholder line for the failed turn and keep going
    Placeholder,
}

#[derive(Debug, Clone, Default)]
pub struct DebateSettings {
    /// Overall budget for one debate, measured from its first turn
    pub deadline: Option<Duration>,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateStatus {
    Complete,
    TimedOut {
        completed_turns: usize,
        expected_turns: usize,
    },
}

/// Per-turn bookkeeping kept alongside the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnTrace {
    pub round: u32,
    pub speaker: String,
    pub opponent_context: String,
    pub reflections: usize,
    pub substituted: bool,
}

#[derive(Debug, Clone)]
pub struct DebateOutcome {
    pub debate_id: Uuid,
    pub transcript: Transcript,
    pub status: DebateStatus,
    pub turns: Vec<TurnTrace>,
    pub elapsed_ms: u64,
}

impl DebateOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == DebateStatus::Complete
    }

    /// `DebateTimeout` describing a partial debate, if this is one
    pub fn timeout_error(&self) -> Option<OrchestrationError> {
        match self.status {
            DebateStatus::Complete => None,
            DebateStatus::TimedOut {
                completed_turns,
                expected_turns,
            } => Some(OrchestrationError::DebateTimeout {
                completed_turns,
                expected_turns,
            }),
        }
    }
}

pub struct DebateController {
    generator: Arc<dyn GenerationPort>,
    settings: DebateSettings,
}

impl DebateController {
    pub fn new(generator: Arc<dyn GenerationPort>, settings: DebateSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &DebateSettings {
        &self.settings
    }

    /// Run `rounds` full passes of `cast` on top of `seed`.
    ///
    /// A complete outcome holds exactly `seed.len() + rounds * cast.len()` lines.
    pub async fn run_debate(
        &self,
        cast: &Cast,
        rounds: u32,
        brief: &DebateBrief,
        seed: Transcript,
    ) -> Result<DebateOutcome> {
        if cast.is_empty() {
            return Err(OrchestrationError::InvalidCast(
                "a debate needs at least one role".to_string(),
            ));
        }

        let debate_id = Uuid::new_v4();
        let started = Instant::now();
        let deadline = self.settings.deadline.map(|budget| started + budget);
        let expected_turns = rounds as usize * cast.len();

        let mut history = seed;
        let mut turns: Vec<TurnTrace> = Vec::with_capacity(expected_turns);
        let mut timed_out = false;

        info!(
            debate_id = %debate_id,
            cast = ?cast.speaker_names(),
            rounds,
            "Debate starting"
        );

        'rounds: for round in 1..=rounds {
            for role in cast.roles() {
                let turn = match deadline {
                    Some(deadline) => {
                        if Instant::now() >= deadline {
                            timed_out = true;
                            break 'rounds;
                        }
                        match tokio::time::timeout_at(
                            deadline,
                            take_turn(role, brief, &history, self.generator.as_ref()),
                        )
                        .await
                        {
                            Ok(result) => result,
                            Err(_) => {
                                timed_out = true;
                                break 'rounds;
                            }
                        }
                    }
                    None => take_turn(role, brief, &history, self.generator.as_ref()).await,
                };

                match turn {
                    Ok(turn) => {
                        turns.push(TurnTrace {
                            round,
                            speaker: role.name().to_string(),
                            opponent_context: turn.opponent_context,
                            reflections: turn.reflections.len(),
                            substituted: false,
                        });
                        history = turn.history;
                    }
                    Err(e) => {
                        let (next, trace) = self.handle_failure(role, round, &history, e)?;
                        turns.push(trace);
                        history = next;
                    }
                }
            }

            debug!(debate_id = %debate_id, round, lines = history.len(), "Round complete");
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;

        let status = if timed_out {
            warn!(
                debate_id = %debate_id,
                completed_turns = turns.len(),
                expected_turns,
                "Debate deadline exceeded - returning partial transcript"
            );
            DebateStatus::TimedOut {
                completed_turns: turns.len(),
                expected_turns,
            }
        } else {
            info!(debate_id = %debate_id, turns = turns.len(), elapsed_ms, "Debate complete");
            DebateStatus::Complete
        };

        Ok(DebateOutcome {
            debate_id,
            transcript: history,
            status,
            turns,
            elapsed_ms,
        })
    }

    fn handle_failure(
        &self,
        role: &Role,
        round: u32,
        history: &Transcript,
        error: OrchestrationError,
    ) -> Result<(Transcript, TurnTrace)> {
        match self.settings.failure_policy {
            FailurePolicy::Abort => Err(error),
            FailurePolicy::Placeholder => {
                let reason = match &error {
                    OrchestrationError::GenerationFailure { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };

                warn!(
                    speaker = role.name(),
                    round,
                    reason = %reason,
                    "Turn failed - substituting placeholder"
                );

                let trace = TurnTrace {
                    round,
                    speaker: role.name().to_string(),
                    opponent_context: opponent_context(role, history),
                    reflections: 0,
                    substituted: true,
                };
                let placeholder = Utterance::new(role.name(), format!("[no response: {}]", reason));

                Ok((history.with_utterance(placeholder), trace))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::turn::OPENING_STATEMENT;
    use crate::generation::MockGenerator;
    use crate::memory::{InMemoryMemoryStore, MemoryRecord, MemoryStore};
    use crate::roles::RoleId;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every call except the `fail_on`-th (1-based)
    struct FailOnCall {
        fail_on: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationPort for FailOnCall {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_on {
                Err(OrchestrationError::LlmError("quota exceeded".into()))
            } else {
                Ok(format!("reply {}", n))
            }
        }
    }

    struct SlowGenerator {
        delay: Duration,
    }

    #[async_trait]
    impl GenerationPort for SlowGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            Ok("slow reply".into())
        }
    }

    /// Remembers every query it was asked
    #[derive(Default)]
    struct RecordingMemory {
        queries: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MemoryStore for RecordingMemory {
        async fn retrieve(&self, query: &str) -> Result<Vec<MemoryRecord>> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(Vec::new())
        }
    }

    fn controller(generator: Arc<dyn GenerationPort>) -> DebateController {
        DebateController::new(generator, DebateSettings::default())
    }

    fn brief() -> DebateBrief {
        DebateBrief::research("Market Report: Tech bullish")
    }

    #[tokio::test]
    async fn test_two_role_single_round() {
        let controller = controller(Arc::new(MockGenerator::new()));
        let cast = Cast::research(
            Arc::new(InMemoryMemoryStore::new("bull")),
            Arc::new(InMemoryMemoryStore::new("bear")),
        );

        let outcome = controller
            .run_debate(&cast, 1, &brief(), Transcript::new())
            .await
            .unwrap();

        assert!(outcome.is_complete());
        let lines: Vec<String> = outcome
            .transcript
            .entries()
            .iter()
            .map(|u| u.to_string())
            .collect();
        assert_eq!(
            lines,
            vec![
                "Bull Analyst: Bull Analyst argument #1".to_string(),
                "Bear Analyst: Bear Analyst argument #2".to_string(),
            ]
        );
        assert_eq!(outcome.turns[0].opponent_context, OPENING_STATEMENT);
        assert_eq!(outcome.turns[1].opponent_context, lines[0]);
    }

    #[tokio::test]
    async fn test_memory_is_queried_every_turn_with_running_history() {
        let bull_memory = Arc::new(RecordingMemory::default());
        let cast = Cast::research(bull_memory.clone(), Arc::new(InMemoryMemoryStore::new("bear")));

        controller(Arc::new(MockGenerator::new()))
            .run_debate(&cast, 3, &brief(), Transcript::new())
            .await
            .unwrap();

        let queries = bull_memory.queries.lock().unwrap().clone();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0], brief().facts());
        assert!(queries[1].contains("Bear Analyst: "));
        assert!(queries[2].contains("Bear Analyst: Bear Analyst argument #4"));
    }

    #[tokio::test]
    async fn test_turn_count_and_order_over_rounds() {
        let controller = controller(Arc::new(MockGenerator::new()));
        let cast = Cast::risk();

        let outcome = controller
            .run_debate(&cast, 3, &brief(), Transcript::new())
            .await
            .unwrap();

        assert_eq!(outcome.transcript.len(), 9);
        let expected: Vec<&str> = std::iter::repeat(cast.speaker_names())
            .take(3)
            .flatten()
            .collect();
        assert_eq!(outcome.transcript.speakers(), expected);

        let rounds: Vec<u32> = outcome.turns.iter().map(|t| t.round).collect();
        assert_eq!(rounds, vec![1, 1, 1, 2, 2, 2, 3, 3, 3]);
    }

    #[tokio::test]
    async fn test_zero_rounds_returns_seed_unchanged() {
        let generator = Arc::new(MockGenerator::new());
        let controller = controller(generator.clone());
        let seed = Transcript::from_entries(vec![Utterance::new("Moderator", "Opening remarks")]);

        let outcome = controller
            .run_debate(&Cast::risk(), 0, &brief(), seed.clone())
            .await
            .unwrap();

        assert_eq!(outcome.transcript, seed);
        assert!(outcome.is_complete());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_seed_lines_are_kept_in_front() {
        let controller = controller(Arc::new(MockGenerator::new()));
        let seed = Transcript::from_entries(vec![Utterance::new("Moderator", "Opening remarks")]);

        let outcome = controller
            .run_debate(&Cast::risk(), 2, &brief(), seed)
            .await
            .unwrap();

        assert_eq!(outcome.transcript.len(), 1 + 2 * 3);
        assert_eq!(outcome.transcript.entries()[0].speaker, "Moderator");
        assert_eq!(outcome.turns[0].opponent_context, "Moderator: Opening remarks");
    }

    #[tokio::test]
    async fn test_monologue() {
        let controller = controller(Arc::new(MockGenerator::new()));
        let cast = Cast::new(vec![Role::new(RoleId::Bull)]);

        let outcome = controller
            .run_debate(&cast, 4, &brief(), Transcript::new())
            .await
            .unwrap();

        assert_eq!(outcome.transcript.len(), 4);
        assert!(outcome
            .transcript
            .entries()
            .iter()
            .all(|u| u.speaker == "Bull Analyst"));
        assert!(outcome
            .turns
            .iter()
            .all(|t| t.opponent_context == OPENING_STATEMENT));
    }

    #[tokio::test]
    async fn test_empty_cast_is_rejected() {
        let controller = controller(Arc::new(MockGenerator::new()));
        let err = controller
            .run_debate(&Cast::default(), 1, &brief(), Transcript::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::InvalidCast(_)));
    }

    #[tokio::test]
    async fn test_abort_policy_propagates_first_failure() {
        let generator = Arc::new(FailOnCall {
            fail_on: 2,
            calls: AtomicUsize::new(0),
        });
        let controller = controller(generator.clone());

        let err = controller
            .run_debate(&Cast::risk(), 2, &brief(), Transcript::new())
            .await
            .unwrap_err();

        match err {
            OrchestrationError::GenerationFailure { role, prompt, .. } => {
                assert_eq!(role, "Safe Analyst");
                assert!(prompt.contains("Risky Analyst: reply 1"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_placeholder_policy_keeps_turn_count() {
        let generator = Arc::new(FailOnCall {
            fail_on: 2,
            calls: AtomicUsize::new(0),
        });
        let controller = DebateController::new(
            generator,
            DebateSettings {
                deadline: None,
                failure_policy: FailurePolicy::Placeholder,
            },
        );

        assert_eq!(controller.settings().failure_policy, FailurePolicy::Placeholder);

        let outcome = controller
            .run_debate(&Cast::risk(), 1, &brief(), Transcript::new())
            .await
            .unwrap();

        assert_eq!(outcome.transcript.len(), 3);
        let safe = &outcome.transcript.entries()[1];
        assert_eq!(safe.speaker, "Safe Analyst");
        assert!(safe.text.starts_with("[no response:"));
        assert!(outcome.turns[1].substituted);
        assert_eq!(outcome.transcript.entries()[2].text, "reply 3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_returns_partial_transcript() {
        let controller = DebateController::new(
            Arc::new(SlowGenerator {
                delay: Duration::from_millis(40),
            }),
            DebateSettings {
                deadline: Some(Duration::from_millis(100)),
                failure_policy: FailurePolicy::Abort,
            },
        );

        let outcome = controller
            .run_debate(&Cast::risk(), 5, &brief(), Transcript::new())
            .await
            .unwrap();

        assert!(!outcome.is_complete());
        match outcome.status {
            DebateStatus::TimedOut {
                completed_turns,
                expected_turns,
            } => {
                assert_eq!(expected_turns, 15);
                assert_eq!(completed_turns, 2);
                assert_eq!(completed_turns, outcome.transcript.len());
            }
            DebateStatus::Complete => panic!("debate should have timed out"),
        }
        assert!(matches!(
            outcome.timeout_error(),
            Some(OrchestrationError::DebateTimeout { .. })
        ));
    }
}
