//! Turn Function
//!
//! One role speaks once: recall reflections, find the opponent's last line,
//! assemble the prompt, call the Generation Port exactly once, and return the
//! transcript with one more line. No state outside the arguments is touched.

use crate::debate::transcript::{Transcript, Utterance};
use crate::generation::{generate_as, GenerationPort};
use crate::memory::MemoryRecord;
use crate::roles::Role;
use crate::Result;
use tracing::{debug, warn};

/// Opponent context when nobody else has spoken yet
pub const OPENING_STATEMENT: &str = "None (you are making the opening statement)";

const EMPTY_HISTORY: &str = "(Empty)";
const NO_REFLECTIONS: &str = "None";

/// Read-only task facts shared by every role in one debate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebateBrief {
    heading: String,
    facts: String,
    closing: String,
}

impl DebateBrief {
    pub fn new(
        heading: impl Into<String>,
        facts: impl Into<String>,
        closing: impl Into<String>,
    ) -> Self {
        Self {
            heading: heading.into(),
            facts: facts.into(),
            closing: closing.into(),
        }
    }

    /// Bull/Bear debate over the combined analyst reports
    pub fn research(analysis_summary: &str) -> Self {
        Self::new(
            "Here is the analysis",
            analysis_summary,
            "Based on all this information, present your argument conversationally:",
        )
    }

    /// Risk debate over the trader's proposal
    pub fn risk(trade_proposal: &str) -> Self {
        Self::new(
            "Here is the investment plan to be debated",
            trade_proposal,
            "Critique or support the plan from your unique perspective and respond to your colleagues:",
        )
    }

    pub fn heading(&self) -> &str {
        &self.heading
    }

    pub fn facts(&self) -> &str {
        &self.facts
    }

    pub fn closing(&self) -> &str {
        &self.closing
    }
}

/// Everything one turn produced
#[derive(Debug, Clone)]
pub struct Turn {
    pub utterance: Utterance,
    pub history: Transcript,
    pub opponent_context: String,
    pub reflections: Vec<MemoryRecord>,
    pub prompt: String,
}

pub async fn take_turn(
    role: &Role,
    brief: &DebateBrief,
    history: &Transcript,
    generator: &dyn GenerationPort,
) -> Result<Turn> {
    let query = retrieval_query(brief, history);
    let reflections = recall(role, &query).await;
    let opponent = opponent_context(role, history);
    let prompt = assemble_prompt(role, brief, &opponent, &reflections, history);

    let text = generate_as(generator, role.name(), prompt.clone()).await?;
    let utterance = Utterance::new(role.name(), text);
    let history = history.with_utterance(utterance.clone());

    debug!(
        speaker = role.name(),
        reflections = reflections.len(),
        history_len = history.len(),
        "Turn complete"
    );

    Ok(Turn {
        utterance,
        history,
        opponent_context: opponent,
        reflections,
        prompt,
    })
}

/// Task facts followed by the running history
pub fn retrieval_query(brief: &DebateBrief, history: &Transcript) -> String {
    if history.is_empty() {
        brief.facts().to_string()
    } else {
        format!("{}\n{}", brief.facts(), history.render())
    }
}

/// The most recent line not spoken by `role`, verbatim
pub fn opponent_context(role: &Role, history: &Transcript) -> String {
    history
        .last_not_by(role.name())
        .map(Utterance::to_string)
        .unwrap_or_else(|| OPENING_STATEMENT.to_string())
}

/// Query the role's private memory; failures degrade to no reflections
async fn recall(role: &Role, query: &str) -> Vec<MemoryRecord> {
    let Some(memory) = role.memory() else {
        return Vec::new();
    };

    match memory.retrieve(query).await {
        Ok(records) => records,
        Err(e) => {
            warn!(
                speaker = role.name(),
                error = %e,
                "Memory retrieval failed - continuing without reflections"
            );
            Vec::new()
        }
    }
}

fn render_reflections(reflections: &[MemoryRecord]) -> String {
    let joined = reflections
        .iter()
        .map(|r| r.summary.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if joined.is_empty() {
        NO_REFLECTIONS.to_string()
    } else {
        joined
    }
}

/// Deterministic prompt layout shared by every debater
pub fn assemble_prompt(
    role: &Role,
    brief: &DebateBrief,
    opponent_context: &str,
    reflections: &[MemoryRecord],
    history: &Transcript,
) -> String {
    let rendered_history = if history.is_empty() {
        EMPTY_HISTORY.to_string()
    } else {
        history.render()
    };

    format!(
        "{instructions}\n\n\
         {heading}:\n{facts}\n\n\
         Conversation history:\n{history}\n\n\
         Your opponent's last argument:\n{opponent}\n\n\
         Reflections from similar past situations:\n{reflections}\n\n\
         {closing}",
        instructions = role.instructions(),
        heading = brief.heading(),
        facts = brief.facts(),
        history = rendered_history,
        opponent = opponent_context,
        reflections = render_reflections(reflections),
        closing = brief.closing(),
    )
}
