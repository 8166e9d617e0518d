//! Decision Extractor
//!
//! Reduces a free-form proposal to one canonical token:
//! - Finds the FIRST line containing the marker
//! - Checks the emphasised tokens in fixed precedence: BUY > SELL > HOLD
//! - Anything else is UNKNOWN (a valid classification, never an error)

use crate::models::DecisionToken;

/// Marker the trader is instructed to end its proposal with
pub const PROPOSAL_MARKER: &str = "FINAL TRANSACTION PROPOSAL:";

/// Marker the portfolio manager is instructed to end its decision with
pub const DECISION_MARKER: &str = "FINAL DECISION:";

/// Precedence order, checked top to bottom
const EMPHASISED_TOKENS: &[(&str, DecisionToken)] = &[
    ("**BUY**", DecisionToken::Buy),
    ("**SELL**", DecisionToken::Sell),
    ("**HOLD**", DecisionToken::Hold),
];

/// Marker-driven extractor
#[derive(Debug, Clone, Copy)]
pub struct DecisionExtractor {
    marker: &'static str,
}

impl DecisionExtractor {
    pub const fn new(marker: &'static str) -> Self {
        Self { marker }
    }

    pub fn marker(&self) -> &'static str {
        self.marker
    }

    /// Total: every input maps to exactly one token
    pub fn extract(&self, text: &str) -> DecisionToken {
        let Some(line) = text.lines().find(|line| line.contains(self.marker)) else {
            return DecisionToken::Unknown;
        };

        EMPHASISED_TOKENS
            .iter()
            .find(|(needle, _)| line.contains(needle))
            .map(|(_, token)| *token)
            .unwrap_or(DecisionToken::Unknown)
    }
}

impl Default for DecisionExtractor {
    fn default() -> Self {
        Self::new(PROPOSAL_MARKER)
    }
}

/// Extract the trader's proposal token
pub fn extract_decision(text: &str) -> DecisionToken {
    DecisionExtractor::default().extract(text)
}
