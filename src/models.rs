//! Core data models for the decision pipeline

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

use crate::error::OrchestrationError;
use crate::Result;

//
// ================= Field names =================
//

/// Record field names shared by the stage contracts
pub mod fields {
    pub const SUBJECT_ID: &str = "subject_id";
    pub const MARKET_REPORT: &str = "market_report";
    pub const NEWS_REPORT: &str = "news_report";
    pub const SOCIAL_REPORT: &str = "social_report";
    pub const FUNDAMENTALS_REPORT: &str = "fundamentals_report";

    pub const ANALYSIS_SUMMARY: &str = "analysis_summary";
    pub const RESEARCH_DEBATE_TRANSCRIPT: &str = "research_debate_transcript";
    pub const RESEARCH_PLAN: &str = "research_plan";
    pub const TRADE_PROPOSAL: &str = "trade_proposal";
    pub const FINAL_PROPOSAL_TOKEN: &str = "final_proposal_token";
    pub const RISK_DEBATE_TRANSCRIPT: &str = "risk_debate_transcript";
    pub const FINAL_DECISION_TEXT: &str = "final_decision_text";
    pub const FINAL_DECISION_TOKEN: &str = "final_decision_token";

    /// Minimum fields a record must carry when it enters the pipeline
    pub const INPUT_SCHEMA: &[&str] = &[
        SUBJECT_ID,
        MARKET_REPORT,
        NEWS_REPORT,
        SOCIAL_REPORT,
        FUNDAMENTALS_REPORT,
    ];
}

//
// ================= Decision token =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionToken {
    Buy,
    Sell,
    Hold,
    Unknown,
}

impl DecisionToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionToken::Buy => "BUY",
            DecisionToken::Sell => "SELL",
            DecisionToken::Hold => "HOLD",
            DecisionToken::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DecisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Record =================
//

/// Per-subject state flowing through the pipeline.
///
/// Fields keep insertion order and are additive only: `extend` refuses to
/// overwrite an existing field and always returns a new record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builder used at pipeline entry. A repeated name replaces the earlier value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    pub fn subject_id(&self) -> Option<&str> {
        self.get(fields::SUBJECT_ID)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Produce a new record with `additions` appended after the existing fields
    pub fn extend(&self, stage: &str, additions: Vec<(String, String)>) -> Result<Record> {
        let mut next = self.clone();
        for (name, value) in additions {
            if next.contains(&name) {
                return Err(OrchestrationError::ContractViolation {
                    stage: stage.to_string(),
                    field: name,
                    reason: "field already present; records are additive only".to_string(),
                });
            }
            next.fields.push((name, value));
        }
        Ok(next)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of string fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Record, A::Error> {
        let mut record = Record::new();
        while let Some((k, v)) = access.next_entry::<String, String>()? {
            record = record.with_field(k, v);
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Record, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

//
// ================= Outcome =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RecordStatus {
    Complete,
    /// A debate ran out of time; its partial transcript is in the record
    Incomplete { stage: String, reason: String },
    Failed { stage: String, error: String },
}

impl RecordStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, RecordStatus::Complete)
    }
}

/// What the batch runner reports for every input record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub run_id: Uuid,
    pub subject_id: Option<String>,
    /// Output of the last successfully completed stage (plus any partial debate)
    pub record: Record,
    #[serde(flatten)]
    pub status: RecordStatus,
    pub completed_stages: Vec<String>,
    pub input_fingerprint: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_preserves_insertion_order() {
        let record = Record::new()
            .with_field("subject_id", "AI_CORP")
            .with_field("market_report", "bullish")
            .with_field("news_report", "breakthrough");

        let names: Vec<&str> = record.field_names().collect();
        assert_eq!(names, vec!["subject_id", "market_report", "news_report"]);
        assert_eq!(record.subject_id(), Some("AI_CORP"));
    }

    #[test]
    fn test_extend_is_additive_and_leaves_input_untouched() {
        let record = Record::new().with_field("subject_id", "AI_CORP");
        let next = record
            .extend("judgment", vec![("research_plan".into(), "HOLD".into())])
            .unwrap();

        assert_eq!(record.len(), 1);
        assert_eq!(next.len(), 2);
        assert_eq!(next.get("research_plan"), Some("HOLD"));
    }

    #[test]
    fn test_extend_rejects_overwrite() {
        let record = Record::new().with_field("subject_id", "AI_CORP");
        let err = record
            .extend("rogue", vec![("subject_id".into(), "OTHER".into())])
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::ContractViolation { .. }));
    }

    #[test]
    fn test_record_json_keeps_field_order() {
        let json = r#"{"subject_id":"X","zeta":"1","alpha":"2"}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = record.field_names().collect();
        assert_eq!(names, vec!["subject_id", "zeta", "alpha"]);
        assert_eq!(serde_json::to_string(&record).unwrap(), json);
    }

    #[test]
    fn test_decision_token_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&DecisionToken::Hold).unwrap(), "\"HOLD\"");
        assert_eq!(DecisionToken::Unknown.to_string(), "UNKNOWN");
    }
}
