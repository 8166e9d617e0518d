//! Debate transcript
//!
//! Append-only sequence of utterances. Appending never mutates the receiver:
//! `with_utterance` returns the next transcript.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One line of debate: who spoke and what they said
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: String,
    pub text: String,
}

impl Utterance {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.speaker, self.text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<Utterance>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transcript pre-seeded with earlier lines
    pub fn from_entries(entries: Vec<Utterance>) -> Self {
        Self { entries }
    }

    pub fn with_utterance(&self, utterance: Utterance) -> Transcript {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.extend_from_slice(&self.entries);
        entries.push(utterance);
        Transcript { entries }
    }

    pub fn entries(&self) -> &[Utterance] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Utterance> {
        self.entries.last()
    }

    /// Most recent utterance by anyone other than `speaker`
    pub fn last_not_by(&self, speaker: &str) -> Option<&Utterance> {
        self.entries.iter().rev().find(|u| u.speaker != speaker)
    }

    /// One speaker's lines, in order
    pub fn by_speaker<'a>(&'a self, speaker: &'a str) -> impl Iterator<Item = &'a Utterance> + 'a {
        self.entries.iter().filter(move |u| u.speaker == speaker)
    }

    pub fn speakers(&self) -> Vec<&str> {
        self.entries.iter().map(|u| u.speaker.as_str()).collect()
    }

    /// Newline-joined `"speaker: text"` lines
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(Utterance::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
