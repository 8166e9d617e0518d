//! Turn-based debate engine
//!
//! Several roles take turns around one growing transcript. Each turn gets
//! fresh reflections from the speaker's memory and the opponent's last line.

pub mod controller;
pub mod transcript;
pub mod turn;

pub use controller::{
    DebateController, DebateOutcome, DebateSettings, DebateStatus, FailurePolicy, TurnTrace,
};
pub use transcript::{Transcript, Utterance};
pub use turn::{take_turn, DebateBrief, Turn, OPENING_STATEMENT};
