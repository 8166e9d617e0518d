//! Memory Port
//!
//! Long-term retrieval of reflections from similar past situations.
//! Each debater may own a private store; an empty result means "no memory".

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod store;

pub use store::{load_seed, InMemoryMemoryStore, MemoryEntry};

/// One retrieved prior record, best match first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    pub summary: String,
    #[serde(default)]
    pub score: f32,
}

/// Trait for memory retrieval.
///
/// Implementations must be safe for concurrent reads from many records' turns
/// and must return an empty list (not an error) for an unseen query.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<MemoryRecord>>;
}
