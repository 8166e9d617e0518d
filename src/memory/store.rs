//! In-memory reflection store
//!
//! Holds (situation, recommendation) pairs and ranks them against a query by
//! term overlap. Reads take a shared lock, so many turns can retrieve at once.

use crate::error::OrchestrationError;
use crate::memory::{MemoryRecord, MemoryStore};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

const DEFAULT_MAX_MATCHES: usize = 2;

/// A remembered situation and what was recommended at the time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryEntry {
    pub situation: String,
    pub recommendation: String,
}

struct IndexedEntry {
    entry: MemoryEntry,
    terms: HashSet<String>,
}

pub struct InMemoryMemoryStore {
    name: String,
    entries: Arc<RwLock<Vec<IndexedEntry>>>,
    max_matches: usize,
}

impl InMemoryMemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Arc::new(RwLock::new(Vec::new())),
            max_matches: DEFAULT_MAX_MATCHES,
        }
    }

    pub fn with_max_matches(mut self, max_matches: usize) -> Self {
        self.max_matches = max_matches;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn add_situations(&self, situations: Vec<MemoryEntry>) {
        let mut entries = self.entries.write().await;
        for entry in situations {
            let terms = tokenize(&entry.situation);
            entries.push(IndexedEntry { entry, terms });
        }
        debug!(store = %self.name, size = entries.len(), "Memory store updated");
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn retrieve(&self, query: &str) -> Result<Vec<MemoryRecord>> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.entries.read().await;

        let mut scored: Vec<(f32, &IndexedEntry)> = entries
            .iter()
            .filter_map(|indexed| {
                let score = overlap_score(&query_terms, &indexed.terms);
                (score > 0.0).then_some((score, indexed))
            })
            .collect();

        // Stable sort keeps insertion order between equal scores
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(self.max_matches)
            .map(|(score, indexed)| MemoryRecord {
                summary: indexed.entry.recommendation.clone(),
                score,
            })
            .collect())
    }
}

/// Jaccard similarity of two term sets
fn overlap_score(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let shared = a.intersection(b).count();
    if shared == 0 {
        return 0.0;
    }
    let union = a.len() + b.len() - shared;
    shared as f32 / union as f32
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 1)
        .map(|word| word.to_lowercase())
        .collect()
}

/// Load per-role seed entries from a JSON file shaped like
/// `{ "bull": [{ "situation": "...", "recommendation": "..." }], "bear": [...] }`
pub fn load_seed(path: impl AsRef<Path>) -> Result<HashMap<String, Vec<MemoryEntry>>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        OrchestrationError::MemoryRetrievalFailure(format!(
            "cannot read memory seed {}: {}",
            path.display(),
            e
        ))
    })?;
    let seed: HashMap<String, Vec<MemoryEntry>> = serde_json::from_str(&raw)?;

    info!(
        path = %path.display(),
        roles = seed.len(),
        "Loaded memory seed"
    );

    Ok(seed)
}
