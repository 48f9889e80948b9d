use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Knowledge-base excerpt with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    pub text: String,
    pub score: f32,
}

impl EvidenceChunk {
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self { text: text.into(), score }
    }
}

/// Knowledge retrieval collaborator.
///
/// Implementations return chunks ordered by descending relevance.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<EvidenceChunk>>;
}

#[async_trait::async_trait]
impl<T: Retriever + ?Sized> Retriever for Arc<T> {
    async fn retrieve(&self, query: &str) -> Result<Vec<EvidenceChunk>> {
        (**self).retrieve(query).await
    }
}

/// Rank chunks by descending score. Stable; NaN scores sort last.
pub fn rank_by_score(chunks: &[EvidenceChunk]) -> Vec<&EvidenceChunk> {
    let mut ranked: Vec<&EvidenceChunk> = chunks.iter().collect();
    ranked.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.score.total_cmp(&a.score),
    });
    ranked
}
