//! In-memory vector index for tests, demos, and small corpora.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{QueryMatch, VectorIndex, VectorRecord};
use crate::types::RetrievalError;

/// Exact-scan cosine index held in process memory.
#[derive(Default)]
pub struct MemoryVectorIndex {
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), RetrievalError> {
        let mut guard = self.records.write();
        for record in records {
            guard.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, RetrievalError> {
        let guard = self.records.read();
        let mut matches: Vec<QueryMatch> = guard
            .values()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: cosine(vector, &record.embedding),
                metadata: record.metadata.clone(),
                text: Some(record.text.clone()),
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.records.read().len())
    }
}
