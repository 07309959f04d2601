//! In-memory hybrid vector store
//!
//! Brute-force cosine ranking for the dense view, sparse dot product for the
//! lexical view, and reciprocal-rank fusion over the two ranked lists. Used by
//! the `memory` backend and by tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::types::IndexableUnit;

use super::vector_store::{HybridQuery, VectorSearchResult, VectorStoreProvider};

/// RRF constant (standard value)
const RRF_K: f32 = 60.0;

/// Process-local store; contents are lost on shutdown
#[derive(Default)]
pub struct InMemoryVectorStore {
    units: RwLock<Vec<IndexableUnit>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored unit
    pub fn units(&self) -> Vec<IndexableUnit> {
        self.units.read().clone()
    }
}

pub(crate) fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// Rank unit positions by descending score, keeping the top `limit`
fn ranked(scores: Vec<(usize, f32)>, limit: usize) -> Vec<usize> {
    let mut scores = scores;
    scores.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scores.into_iter().take(limit).map(|(i, _)| i).collect()
}

/// Fuse ranked lists: each appearance contributes `1 / (RRF_K + rank)`
fn rrf_fusion(lists: &[Vec<usize>]) -> Vec<(usize, f32)> {
    let mut fused: HashMap<usize, f32> = HashMap::new();
    for list in lists {
        for (rank, idx) in list.iter().enumerate() {
            *fused.entry(*idx).or_insert(0.0) += 1.0 / (RRF_K + (rank + 1) as f32);
        }
    }

    let mut fused: Vec<(usize, f32)> = fused.into_iter().collect();
    fused.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    fused
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStore {
    async fn ensure_collection(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, units: &[IndexableUnit]) -> Result<()> {
        let mut stored = self.units.write();
        let positions: HashMap<Uuid, usize> = stored
            .iter()
            .enumerate()
            .map(|(i, u)| (u.id, i))
            .collect();

        for unit in units {
            match positions.get(&unit.id) {
                Some(&i) => stored[i] = unit.clone(),
                None => stored.push(unit.clone()),
            }
        }
        Ok(())
    }

    async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<VectorSearchResult>> {
        let stored = self.units.read();

        let dense = ranked(
            stored
                .iter()
                .enumerate()
                .map(|(i, u)| (i, cosine_sim(&query.dense, &u.dense)))
                .collect(),
            query.limit,
        );

        let sparse = ranked(
            stored
                .iter()
                .enumerate()
                .map(|(i, u)| (i, query.sparse.dot(&u.sparse)))
                .filter(|(_, score)| *score > 0.0)
                .collect(),
            query.limit,
        );

        Ok(rrf_fusion(&[dense, sparse])
            .into_iter()
            .take(query.limit)
            .map(|(i, score)| {
                let mut unit = stored[i].clone();
                unit.dense.clear();
                unit.sparse = Default::default();
                VectorSearchResult {
                    unit,
                    similarity: score,
                }
            })
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.units.read().len())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
