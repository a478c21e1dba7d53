use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::{RetrievalError, Retriever, SearchHit};

/// Rank-fusion smoothing constant.
pub const RRF_C: f32 = 60.0;

/// A fusion member and its weight.
pub struct WeightedRetriever {
    pub retriever: Box<dyn Retriever>,
    pub weight: f32,
}

impl WeightedRetriever {
    pub fn new(retriever: Box<dyn Retriever>, weight: f32) -> Self {
        Self { retriever, weight }
    }
}

/// Weighted reciprocal rank fusion over one or more retrievers.
///
/// A document's fused score is the sum over members of
/// `weight / (rank + RRF_C)` with 1-based ranks. Ties keep the order in which
/// documents were first seen, walking members from highest to lowest weight.
/// With a single member the member's ranking is returned untouched.
pub struct HybridRetriever {
    members: Vec<WeightedRetriever>,
    top_k: usize,
    degraded: bool,
}

impl HybridRetriever {
    pub fn new(lexical: Box<dyn Retriever>, lexical_weight: f32, dense: Box<dyn Retriever>, dense_weight: f32, top_k: usize) -> Self {
        Self::from_parts(
            vec![WeightedRetriever::new(lexical, lexical_weight), WeightedRetriever::new(dense, dense_weight)],
            top_k,
        )
    }

    /// Dense retrieval is unavailable; serve the lexical ranking alone.
    pub fn lexical_only(lexical: Box<dyn Retriever>, top_k: usize) -> Self {
        info!(retriever = lexical.name(), "hybrid retrieval degraded to lexical only");
        let mut hybrid = Self::from_parts(vec![WeightedRetriever::new(lexical, 1.0)], top_k);
        hybrid.degraded = true;
        hybrid
    }

    pub fn from_parts(mut members: Vec<WeightedRetriever>, top_k: usize) -> Self {
        // stable: equal weights keep construction order
        members.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
        Self { members, top_k, degraded: false }
    }

    pub fn member_names(&self) -> Vec<&'static str> {
        self.members.iter().map(|m| m.retriever.name()).collect()
    }

    pub fn is_degraded(&self) -> bool { self.degraded }

    pub fn top_k(&self) -> usize { self.top_k }
}

impl Retriever for HybridRetriever {
    fn name(&self) -> &'static str { "hybrid" }

    fn retrieve(&self, query: &str) -> Result<Vec<SearchHit>, RetrievalError> {
        if let [only] = self.members.as_slice() {
            let mut hits = only.retriever.retrieve(query)?;
            hits.truncate(self.top_k);
            return Ok(hits);
        }

        let mut failures = Vec::new();
        let mut answered = 0usize;
        // row -> index into fused
        let mut seen: HashMap<usize, usize> = HashMap::new();
        let mut fused: Vec<SearchHit> = Vec::new();
        for member in &self.members {
            let hits = match member.retriever.retrieve(query) {
                Ok(h) => h,
                Err(e) => {
                    warn!(retriever = member.retriever.name(), error = %e, "member retriever failed; fusing the rest");
                    failures.push(format!("{}: {e}", member.retriever.name()));
                    continue;
                }
            };
            answered += 1;
            for (i, hit) in hits.into_iter().enumerate() {
                let contribution = member.weight / ((i + 1) as f32 + RRF_C);
                match seen.get(&hit.document.row) {
                    Some(&slot) => fused[slot].score += contribution,
                    None => {
                        seen.insert(hit.document.row, fused.len());
                        fused.push(SearchHit { document: hit.document, score: contribution });
                    }
                }
            }
        }
        if answered == 0 { return Err(RetrievalError::AllFailed(failures.join("; "))); }

        // stable sort preserves first-appearance order among equal scores
        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused.truncate(self.top_k);
        debug!(query, hits = fused.len(), members = answered, "hybrid retrieve");
        Ok(fused)
    }
}
