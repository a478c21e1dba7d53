use hnsw_rs::prelude::*;

use crate::IndexError;

/// A nearest-neighbour hit: catalog position and cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorMatch {
    pub id: usize,
    pub score: f32,
}

/// Vector store boundary used by the dense retriever.
pub trait VectorIndex {
    fn name(&self) -> &'static str;
    fn dimension(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool { self.len() == 0 }
    fn insert(&mut self, id: usize, vector: &[f32]) -> Result<(), IndexError>;
    /// Up to `k` matches, highest similarity first.
    fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<VectorMatch>, IndexError>;
}

/// Graph construction and search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HnswParams {
    pub max_nb_connection: usize,
    pub max_layer: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self { max_nb_connection: 16, max_layer: 16, ef_construction: 200, ef_search: 64 }
    }
}

/// Which vector index to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBackend {
    /// Approximate search on an HNSW graph (cosine distance).
    Hnsw(HnswParams),
    /// Exact cosine scan; accepts any finite vector of the right dimension.
    Flat,
}

impl Default for VectorBackend {
    fn default() -> Self { Self::Hnsw(HnswParams::default()) }
}

impl VectorBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hnsw(_) => "hnsw",
            Self::Flat => "flat",
        }
    }

    pub fn build(&self, dim: usize, expected: usize) -> Box<dyn VectorIndex> {
        match self {
            Self::Hnsw(params) => Box::new(HnswIndex::new(dim, expected, *params)),
            Self::Flat => Box::new(FlatIndex::new(dim)),
        }
    }
}

/// HNSW-based vector index (Cosine distance).
pub struct HnswIndex {
    dim: usize,
    params: HnswParams,
    hnsw: Hnsw<'static, f32, DistCosine>,
    count: usize,
}

impl HnswIndex {
    pub fn new(dim: usize, expected: usize, params: HnswParams) -> Self {
        let hnsw = Hnsw::<f32, DistCosine>::new(
            params.max_nb_connection,
            expected.max(1),
            params.max_layer,
            params.ef_construction,
            DistCosine {},
        );
        Self { dim, params, hnsw, count: 0 }
    }
}

impl VectorIndex for HnswIndex {
    fn name(&self) -> &'static str { "hnsw" }
    fn dimension(&self) -> usize { self.dim }
    fn len(&self) -> usize { self.count }

    /// Cosine distance is undefined for zero vectors, so those are rejected here.
    fn insert(&mut self, id: usize, vector: &[f32]) -> Result<(), IndexError> {
        check_vector(self.dim, id, vector)?;
        if norm(vector) == 0.0 {
            return Err(IndexError::InvalidVector { id, reason: "zero-norm vector".into() });
        }
        self.hnsw.insert((vector, id));
        self.count += 1;
        Ok(())
    }

    fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<VectorMatch>, IndexError> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        if k == 0 || self.count == 0 { return Ok(Vec::new()); }
        if norm(query) == 0.0 {
            return Err(IndexError::InvalidVector { id: usize::MAX, reason: "zero-norm query".into() });
        }
        let ef = self.params.ef_search.max(k);
        let mut out: Vec<VectorMatch> = self
            .hnsw
            .search(query, k, ef)
            .into_iter()
            .map(|n| VectorMatch { id: n.d_id, score: 1.0 - n.distance })
            .collect();
        sort_matches(&mut out);
        out.truncate(k);
        Ok(out)
    }
}

/// Brute-force cosine index.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    entries: Vec<(usize, Vec<f32>, f32)>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, entries: Vec::new() }
    }
}

impl VectorIndex for FlatIndex {
    fn name(&self) -> &'static str { "flat" }
    fn dimension(&self) -> usize { self.dim }
    fn len(&self) -> usize { self.entries.len() }

    fn insert(&mut self, id: usize, vector: &[f32]) -> Result<(), IndexError> {
        check_vector(self.dim, id, vector)?;
        self.entries.push((id, vector.to_vec(), norm(vector)));
        Ok(())
    }

    fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<VectorMatch>, IndexError> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let qn = norm(query);
        let mut out: Vec<VectorMatch> = self
            .entries
            .iter()
            .map(|(id, v, vn)| {
                let score = if qn == 0.0 || *vn == 0.0 {
                    0.0
                } else {
                    v.iter().zip(query).map(|(a, b)| a * b).sum::<f32>() / (qn * vn)
                };
                VectorMatch { id: *id, score }
            })
            .collect();
        sort_matches(&mut out);
        out.truncate(k);
        Ok(out)
    }
}

fn check_vector(dim: usize, id: usize, vector: &[f32]) -> Result<(), IndexError> {
    if vector.len() != dim {
        return Err(IndexError::DimensionMismatch { expected: dim, actual: vector.len() });
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(IndexError::InvalidVector { id, reason: "non-finite component".into() });
    }
    Ok(())
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn sort_matches(matches: &mut [VectorMatch]) {
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.id.cmp(&b.id)));
}
