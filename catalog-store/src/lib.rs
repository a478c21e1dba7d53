pub mod catalog;
pub mod tokenizer;
pub mod bm25_index;
pub mod hnsw_index;
pub mod dense;
pub mod hybrid;

use product_model::CatalogDocument;

pub use bm25_index::{Bm25Params, LexicalRetriever};
pub use dense::{DenseOptions, DenseRetriever, IndexUnavailable, UnavailableCause};
pub use hnsw_index::{FlatIndex, HnswIndex, HnswParams, VectorBackend, VectorIndex, VectorMatch};
pub use hybrid::{HybridRetriever, WeightedRetriever, RRF_C};
pub use tokenizer::TextTokenizer;

/// A ranked catalog document with the score its retriever assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document: CatalogDocument,
    pub score: f32,
}

/// Capability shared by every retriever: ranked documents for a query, at most K of them.
pub trait Retriever {
    fn name(&self) -> &'static str;

    /// Ranked hits, most relevant first, no duplicate documents.
    fn retrieve(&self, query: &str) -> Result<Vec<SearchHit>, RetrievalError>;

    /// Same ranking without scores.
    fn retrieve_documents(&self, query: &str) -> Result<Vec<CatalogDocument>, RetrievalError> {
        Ok(self.retrieve(query)?.into_iter().map(|h| h.document).collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("catalog contains no documents")]
    EmptyCatalog,
    #[error("embedder error: {0}")]
    Embed(String),
    #[error("index error: {0}")]
    Index(#[from] IndexError),
    #[error("no retriever produced results: {0}")]
    AllFailed(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndexError {
    #[error("vector dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("invalid vector for id {id}: {reason}")]
    InvalidVector { id: usize, reason: String },
    #[error("backend error: {0}")]
    Backend(String),
}
