use std::fmt;
use std::sync::Arc;

use embedding_provider::embedder::{Embedder, EmbedderError};
use product_model::CatalogDocument;
use tracing::{debug, error, info, warn};

use crate::hnsw_index::{VectorBackend, VectorIndex};
use crate::{IndexError, RetrievalError, Retriever, SearchHit};

/// Why the dense retriever could not be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableCause {
    /// Model files, runtime library or credentials are missing or invalid.
    Configuration,
    /// The embedding provider or the vector backend failed while working.
    Backend,
}

impl fmt::Display for UnavailableCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => f.write_str("configuration"),
            Self::Backend => f.write_str("backend"),
        }
    }
}

/// Dense retrieval is unavailable for this session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dense index unavailable ({cause}, backend {backend}): {message}")]
pub struct IndexUnavailable {
    pub cause: UnavailableCause,
    pub backend: &'static str,
    pub message: String,
}

impl IndexUnavailable {
    pub fn configuration(backend: &'static str, message: impl Into<String>) -> Self {
        Self { cause: UnavailableCause::Configuration, backend, message: message.into() }
    }

    fn from_embedder(backend: &'static str, err: &EmbedderError) -> Self {
        let cause = if err.is_configuration() { UnavailableCause::Configuration } else { UnavailableCause::Backend };
        Self { cause, backend, message: err.to_string() }
    }

    fn from_index(backend: &'static str, err: &IndexError) -> Self {
        Self { cause: UnavailableCause::Backend, backend, message: err.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenseOptions {
    pub top_k: usize,
    /// Documents embedded per provider call.
    pub embed_batch_size: usize,
}

impl Default for DenseOptions {
    fn default() -> Self {
        Self { top_k: 5, embed_batch_size: 64 }
    }
}

/// Embedding-similarity retriever over the catalog.
pub struct DenseRetriever {
    catalog: Arc<[CatalogDocument]>,
    embedder: Arc<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    top_k: usize,
}

impl DenseRetriever {
    /// Embed every document and index it with `backend`.
    pub fn build(
        catalog: Arc<[CatalogDocument]>,
        embedder: Arc<dyn Embedder>,
        backend: &VectorBackend,
        opts: DenseOptions,
    ) -> Result<Self, IndexUnavailable> {
        let vectors = embed_documents(&catalog, embedder.as_ref(), opts.embed_batch_size)
            .map_err(|e| IndexUnavailable::from_embedder(backend.name(), &e))?;
        Self::from_vectors(catalog, embedder, backend, &vectors, opts)
    }

    /// Build with `primary`, retrying once with `fallback` before giving up.
    /// Document vectors computed by the first attempt are reused by the retry.
    pub fn build_with_fallback(
        catalog: Arc<[CatalogDocument]>,
        embedder: Arc<dyn Embedder>,
        primary: &VectorBackend,
        fallback: &VectorBackend,
        opts: DenseOptions,
    ) -> Result<Self, IndexUnavailable> {
        let mut cached: Option<Vec<Vec<f32>>> = None;
        let mut attempt = |backend: &VectorBackend| -> Result<Self, IndexUnavailable> {
            if cached.is_none() {
                let vectors = embed_documents(&catalog, embedder.as_ref(), opts.embed_batch_size)
                    .map_err(|e| IndexUnavailable::from_embedder(backend.name(), &e))?;
                cached = Some(vectors);
            }
            let vectors = cached.as_deref().unwrap_or(&[]);
            Self::from_vectors(Arc::clone(&catalog), Arc::clone(&embedder), backend, vectors, opts)
        };

        match attempt(primary) {
            Ok(r) => Ok(r),
            Err(first) => {
                warn!(
                    backend = first.backend,
                    cause = %first.cause,
                    error = %first.message,
                    fallback = fallback.name(),
                    "dense index construction failed; retrying with fallback backend"
                );
                attempt(fallback).map_err(|second| {
                    error!(
                        backend = second.backend,
                        cause = %second.cause,
                        error = %second.message,
                        "fallback dense index construction failed; dense retrieval disabled"
                    );
                    second
                })
            }
        }
    }

    fn from_vectors(
        catalog: Arc<[CatalogDocument]>,
        embedder: Arc<dyn Embedder>,
        backend: &VectorBackend,
        vectors: &[Vec<f32>],
        opts: DenseOptions,
    ) -> Result<Self, IndexUnavailable> {
        if vectors.len() != catalog.len() {
            return Err(IndexUnavailable {
                cause: UnavailableCause::Backend,
                backend: backend.name(),
                message: format!("embedded {} of {} documents", vectors.len(), catalog.len()),
            });
        }
        let mut index = backend.build(embedder.info().dimension, catalog.len());
        for (pos, v) in vectors.iter().enumerate() {
            index.insert(pos, v).map_err(|e| IndexUnavailable::from_index(backend.name(), &e))?;
        }
        info!(
            documents = index.len(),
            backend = index.name(),
            model = %embedder.info().embedding_model_id,
            "dense index built"
        );
        Ok(Self { catalog, embedder, index, top_k: opts.top_k })
    }

    pub fn backend(&self) -> &'static str { self.index.name() }
}

impl Retriever for DenseRetriever {
    fn name(&self) -> &'static str { "dense" }

    fn retrieve(&self, query: &str) -> Result<Vec<SearchHit>, RetrievalError> {
        let qvec = self.embedder.embed(query).map_err(|e| RetrievalError::Embed(e.to_string()))?;
        let matches = self.index.nearest(&qvec, self.top_k)?;
        debug!(query, hits = matches.len(), backend = self.index.name(), "dense retrieve");
        Ok(matches
            .into_iter()
            .filter_map(|m| self.catalog.get(m.id).map(|doc| SearchHit { document: doc.clone(), score: m.score }))
            .collect())
    }
}

fn embed_documents(catalog: &[CatalogDocument], embedder: &dyn Embedder, batch_size: usize) -> Result<Vec<Vec<f32>>, EmbedderError> {
    let texts: Vec<&str> = catalog.iter().map(|d| d.page_content.as_str()).collect();
    let mut out = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size.max(1)) {
        let vecs = embedder.embed_batch(chunk)?;
        if vecs.len() != chunk.len() {
            return Err(EmbedderError::ProviderFailure {
                message: format!("provider returned {} vectors for {} inputs", vecs.len(), chunk.len()),
            });
        }
        out.extend(vecs);
    }
    Ok(out)
}
