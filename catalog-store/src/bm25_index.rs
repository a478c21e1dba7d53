use std::collections::HashMap;
use std::sync::Arc;

use product_model::CatalogDocument;
use tracing::{debug, info};

use crate::tokenizer::TextTokenizer;
use crate::{RetrievalError, Retriever, SearchHit};

/// Okapi BM25 parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f32,
    /// Length normalization.
    pub b: f32,
    /// Floor for negative idf values, as a fraction of the mean idf.
    pub epsilon: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75, epsilon: 0.25 }
    }
}

/// Term-overlap retriever over the tokenized catalog.
///
/// Tokens come from [`TextTokenizer`] as sets, so every indexed term has a
/// frequency of one and a document's length is its number of distinct tokens.
pub struct LexicalRetriever {
    catalog: Arc<[CatalogDocument]>,
    tokenizer: Arc<TextTokenizer>,
    top_k: usize,
    params: Bm25Params,
    /// term -> positions of documents containing it
    postings: HashMap<String, Vec<usize>>,
    doc_len: Vec<f32>,
    avg_doc_len: f32,
    idf: HashMap<String, f32>,
}

impl LexicalRetriever {
    pub fn new(
        catalog: Arc<[CatalogDocument]>,
        tokenizer: Arc<TextTokenizer>,
        top_k: usize,
        params: Bm25Params,
    ) -> Result<Self, RetrievalError> {
        if catalog.is_empty() { return Err(RetrievalError::EmptyCatalog); }

        let mut postings: HashMap<String, Vec<usize>> = HashMap::new();
        let mut doc_len = Vec::with_capacity(catalog.len());
        for (pos, doc) in catalog.iter().enumerate() {
            let terms = tokenizer.tokenize(&doc.page_content);
            doc_len.push(terms.len() as f32);
            for term in terms {
                postings.entry(term).or_default().push(pos);
            }
        }
        let total: f32 = doc_len.iter().sum();
        let avg_doc_len = total / catalog.len() as f32;
        let idf = compute_idf(&postings, catalog.len(), params.epsilon);

        info!(
            documents = catalog.len(),
            vocabulary = postings.len(),
            tokenizer = tokenizer.strategy(),
            "lexical index built"
        );
        Ok(Self { catalog, tokenizer, top_k, params, postings, doc_len, avg_doc_len, idf })
    }

    pub fn top_k(&self) -> usize { self.top_k }

    pub fn vocabulary_size(&self) -> usize { self.postings.len() }

    /// BM25 score of every catalog document for `query`, in catalog order.
    pub fn scores(&self, query: &str) -> Vec<f32> {
        let mut scores = vec![0f32; self.catalog.len()];
        let Bm25Params { k1, b, .. } = self.params;
        let avg = if self.avg_doc_len > 0.0 { self.avg_doc_len } else { 1.0 };
        for term in self.tokenizer.tokenize(query) {
            let (Some(docs), Some(&idf)) = (self.postings.get(&term), self.idf.get(&term)) else { continue };
            for &pos in docs {
                // tf is always 1 for set-valued token streams
                let norm = k1 * (1.0 - b + b * self.doc_len[pos] / avg);
                scores[pos] += idf * (k1 + 1.0) / (1.0 + norm);
            }
        }
        scores
    }
}

impl Retriever for LexicalRetriever {
    fn name(&self) -> &'static str { "bm25" }

    fn retrieve(&self, query: &str) -> Result<Vec<SearchHit>, RetrievalError> {
        let mut ranked: Vec<(usize, f32)> = self.scores(query).into_iter().enumerate().collect();
        // score desc, then catalog order
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        ranked.truncate(self.top_k);
        debug!(query, hits = ranked.len(), "bm25 retrieve");
        Ok(ranked
            .into_iter()
            .map(|(pos, score)| SearchHit { document: self.catalog[pos].clone(), score })
            .collect())
    }
}

/// Smallest idf a matching term can carry.
const MIN_IDF: f32 = 1e-3;

/// `ln((N - n + 0.5) / (n + 0.5))`. Values that are not positive are replaced
/// by `epsilon * mean_idf`, never less than [`MIN_IDF`], so a document sharing
/// a term with the query always outscores one sharing none.
fn compute_idf(postings: &HashMap<String, Vec<usize>>, n_docs: usize, epsilon: f32) -> HashMap<String, f32> {
    let n = n_docs as f32;
    let mut idf = HashMap::with_capacity(postings.len());
    let mut sum = 0f32;
    let mut floored = Vec::new();
    for (term, docs) in postings {
        let df = docs.len() as f32;
        let value = (n - df + 0.5).ln() - (df + 0.5).ln();
        sum += value;
        if value <= 0.0 { floored.push(term.clone()); }
        idf.insert(term.clone(), value);
    }
    if idf.is_empty() { return idf; }
    // catalogs repeat the same header keys in every row, which can pull the mean below zero
    let floor = (epsilon * sum / idf.len() as f32).max(MIN_IDF);
    for term in floored {
        idf.insert(term, floor);
    }
    idf
}
