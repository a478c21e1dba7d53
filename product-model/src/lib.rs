//! Shared models used across crates

pub mod record;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use record::{serialize_fields, MissingRequiredFieldsError, ProductRecord, StockStatus, REQUIRED_FIELDS};

/// One catalog row materialized as `key: value` text plus side metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Zero-based position of the row in the source catalog.
    pub row: usize,
    /// Authoritative text; one `key: value` line per field.
    pub page_content: String,
    /// Loader metadata (`source`, `row`).
    pub metadata: BTreeMap<String, String>,
}

impl CatalogDocument {
    pub fn new(row: usize, page_content: impl Into<String>) -> Self {
        Self { row, page_content: page_content.into(), metadata: BTreeMap::new() }
    }

    /// Build a document with the loader metadata a CSV source would attach.
    pub fn with_source(row: usize, page_content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("source".to_string(), source.into());
        metadata.insert("row".to_string(), row.to_string());
        Self { row, page_content: page_content.into(), metadata }
    }

    /// Parse the structured product fields out of `page_content`.
    pub fn product(&self) -> ProductRecord {
        ProductRecord::parse(&self.page_content)
    }
}

/// Output of a retrieval call as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "documents", rename_all = "snake_case")]
pub enum RetrievalResult {
    #[default]
    Empty,
    Single(CatalogDocument),
    Many(Vec<CatalogDocument>),
}

impl RetrievalResult {
    /// Wrap a ranked list; an empty list becomes `Empty`.
    pub fn from_ranked(docs: Vec<CatalogDocument>) -> Self {
        if docs.is_empty() { Self::Empty } else { Self::Many(docs) }
    }

    /// The document to present: first of `Many`, or the `Single` value.
    pub fn top(&self) -> Option<&CatalogDocument> {
        match self {
            Self::Empty => None,
            Self::Single(doc) => Some(doc),
            Self::Many(docs) => docs.first(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Single(_) => 1,
            Self::Many(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Short shape label used in diagnostics and logs.
    pub fn shape(&self) -> String {
        match self {
            Self::Empty => "empty".into(),
            Self::Single(_) => "single".into(),
            Self::Many(docs) => format!("many({})", docs.len()),
        }
    }
}
