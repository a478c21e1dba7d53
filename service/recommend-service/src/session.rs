use std::fmt;
use std::io::Write;
use std::sync::Arc;

use catalog_store::catalog::{load_catalog, CatalogError};
use catalog_store::{
    Bm25Params, DenseOptions, DenseRetriever, HybridRetriever, IndexUnavailable, LexicalRetriever, Retriever,
    TextTokenizer, UnavailableCause,
};
use chrono::{DateTime, Utc};
use product_model::{CatalogDocument, RetrievalResult};
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn, Span};

use crate::assets::AssetResolver;
use crate::config::ServiceConfig;
use crate::present::{display_product, RenderError};
use crate::ServiceError;

/// Opaque per-session token; 32 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self { Self(uuid::Uuid::new_v4().simple().to_string()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl Default for SessionId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TurnContent {
    Text(String),
    Products(RetrievalResult),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: TurnContent,
}

/// How dense retrieval ended up for this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenseStatus {
    Ready { backend: &'static str },
    Disabled,
    Unavailable(IndexUnavailable),
}

/// One client conversation: its id, its log and its own retrieval indexes.
///
/// Indexes are built on first use and reused for the rest of the session.
pub struct Session {
    id: SessionId,
    started_at: DateTime<Utc>,
    config: ServiceConfig,
    assets: AssetResolver,
    span: Span,
    messages: Vec<ChatTurn>,
    retriever: Option<HybridRetriever>,
    dense_status: Option<DenseStatus>,
}

impl Session {
    pub fn new(config: ServiceConfig) -> Self {
        let id = SessionId::new();
        let span = info_span!("session", session_id = %id);
        span.in_scope(|| info!(catalog = %config.catalog_path.display(), "session started"));
        let assets = AssetResolver::new(config.image_dir.clone());
        Self { id, started_at: Utc::now(), config, assets, span, messages: Vec::new(), retriever: None, dense_status: None }
    }

    pub fn id(&self) -> &SessionId { &self.id }
    pub fn started_at(&self) -> DateTime<Utc> { self.started_at }
    pub fn config(&self) -> &ServiceConfig { &self.config }
    pub fn assets(&self) -> &AssetResolver { &self.assets }
    pub fn messages(&self) -> &[ChatTurn] { &self.messages }
    /// Span carrying `session_id`; enter it to tag log lines emitted outside the session.
    pub fn span(&self) -> &Span { &self.span }
    pub fn dense_status(&self) -> Option<&DenseStatus> { self.dense_status.as_ref() }
    pub fn is_ready(&self) -> bool { self.retriever.is_some() }

    /// Build the retrieval indexes unless this session already has them.
    pub fn ensure_retriever(&mut self) -> Result<&HybridRetriever, ServiceError> {
        if self.retriever.is_none() {
            let span = self.span.clone();
            let _entered = span.enter();
            let (retriever, status) = build_retriever(&self.config)
                .inspect_err(|e| error!(error = %e, "retriever initialization failed"))?;
            self.retriever = Some(retriever);
            self.dense_status = Some(status);
        }
        self.retriever.as_ref().ok_or_else(|| ServiceError::Retrieval("retriever missing after initialization".into()))
    }

    /// Run one chat turn: retrieve, then record the query and the result.
    ///
    /// A failed turn leaves the message log untouched.
    pub fn ask(&mut self, query: &str) -> Result<RetrievalResult, ServiceError> {
        let span = self.span.clone();
        let _entered = span.enter();
        info!(query, "user query");

        let docs = self
            .ensure_retriever()?
            .retrieve_documents(query)
            .map_err(|e| ServiceError::Retrieval(e.to_string()))?;
        let result = RetrievalResult::from_ranked(docs);
        info!(shape = %result.shape(), top_row = ?result.top().map(|d| d.row), "retrieval finished");
        self.messages.push(ChatTurn { role: Role::User, content: TurnContent::Text(query.to_string()) });
        self.messages.push(ChatTurn { role: Role::Assistant, content: TurnContent::Products(result.clone()) });
        Ok(result)
    }

    /// Render one retrieval result as product cards inside the session span.
    pub fn display(&self, out: &mut dyn Write, result: &RetrievalResult) -> Result<(), RenderError> {
        let _entered = self.span.enter();
        display_product(out, result, &self.assets)
    }

    /// Write the whole conversation log, rendering product turns as cards.
    pub fn replay(&self, out: &mut dyn Write) -> Result<(), RenderError> {
        let _entered = self.span.enter();
        for turn in &self.messages {
            match (&turn.role, &turn.content) {
                (_, TurnContent::Products(result)) => display_product(out, result, &self.assets)?,
                (Role::User, TurnContent::Text(text)) => write_text(out, "> ", text, "user")?,
                (Role::Assistant, TurnContent::Text(text)) => write_text(out, "", text, "assistant")?,
            }
        }
        Ok(())
    }
}

fn write_text(out: &mut dyn Write, prefix: &str, text: &str, role: &str) -> Result<(), RenderError> {
    writeln!(out, "{prefix}{text}").map_err(|e| RenderError::Unknown { shape: format!("{role} text"), message: e.to_string() })
}

fn build_retriever(cfg: &ServiceConfig) -> Result<(HybridRetriever, DenseStatus), ServiceError> {
    let docs = load_catalog(&cfg.catalog_path, cfg.catalog_encoding).map_err(|e| match e {
        CatalogError::Empty(path) => ServiceError::EmptyCatalog { path },
        other => ServiceError::Catalog(other.to_string()),
    })?;
    let catalog: Arc<[CatalogDocument]> = docs.into();

    let tokenizer = Arc::new(TextTokenizer::detect());
    let lexical = LexicalRetriever::new(Arc::clone(&catalog), tokenizer, cfg.top_k, Bm25Params::default())
        .map_err(|e| ServiceError::Retrieval(e.to_string()))?;

    match build_dense(cfg, catalog) {
        Some(Ok(dense)) => {
            let backend = dense.backend();
            info!(backend, lexical_weight = cfg.lexical_weight, dense_weight = cfg.dense_weight, "hybrid retriever ready");
            let hybrid = HybridRetriever::new(Box::new(lexical), cfg.lexical_weight, Box::new(dense), cfg.dense_weight, cfg.top_k);
            Ok((hybrid, DenseStatus::Ready { backend }))
        }
        Some(Err(unavailable)) => {
            warn!(cause = %unavailable.cause, error = %unavailable.message, "continuing with lexical retrieval only");
            Ok((HybridRetriever::lexical_only(Box::new(lexical), cfg.top_k), DenseStatus::Unavailable(unavailable)))
        }
        None => {
            info!("dense retrieval disabled by configuration");
            Ok((HybridRetriever::lexical_only(Box::new(lexical), cfg.top_k), DenseStatus::Disabled))
        }
    }
}

fn build_dense(cfg: &ServiceConfig, catalog: Arc<[CatalogDocument]>) -> Option<Result<DenseRetriever, IndexUnavailable>> {
    let embedder = match cfg.build_embedder() {
        Ok(Some(e)) => e,
        Ok(None) => return None,
        Err(e) => {
            let cause = if e.is_configuration() { UnavailableCause::Configuration } else { UnavailableCause::Backend };
            error!(cause = %cause, error = %e, "embedder could not be created");
            return Some(Err(IndexUnavailable { cause, backend: cfg.vector_backend.name(), message: e.to_string() }));
        }
    };
    let opts = DenseOptions { top_k: cfg.top_k, embed_batch_size: cfg.embed_batch_size };
    Some(DenseRetriever::build_with_fallback(catalog, embedder, &cfg.vector_backend, &cfg.fallback_backend, opts))
}
