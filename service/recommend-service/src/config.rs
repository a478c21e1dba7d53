use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use catalog_store::catalog::CatalogEncoding;
use catalog_store::{HnswParams, VectorBackend};
use embedding_provider::config::{default_hashing_config, default_onnx_config};
use embedding_provider::embedder::{Embedder, EmbedderError, HashingConfig, HashingEmbedder, OnnxConfig, OnnxEmbedder};

use crate::logging::LogConfig;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_LEXICAL_WEIGHT: f32 = 0.5;
pub const DEFAULT_DENSE_WEIGHT: f32 = 0.5;
pub const DEFAULT_CATALOG_PATH: &str = "data/products.csv";
pub const DEFAULT_IMAGE_DIR: &str = "images/products";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: `{value}`")]
    Invalid { key: &'static str, value: String },
}

/// Which embedder backs dense retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderChoice {
    Onnx,
    Hashing,
    /// Dense retrieval disabled; lexical ranking only.
    None,
}

impl FromStr for EmbedderChoice {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onnx" => Ok(Self::Onnx),
            "hashing" | "hash" => Ok(Self::Hashing),
            "none" | "off" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub catalog_path: PathBuf,
    pub catalog_encoding: CatalogEncoding,
    pub image_dir: PathBuf,
    pub log: LogConfig,
    pub top_k: usize,
    pub lexical_weight: f32,
    pub dense_weight: f32,
    pub embedder: EmbedderChoice,
    pub onnx: OnnxConfig,
    pub hashing: HashingConfig,
    /// Max number of documents to embed per batch.
    pub embed_batch_size: usize,
    pub vector_backend: VectorBackend,
    /// Tried once when `vector_backend` cannot be built.
    pub fallback_backend: VectorBackend,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            catalog_encoding: CatalogEncoding::Utf8,
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            log: LogConfig::default(),
            top_k: DEFAULT_TOP_K,
            lexical_weight: DEFAULT_LEXICAL_WEIGHT,
            dense_weight: DEFAULT_DENSE_WEIGHT,
            embedder: EmbedderChoice::Onnx,
            onnx: default_onnx_config("."),
            hashing: default_hashing_config(),
            embed_batch_size: 64,
            vector_backend: VectorBackend::Hnsw(HnswParams::default()),
            fallback_backend: VectorBackend::Flat,
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by `RECOMMEND_*` variables; `.env` is loaded first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServiceConfig::from_env`] with an arbitrary key source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("RECOMMEND_CATALOG_PATH") { cfg.catalog_path = PathBuf::from(v); }
        if let Some(v) = get("RECOMMEND_CATALOG_ENCODING") {
            cfg.catalog_encoding = CatalogEncoding::from_label(&v)
                .ok_or(ConfigError::Invalid { key: "RECOMMEND_CATALOG_ENCODING", value: v })?;
        }
        if let Some(v) = get("RECOMMEND_IMAGE_DIR") { cfg.image_dir = PathBuf::from(v); }
        if let Some(v) = get("RECOMMEND_LOG_DIR") { cfg.log.dir = PathBuf::from(v); }
        if let Some(v) = get("RECOMMEND_TOP_K") {
            cfg.top_k = parse_positive("RECOMMEND_TOP_K", v)?;
        }
        if let Some(v) = get("RECOMMEND_LEXICAL_WEIGHT") { cfg.lexical_weight = parse_weight("RECOMMEND_LEXICAL_WEIGHT", v)?; }
        if let Some(v) = get("RECOMMEND_DENSE_WEIGHT") { cfg.dense_weight = parse_weight("RECOMMEND_DENSE_WEIGHT", v)?; }
        if let Some(v) = get("RECOMMEND_EMBEDDER") {
            cfg.embedder = v.parse().map_err(|_| ConfigError::Invalid { key: "RECOMMEND_EMBEDDER", value: v.clone() })?;
        }
        if let Some(v) = get("RECOMMEND_ONNX_MODEL") { cfg.onnx.model_path = PathBuf::from(v); }
        if let Some(v) = get("RECOMMEND_ONNX_TOKENIZER") { cfg.onnx.tokenizer_path = PathBuf::from(v); }
        if let Some(v) = get("RECOMMEND_ONNX_RUNTIME") { cfg.onnx.runtime_library_path = PathBuf::from(v); }
        if let Some(v) = get("RECOMMEND_EMBED_DIM") {
            let dim = parse_positive("RECOMMEND_EMBED_DIM", v)?;
            cfg.onnx.dimension = dim;
            cfg.hashing.dimension = dim;
        }
        if let Some(v) = get("RECOMMEND_EMBED_BATCH") {
            cfg.embed_batch_size = parse_positive("RECOMMEND_EMBED_BATCH", v)?;
        }
        Ok(cfg)
    }

    /// Instantiate the configured embedder; `Ok(None)` when dense retrieval is off.
    pub fn build_embedder(&self) -> Result<Option<Arc<dyn Embedder>>, EmbedderError> {
        match self.embedder {
            EmbedderChoice::None => Ok(None),
            EmbedderChoice::Hashing => Ok(Some(Arc::new(HashingEmbedder::new(self.hashing.clone())?))),
            EmbedderChoice::Onnx => Ok(Some(Arc::new(OnnxEmbedder::new(self.onnx.clone())?))),
        }
    }
}

fn parse_positive(key: &'static str, value: String) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

fn parse_weight(key: &'static str, value: String) -> Result<f32, ConfigError> {
    match value.parse::<f32>() {
        Ok(w) if w.is_finite() && w >= 0.0 => Ok(w),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}
