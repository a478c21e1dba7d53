use std::path::PathBuf;

use crate::embedder::{HashingConfig, OnnxConfig};

/// Default settings for the local ONNX embedder.
#[derive(Debug, Clone, Copy)]
pub struct OnnxDefaults {
    pub model_path: &'static str,
    pub tokenizer_path: &'static str,
    pub runtime_library_path: &'static str,
    pub embedding_dimension: usize,
    pub max_input_tokens: usize,
    pub embedding_model_id: &'static str,
}

/// Shared defaults so the service, CLI and tests stay in sync.
pub const ONNX_DEFAULTS: OnnxDefaults = OnnxDefaults {
    model_path: "models/ruri-v3-onnx/model.onnx",
    tokenizer_path: "models/ruri-v3-onnx/tokenizer.json",
    runtime_library_path: if cfg!(windows) {
        "bin/onnxruntime/lib/onnxruntime.dll"
    } else {
        "bin/onnxruntime/lib/libonnxruntime.so"
    },
    embedding_dimension: 768,
    max_input_tokens: 8192,
    embedding_model_id: "ruri-v3-onnx",
};

/// Defaults for the model-free hashing embedder.
pub const HASHING_DEFAULT_DIMENSION: usize = 256;
pub const HASHING_DEFAULT_MAX_INPUT: usize = 8192;
pub const HASHING_MODEL_ID: &str = "char-ngram-hash";

/// Build an [`OnnxConfig`] from the shared defaults, resolving asset paths
/// against `base` (usually the working directory of the application).
pub fn default_onnx_config(base: impl Into<PathBuf>) -> OnnxConfig {
    let base = base.into();
    OnnxConfig {
        model_path: base.join(ONNX_DEFAULTS.model_path),
        tokenizer_path: base.join(ONNX_DEFAULTS.tokenizer_path),
        runtime_library_path: base.join(ONNX_DEFAULTS.runtime_library_path),
        dimension: ONNX_DEFAULTS.embedding_dimension,
        max_input_length: ONNX_DEFAULTS.max_input_tokens,
        embedding_model_id: ONNX_DEFAULTS.embedding_model_id.into(),
        normalize: true,
    }
}

pub fn default_hashing_config() -> HashingConfig {
    HashingConfig {
        dimension: HASHING_DEFAULT_DIMENSION,
        max_input_length: HASHING_DEFAULT_MAX_INPUT,
        embedding_model_id: HASHING_MODEL_ID.into(),
    }
}
