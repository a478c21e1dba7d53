use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::onnx::l2_normalize;
use super::{Embedder, EmbedderError, EmbedderInfo, ProviderKind};

/// Configuration for the model-free hashing embedder.
#[derive(Debug, Clone)]
pub struct HashingConfig {
    pub dimension: usize,
    /// Maximum input length in characters.
    pub max_input_length: usize,
    pub embedding_model_id: String,
}

/// Deterministic character n-gram feature hashing.
///
/// Unigrams and bigrams of the lowercased text are hashed into signed buckets
/// and the result is L2-normalized, so texts sharing many n-grams land close
/// together under cosine similarity. Needs no model files or network access.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    info: EmbedderInfo,
    max_input_length: usize,
    seed: u64,
}

impl HashingEmbedder {
    pub fn new(config: HashingConfig) -> Result<Self, EmbedderError> {
        if config.dimension == 0 {
            return Err(EmbedderError::InvalidConfiguration { message: "dimension must be greater than zero".into() });
        }
        if config.max_input_length == 0 {
            return Err(EmbedderError::InvalidConfiguration { message: "max_input_length must be greater than zero".into() });
        }
        let seed = compute_seed(&config.embedding_model_id, config.dimension);
        Ok(Self {
            info: EmbedderInfo {
                provider: ProviderKind::Hashing,
                embedding_model_id: config.embedding_model_id,
                dimension: config.dimension,
            },
            max_input_length: config.max_input_length,
            seed,
        })
    }

    fn features(&self, text: &str) -> Vec<f32> {
        let chars: Vec<char> = text.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect();
        let mut out = vec![0f32; self.info.dimension];
        for i in 0..chars.len() {
            self.add_feature(&mut out, &chars[i..i + 1]);
            if i + 1 < chars.len() {
                self.add_feature(&mut out, &chars[i..i + 2]);
            }
        }
        l2_normalize(&mut out);
        out
    }

    fn add_feature(&self, out: &mut [f32], gram: &[char]) {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        gram.hash(&mut hasher);
        let h = hasher.finish();
        let bucket = (h % out.len() as u64) as usize;
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        out[bucket] += sign;
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let actual_length = text.chars().count();
        if actual_length > self.max_input_length {
            return Err(EmbedderError::InputTooLong { max_length: self.max_input_length, actual_length });
        }
        Ok(self.features(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn info(&self) -> &EmbedderInfo {
        &self.info
    }
}

fn compute_seed(model_id: &str, dimension: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    ProviderKind::Hashing.hash(&mut hasher);
    model_id.hash(&mut hasher);
    dimension.hash(&mut hasher);
    hasher.finish()
}
