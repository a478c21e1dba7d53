use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use ndarray::Array2;
use ort::{session::Session, value::Tensor, Error as OrtError};
use tokenizers::{Encoding, Tokenizer};

use super::{Embedder, EmbedderError, EmbedderInfo, ProviderKind};

/// Configuration for a sentence-embedding model run locally through ONNX Runtime.
#[derive(Debug, Clone)]
pub struct OnnxConfig {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub runtime_library_path: PathBuf,
    pub dimension: usize,
    pub max_input_length: usize,
    pub embedding_model_id: String,
    /// L2-normalize pooled vectors so dot product equals cosine similarity.
    pub normalize: bool,
}

/// Mean-pooled transformer embeddings computed in-process.
#[derive(Debug)]
pub struct OnnxEmbedder {
    info: EmbedderInfo,
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    pad_id: i64,
    max_input_length: usize,
    normalize: bool,
}

struct Batch {
    input_ids: Tensor<i64>,
    attention_mask: Tensor<i64>,
    masks: Vec<Vec<i64>>,
    seq_len: usize,
}

static ORT_RUNTIME_PATH: OnceLock<PathBuf> = OnceLock::new();

impl OnnxEmbedder {
    pub fn new(config: OnnxConfig) -> Result<Self, EmbedderError> {
        if config.dimension == 0 {
            return Err(EmbedderError::InvalidConfiguration { message: "dimension must be greater than zero".into() });
        }
        if config.max_input_length == 0 {
            return Err(EmbedderError::InvalidConfiguration { message: "max_input_length must be greater than zero".into() });
        }

        // Check every asset before touching the runtime so a missing file is reported as configuration.
        let runtime_path = existing_path(&config.runtime_library_path, "ONNX Runtime shared library")?;
        let model_path = existing_path(&config.model_path, "ONNX model")?;
        let tokenizer_path = existing_path(&config.tokenizer_path, "tokenizer config")?;

        init_runtime(&runtime_path)?;

        let session = Session::builder()
            .map_err(|err| ort_failure("create session builder", err))?
            .commit_from_file(&model_path)
            .map_err(|err| ort_failure("load ONNX model", err))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|err| tokenizer_failure("load tokenizer", err))?;

        let pad_id = tokenizer
            .token_to_id("<pad>")
            .or_else(|| tokenizer.token_to_id("[PAD]"))
            .ok_or_else(|| EmbedderError::InvalidConfiguration {
                message: format!("tokenizer `{}` declares no padding token", tokenizer_path.display()),
            })? as i64;

        Ok(Self {
            info: EmbedderInfo {
                provider: ProviderKind::Onnx,
                embedding_model_id: config.embedding_model_id,
                dimension: config.dimension,
            },
            session: Mutex::new(session),
            tokenizer,
            pad_id,
            max_input_length: config.max_input_length,
            normalize: config.normalize,
        })
    }

    fn encode(&self, texts: &[&str]) -> Result<Vec<Encoding>, EmbedderError> {
        let encodings = texts
            .iter()
            .map(|t| self.tokenizer.encode(*t, true))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| tokenizer_failure("tokenize inputs", err))?;

        let longest = encodings.iter().map(Encoding::len).max().unwrap_or(0);
        if longest > self.max_input_length {
            return Err(EmbedderError::InputTooLong { max_length: self.max_input_length, actual_length: longest });
        }
        Ok(encodings)
    }

    fn tensors(&self, encodings: &[Encoding]) -> Result<Batch, EmbedderError> {
        let rows = encodings.len();
        let seq_len = encodings.iter().map(Encoding::len).max().unwrap_or(0);

        let mut ids = Array2::<i64>::from_elem((rows, seq_len), self.pad_id);
        let mut mask = Array2::<i64>::zeros((rows, seq_len));
        for (row, encoding) in encodings.iter().enumerate() {
            for (col, (&id, &m)) in encoding.get_ids().iter().zip(encoding.get_attention_mask()).enumerate() {
                ids[(row, col)] = id as i64;
                mask[(row, col)] = m as i64;
            }
        }
        let masks = mask.rows().into_iter().map(|r| r.to_vec()).collect();

        Ok(Batch {
            input_ids: Tensor::from_array(ids).map_err(|err| ort_failure("prepare input_ids", err))?,
            attention_mask: Tensor::from_array(mask).map_err(|err| ort_failure("prepare attention_mask", err))?,
            masks,
            seq_len,
        })
    }

    /// Runs the model and returns `(hidden states, batch, seq_len, hidden)`.
    fn run(&self, batch: Batch) -> Result<(Vec<f32>, Vec<Vec<i64>>, usize, usize), EmbedderError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbedderError::ProviderFailure { message: "ONNX session lock poisoned".into() })?;
        let outputs = session
            .run(ort::inputs![batch.input_ids, batch.attention_mask])
            .map_err(|err| ort_failure("execute ONNX session", err))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|err| ort_failure("extract output tensor", err))?;
        if shape.len() != 3 {
            return Err(EmbedderError::ProviderFailure {
                message: format!("model output must be [batch, seq_len, hidden], got rank {}", shape.len()),
            });
        }
        let rows = shape[0] as usize;
        let seq_len = shape[1] as usize;
        let hidden = shape[2] as usize;
        if rows != batch.masks.len() || seq_len != batch.seq_len {
            return Err(EmbedderError::ProviderFailure {
                message: format!("model returned shape [{rows}, {seq_len}, {hidden}] for batch of {} x {}", batch.masks.len(), batch.seq_len),
            });
        }
        Ok((data.to_vec(), batch.masks, seq_len, hidden))
    }

    fn pool(&self, data: &[f32], masks: &[Vec<i64>], seq_len: usize, hidden: usize) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if hidden != self.info.dimension {
            return Err(EmbedderError::ProviderFailure {
                message: format!("model hidden size {hidden} does not match configured dimension {}", self.info.dimension),
            });
        }
        let mut out = Vec::with_capacity(masks.len());
        for (b, mask) in masks.iter().enumerate() {
            let mut sum = vec![0f32; hidden];
            let mut count = 0f32;
            for t in 0..seq_len {
                if mask[t] != 1 { continue; }
                let base = (b * seq_len + t) * hidden;
                for (h, acc) in sum.iter_mut().enumerate() { *acc += data[base + h]; }
                count += 1.0;
            }
            if count > 0.0 { sum.iter_mut().for_each(|v| *v /= count); }
            if self.normalize { l2_normalize(&mut sum); }
            out.push(sum);
        }
        Ok(out)
    }
}

impl Embedder for OnnxEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| EmbedderError::ProviderFailure { message: "missing pooled output".into() })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let encodings = self.encode(texts)?;
        let batch = self.tensors(&encodings)?;
        let (data, masks, seq_len, hidden) = self.run(batch)?;
        self.pool(&data, &masks, seq_len, hidden)
    }

    fn info(&self) -> &EmbedderInfo {
        &self.info
    }
}

pub(crate) fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 { v.iter_mut().for_each(|x| *x /= norm); }
}

fn init_runtime(library: &Path) -> Result<(), EmbedderError> {
    if let Some(existing) = ORT_RUNTIME_PATH.get() {
        if existing != library {
            return Err(EmbedderError::InvalidConfiguration {
                message: format!(
                    "ONNX Runtime already initialized from `{}`; cannot switch to `{}`",
                    existing.display(),
                    library.display()
                ),
            });
        }
        return Ok(());
    }
    ort::init_from(library.to_string_lossy().to_string())
        .with_name("product-recommend")
        .commit()
        .map_err(|err| ort_failure("initialize ONNX Runtime environment", err))?;
    let _ = ORT_RUNTIME_PATH.set(library.to_path_buf());
    Ok(())
}

fn existing_path(path: &Path, description: &str) -> Result<PathBuf, EmbedderError> {
    if fs::metadata(path).is_err() {
        return Err(EmbedderError::InvalidConfiguration {
            message: format!("{description} `{}` does not exist", path.display()),
        });
    }
    path.canonicalize().map_err(|err| EmbedderError::ProviderFailure {
        message: format!("failed to canonicalize {description} `{}`: {err}", path.display()),
    })
}

fn ort_failure(context: &str, err: OrtError) -> EmbedderError {
    EmbedderError::ProviderFailure { message: format!("{context} failed: {err}") }
}

fn tokenizer_failure(context: &str, err: tokenizers::Error) -> EmbedderError {
    EmbedderError::ProviderFailure { message: format!("{context} failed: {err}") }
}
