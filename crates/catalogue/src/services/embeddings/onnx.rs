//! Sentence-transformer encoder running on ONNX Runtime
//!
//! Model and tokenizer files come from the Hugging Face hub (cached locally
//! by `hf-hub`). Token embeddings are mean-pooled over the attention mask and
//! normalized to unit length.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use hf_hub::api::tokio::Api;
use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;

use super::{Encoder, EncoderLoader};
use crate::error::EmbeddingError;
use crate::services::similarity;

const TOKENIZER_FILE: &str = "tokenizer.json";
const MODEL_FILE: &str = "onnx/model.onnx";
const MAX_SEQUENCE_LENGTH: usize = 256;

pub struct OnnxEncoder {
  model: String,
  dimension: usize,
  session: Arc<Mutex<Session>>,
  tokenizer: Arc<Tokenizer>,
}

struct ModelFiles {
  tokenizer_file: PathBuf,
  model_path: PathBuf,
}

// Model initialization
#[cfg(not(tarpaulin_include))]
impl OnnxEncoder {
  /// Download (or reuse cached) model files and build the runtime session
  pub async fn load(model: &str) -> Result<Self> {
    let files = download_model(model).await?;

    let (session, tokenizer, dimension) = tokio::task::spawn_blocking(move || -> Result<_> {
      let tokenizer = load_tokenizer(&files.tokenizer_file)?;
      let mut session = load_session(&files.model_path)?;
      // Embed once so the output dimension is known up front
      let dimension = embed_with(&mut session, &tokenizer, "dimension check")?.len();
      Ok((session, tokenizer, dimension))
    })
    .await
    .map_err(|e| anyhow!("Model loading task failed: {e}"))??;

    Ok(Self {
      model: model.to_string(),
      dimension,
      session: Arc::new(Mutex::new(session)),
      tokenizer: Arc::new(tokenizer),
    })
  }
}

#[cfg(not(tarpaulin_include))]
async fn download_model(model: &str) -> Result<ModelFiles> {
  let api = Api::new().map_err(|e| anyhow!("HF API initialization failed: {e}"))?;
  let repo = api.model(model.to_string());

  bentley::verbose!("Fetching {TOKENIZER_FILE} from {model}");
  let tokenizer_file =
    repo.get(TOKENIZER_FILE).await.map_err(|e| anyhow!("Failed to download tokenizer: {e}"))?;

  bentley::verbose!("Fetching {MODEL_FILE} from {model}");
  let model_path =
    repo.get(MODEL_FILE).await.map_err(|e| anyhow!("Failed to download ONNX model: {e}"))?;

  Ok(ModelFiles { tokenizer_file, model_path })
}

#[cfg(not(tarpaulin_include))]
fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
  Tokenizer::from_file(path).map_err(|e| anyhow!("Failed to load tokenizer: {e}"))
}

#[cfg(not(tarpaulin_include))]
fn load_session(model_path: &Path) -> Result<Session> {
  let session = Session::builder()?
    .with_optimization_level(GraphOptimizationLevel::Level1)?
    .with_intra_threads(1)?
    .commit_from_file(model_path)?;
  Ok(session)
}

// Embedding processing
#[cfg(not(tarpaulin_include))]
fn embed_with(session: &mut Session, tokenizer: &Tokenizer, text: &str) -> Result<Vec<f32>> {
  let encoding = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {e}"))?;

  let length = encoding.get_ids().len().min(MAX_SEQUENCE_LENGTH);
  let ids = &encoding.get_ids()[..length];
  let mask = &encoding.get_attention_mask()[..length];
  let type_ids = &encoding.get_type_ids()[..length];

  let input_names: Vec<String> =
    session.inputs.iter().map(|input| input.name.to_string()).collect();

  let mut input: HashMap<String, Value> = HashMap::new();
  input.insert("input_ids".to_string(), to_tensor(ids)?);
  input.insert("attention_mask".to_string(), to_tensor(mask)?);
  if input_names.iter().any(|name| name == "token_type_ids") {
    input.insert("token_type_ids".to_string(), to_tensor(type_ids)?);
  }

  let outputs = session.run(input)?;
  let output = outputs
    .get("last_hidden_state")
    .or_else(|| outputs.get("token_embeddings"))
    .ok_or_else(|| {
      anyhow!("No output found from model - expected 'last_hidden_state' or 'token_embeddings'")
    })?;

  let (shape, data) = output.try_extract_tensor::<f32>()?;
  let pooled = mean_pool(shape.as_ref(), data, mask)?;
  Ok(similarity::normalize(pooled))
}

fn to_tensor(values: &[u32]) -> Result<Value> {
  let ids: Vec<i64> = values.iter().map(|&x| i64::from(x)).collect();
  let array: Array2<i64> = Array2::from_shape_vec((1, values.len()), ids)?;
  let tensor: Value = Value::from_array(array)?.into();
  Ok(tensor)
}

/// Average token embeddings over the attended positions of a `[1, seq, hidden]` tensor
pub fn mean_pool(shape: &[i64], data: &[f32], attention_mask: &[u32]) -> Result<Vec<f32>> {
  if shape.len() != 3 {
    bail!("Expected a [batch, sequence, hidden] tensor, got shape {shape:?}");
  }

  let seq_length = shape[1] as usize;
  let hidden_size = shape[2] as usize;
  if data.len() < seq_length * hidden_size {
    bail!("Tensor data too short for shape {shape:?}");
  }

  let mut pooled = vec![0.0f32; hidden_size];
  let mut attended = 0usize;
  for token_idx in 0..seq_length {
    if attention_mask.get(token_idx).copied().unwrap_or(1) == 0 {
      continue;
    }
    attended += 1;
    let start = token_idx * hidden_size;
    for (i, &value) in data[start..start + hidden_size].iter().enumerate() {
      pooled[i] += value;
    }
  }

  if attended == 0 {
    bail!("No attended tokens to pool");
  }

  for value in pooled.iter_mut() {
    *value /= attended as f32;
  }

  Ok(pooled)
}

#[async_trait]
impl Encoder for OnnxEncoder {
  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    let session = Arc::clone(&self.session);
    let tokenizer = Arc::clone(&self.tokenizer);
    let text = text.to_string();

    tokio::task::spawn_blocking(move || {
      let mut guard = session.lock().map_err(|_| anyhow!("Failed to lock model session"))?;
      embed_with(&mut guard, &tokenizer, &text)
    })
    .await
    .map_err(|e| EmbeddingError::Encoding(format!("encoding task failed: {e}")))?
    .map_err(|e| EmbeddingError::Encoding(format!("{e:#}")))
  }

  fn dimension(&self) -> usize {
    self.dimension
  }

  fn name(&self) -> &str {
    &self.model
  }
}

pub struct OnnxLoader {
  model: String,
}

impl OnnxLoader {
  pub fn new(model: &str) -> Self {
    Self { model: model.to_string() }
  }
}

#[async_trait]
impl EncoderLoader for OnnxLoader {
  async fn load(&self) -> Result<Arc<dyn Encoder>, EmbeddingError> {
    let encoder = OnnxEncoder::load(&self.model)
      .await
      .map_err(|e| EmbeddingError::Initialization(format!("{e:#}")))?;
    Ok(Arc::new(encoder))
  }

  fn describe(&self) -> String {
    format!("onnx, {}", self.model)
  }
}
