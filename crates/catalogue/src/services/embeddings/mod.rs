//! Query embedding: encoder abstractions and the lazily-initialized provider
//!
//! Building an encoder is slow (model download, runtime setup), so the
//! provider builds it at most once. Every caller that arrives while the build
//! is underway awaits the same shared pending result instead of starting its
//! own build.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use crate::config::{CatalogueConfig, EncoderKind};
use crate::error::EmbeddingError;
use crate::services::similarity;

pub mod histogram;
#[cfg(feature = "ml-features")]
pub mod onnx;

pub use histogram::{HistogramEncoder, HistogramLoader};

/// Turns text into a fixed-length vector
#[async_trait]
pub trait Encoder: Send + Sync {
  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

  /// Length of the vectors this encoder produces
  fn dimension(&self) -> usize;

  fn name(&self) -> &str;
}

/// Builds an encoder; this is the slow, failure-prone step
#[async_trait]
pub trait EncoderLoader: Send + Sync {
  async fn load(&self) -> Result<Arc<dyn Encoder>, EmbeddingError>;

  fn describe(&self) -> String;
}

type PendingEncoder = Shared<BoxFuture<'static, Result<Arc<dyn Encoder>, EmbeddingError>>>;

pub struct EmbeddingProvider {
  loader: Arc<dyn EncoderLoader>,
  pending: Mutex<Option<PendingEncoder>>,
  attempts: AtomicUsize,
}

static GLOBAL: OnceLock<Arc<EmbeddingProvider>> = OnceLock::new();

impl EmbeddingProvider {
  pub fn new(loader: Arc<dyn EncoderLoader>) -> Self {
    Self { loader, pending: Mutex::new(None), attempts: AtomicUsize::new(0) }
  }

  pub fn from_config(config: &CatalogueConfig) -> Self {
    Self::new(loader_for(config))
  }

  /// Process-wide provider for the command-line tools
  ///
  /// The configuration passed on the first call wins. Library callers should
  /// construct and inject their own provider instead.
  pub fn global(config: &CatalogueConfig) -> Arc<Self> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::from_config(config))))
  }

  /// Get the encoder, building it on first use
  ///
  /// Concurrent callers during the first build all receive the same instance.
  /// A failed build is reported to everyone waiting on it and stays failed
  /// until [`reset`](Self::reset) is called.
  pub async fn get_encoder(&self) -> Result<Arc<dyn Encoder>, EmbeddingError> {
    let pending = self.pending_handle()?;
    pending.await
  }

  /// Encode text into a unit-length vector of the encoder's declared dimension
  pub async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    let encoder = self.get_encoder().await?;
    let vector = encoder.embed(text).await?;
    validate_vector(&vector, encoder.dimension())?;
    Ok(similarity::normalize(vector))
  }

  /// Build the encoder ahead of the first query and report how long it took
  pub async fn warm_up(&self) -> Result<Duration, EmbeddingError> {
    let started = Instant::now();
    self.get_encoder().await?;
    Ok(started.elapsed())
  }

  /// True once an encoder has been built successfully
  pub fn is_ready(&self) -> bool {
    self
      .pending
      .lock()
      .map(|guard| matches!(guard.as_ref().and_then(|p| p.peek()), Some(Ok(_))))
      .unwrap_or(false)
  }

  /// Forget the current encoder or failure so the next call builds afresh
  ///
  /// Callers already awaiting an in-flight build still receive its result.
  pub fn reset(&self) {
    if let Ok(mut guard) = self.pending.lock() {
      *guard = None;
    }
  }

  /// Number of builds started over this provider's lifetime
  pub fn initialization_attempts(&self) -> usize {
    self.attempts.load(Ordering::SeqCst)
  }

  fn pending_handle(&self) -> Result<PendingEncoder, EmbeddingError> {
    let mut guard = self
      .pending
      .lock()
      .map_err(|_| EmbeddingError::Initialization("encoder state lock poisoned".to_string()))?;

    if let Some(pending) = guard.as_ref() {
      return Ok(pending.clone());
    }

    self.attempts.fetch_add(1, Ordering::SeqCst);
    let pending = build_encoder(Arc::clone(&self.loader)).boxed().shared();
    *guard = Some(pending.clone());
    Ok(pending)
  }
}

async fn build_encoder(loader: Arc<dyn EncoderLoader>) -> Result<Arc<dyn Encoder>, EmbeddingError> {
  let started = Instant::now();
  bentley::info!("Initializing embedding model ({})...", loader.describe());

  let result = loader.load().await;
  match &result {
    Ok(encoder) => bentley::success!(
      "Embedding model {} ready ({} dimensions) in {}",
      encoder.name(),
      encoder.dimension(),
      bentley::format_elapsed(started.elapsed())
    ),
    Err(e) => bentley::error!("{e}"),
  }
  result
}

fn validate_vector(vector: &[f32], dimension: usize) -> Result<(), EmbeddingError> {
  if vector.is_empty() {
    return Err(EmbeddingError::Encoding("encoder returned an empty vector".to_string()));
  }
  if vector.len() != dimension {
    return Err(EmbeddingError::Encoding(format!(
      "encoder returned {} values but declares {dimension} dimensions",
      vector.len()
    )));
  }
  if vector.iter().any(|x| !x.is_finite()) {
    return Err(EmbeddingError::Encoding("encoder returned non-finite values".to_string()));
  }
  Ok(())
}

fn loader_for(config: &CatalogueConfig) -> Arc<dyn EncoderLoader> {
  match config.encoder {
    EncoderKind::Histogram => Arc::new(HistogramLoader::new(config.histogram_dimension)),
    #[cfg(feature = "ml-features")]
    EncoderKind::Onnx => Arc::new(onnx::OnnxLoader::new(&config.model)),
    #[cfg(not(feature = "ml-features"))]
    EncoderKind::Onnx => Arc::new(UnavailableLoader),
  }
}

/// Stands in for the ONNX encoder in builds without `ml-features`
#[cfg(not(feature = "ml-features"))]
struct UnavailableLoader;

#[cfg(not(feature = "ml-features"))]
#[async_trait]
impl EncoderLoader for UnavailableLoader {
  async fn load(&self) -> Result<Arc<dyn Encoder>, EmbeddingError> {
    Err(EmbeddingError::Initialization("ML features not available in this build".to_string()))
  }

  fn describe(&self) -> String {
    "onnx (unavailable)".to_string()
  }
}
