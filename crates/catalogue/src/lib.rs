//! Catalogue - hybrid relevance ranking for the government AI register
//!
//! Records are ranked against a free-text query by combining cosine similarity
//! of precomputed embeddings with a bounded keyword-overlap bonus. When the
//! embedding path is unavailable, search degrades to substring matching.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::CatalogueConfig;
pub use error::{ConfigError, DatasetError, EmbeddingError};
pub use models::{Dataset, Locale, Record, RecordFilter};
pub use services::embeddings::{EmbeddingProvider, Encoder, EncoderLoader};
pub use services::search::{HybridRanker, ScoredRecord, SearchResults, SelectionPolicy};
