pub mod embeddings;
pub mod fallback;
pub mod lexical;
pub mod search;
pub mod similarity;
