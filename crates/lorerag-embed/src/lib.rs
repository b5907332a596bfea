//! lorerag-embed
//!
//! Sentence embeddings for lore chunks and queries: a candle BERT embedder,
//! a hashing fake for tests, and the load-once [`EmbeddingProvider`].

pub mod device;
pub mod fake;
pub mod minilm;
pub mod model_dir;
pub mod pool;
pub mod provider;
pub mod tokenize;

pub use device::select_device;
pub use fake::FakeEmbedder;
pub use minilm::MiniLmEmbedder;
pub use pool::masked_mean_l2;
pub use provider::EmbeddingProvider;
