//! lorerag-index
//!
//! The in-memory lore index: atomic rebuilds and exact k-nearest-neighbour
//! retrieval over chunk embeddings.

pub mod distance;
pub mod index;

pub use index::{IndexStats, LoreIndex};
