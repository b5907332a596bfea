//! lorerag-pipeline
//!
//! Retrieval-augmented pipelines over the lore index: prompt enrichment for
//! image synthesis and image-to-story composition.

pub mod artifacts;
pub mod enrich;
pub mod imagine;
pub mod library;
pub mod prompts;
pub mod retriever;
pub mod story;

pub use enrich::PromptEnricher;
pub use imagine::ImaginePipeline;
pub use library::{BuildReport, LoreLibrary};
pub use retriever::LoreRetriever;
pub use story::StoryComposer;
