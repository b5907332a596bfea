//! Core types and seams for lore-grounded generation.
//!
//! Everything model-specific lives behind the traits in [`traits`]; this crate
//! only knows how to load lore, format retrieved context and describe errors.

pub mod config;
pub mod context;
pub mod corpus;
pub mod error;
pub mod lazy;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
