//! # Nightspot Core
//!
//! Shared logic for Nightspot: the venue data model, the similarity
//! backends, the tiered retrieval engine, and geo ranking.
//!
//! This crate performs no filesystem or network I/O of its own. Remote
//! embeddings enter through the [`embedding::EmbeddingProvider`] trait,
//! which the `nightspot` app crate implements over HTTP.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Venue records, coordinates, tiers, ranked results |
//! | [`corpus`] | Ordered, id-deduplicated venue table |
//! | [`embedding`] | Embedding provider trait and vector helpers |
//! | [`similarity`] | Embedding, TF-IDF, and keyword-overlap backends |
//! | [`retrieval`] | Tiered index build, degradation, and search |
//! | [`geo`] | Great-circle distance, proximity ranking, origin presets |
//! | [`projection`] | Normalized 2-D projection and ASCII minimap |

pub mod corpus;
pub mod embedding;
pub mod error;
pub mod geo;
pub mod models;
pub mod projection;
pub mod retrieval;
pub mod similarity;

pub use error::{Error, ProviderError, Result};
