//! Storage models and schema helpers for sdlc-assist-mcp.
//!
//! This crate defines the typed records decoded from the project store, the
//! physical table and column names, and the artifact catalog that maps each
//! artifact kind to its column and display label.

pub mod catalog;
pub mod models;
pub mod schema;

pub use catalog::{ArtifactKind, ArtifactSpec, DecodedArtifact};
pub use models::*;
