//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `Chunker`: splits documents into overlapping chunks
//! - `loader`: directory and web page readers
//! - `VectorIndex`: embeds, stores and retrieves chunks
//! - `ContextBuilder`: turns retrieved chunks into prompt context

mod context_builder;
mod engine;
mod index;
pub mod loader;
mod sqlite;
mod store;

pub use context_builder::ContextBuilder;
pub use engine::{strip_html_tags, Chunker, RAGConfig, TextChunk};
pub use index::VectorIndex;
pub use loader::Document;
pub use sqlite::SqliteVectorStore;
pub use store::{ChunkSearchResult, StoredChunk, VectorStore};
