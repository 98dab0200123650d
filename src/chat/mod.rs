//! Retrieval-augmented chat: per-conversation engines behind a shared index.

pub mod engine;
pub mod pipeline;

pub use engine::{ContextChatEngine, EngineSettings};
pub use pipeline::RagChatPipeline;
