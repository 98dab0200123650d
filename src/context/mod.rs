//! Conversation memory for chat engines.
//!
//! - `DatabaseChatMemory`: per-channel memory over the transcript table
//! - `TokenWindow`: trims history to a token budget

pub mod memory;
pub mod window;

pub use memory::{ChatMemory, DatabaseChatMemory};
pub use window::TokenWindow;
