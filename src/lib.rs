pub mod bot;
pub mod chat;
pub mod context;
pub mod core;
pub mod db;
pub mod history;
pub mod llm;
pub mod rag;
pub mod state;
pub mod tickets;
