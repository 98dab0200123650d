//! Token-budgeted view over a conversation history.
//!
//! The window keeps the newest suffix of the history that fits the budget and
//! never starts on an assistant turn, so the model always sees the question
//! that led to an answer.

use crate::llm::types::{ChatMessage, Role};

/// Rough per-message framing cost (role markers, separators).
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct TokenWindow {
    token_limit: usize,
}

impl TokenWindow {
    pub fn new(token_limit: usize) -> Self {
        Self { token_limit }
    }

    pub fn token_limit(&self) -> usize {
        self.token_limit
    }

    /// Tokens left for history once `reserved` tokens are set aside.
    pub fn available_tokens(&self, reserved: usize) -> usize {
        self.token_limit.saturating_sub(reserved)
    }

    pub fn fit(&self, messages: Vec<ChatMessage>, reserved: usize) -> Vec<ChatMessage> {
        let budget = self.available_tokens(reserved);
        if budget == 0 || messages.is_empty() {
            return Vec::new();
        }

        let mut used = 0;
        let mut start = messages.len();
        for (idx, msg) in messages.iter().enumerate().rev() {
            let tokens = message_tokens(msg);
            if used + tokens > budget {
                break;
            }
            used += tokens;
            start = idx;
        }

        while start < messages.len() && messages[start].role == Role::Assistant {
            start += 1;
        }

        messages.into_iter().skip(start).collect()
    }

    pub fn total_tokens(&self, messages: &[ChatMessage]) -> usize {
        messages.iter().map(message_tokens).sum()
    }
}

pub fn message_tokens(message: &ChatMessage) -> usize {
    estimate_tokens(&message.content) + MESSAGE_OVERHEAD_TOKENS
}

/// ~4 bytes per token for English text.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() + 3) / 4
}
