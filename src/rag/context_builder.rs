//! Formats retrieved chunks into the context block of the system prompt.

use super::store::ChunkSearchResult;

const CONTEXT_HEADER: &str = "Context information is below.\n--------------------\n";
const CONTEXT_FOOTER: &str = "\n--------------------\n";

pub struct ContextBuilder {
    max_context_chars: usize,
}

impl ContextBuilder {
    pub fn new(max_context_chars: usize) -> Self {
        Self { max_context_chars }
    }

    /// Joins chunk texts (with their source) until the character budget is
    /// used up. Returns an empty string when nothing was retrieved.
    pub fn format_context(&self, results: &[ChunkSearchResult]) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut used = 0;

        for result in results {
            let part = format!("source: {}\n\n{}", result.chunk.source, result.chunk.content);
            let len = part.chars().count();
            if used + len > self.max_context_chars && !parts.is_empty() {
                break;
            }
            used += len;
            parts.push(part);
        }

        parts.join("\n\n")
    }

    /// System prompt followed by the retrieved context block.
    pub fn system_message(&self, system_prompt: &str, results: &[ChunkSearchResult]) -> String {
        let context = self.format_context(results);
        if context.is_empty() {
            return system_prompt.to_string();
        }
        format!("{}\n\n{}{}{}", system_prompt, CONTEXT_HEADER, context, CONTEXT_FOOTER)
    }
}
