//! Chunking for document ingestion.
//!
//! Splits documents into overlapping, sentence-aligned chunks and strips
//! markup from fetched web pages.

use serde::{Deserialize, Serialize};

use crate::core::config::defaults::*;

/// Configuration for ingestion and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RAGConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per query
    pub similarity_top_k: usize,
    /// Inputs per embedding request
    pub embed_batch_size: usize,
    /// Timeout for web requests in seconds
    pub web_timeout_secs: u64,
    /// Whether directory ingestion descends into subdirectories
    pub recursive: bool,
}

impl Default for RAGConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            similarity_top_k: DEFAULT_SIMILARITY_TOP_K,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            web_timeout_secs: DEFAULT_WEB_TIMEOUT_SECS,
            recursive: false,
        }
    }
}

/// A text chunk with source information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    /// Source identifier (URL, file path)
    pub source: String,
    /// Character offset in original document
    pub start_offset: usize,
    /// Chunk index within the source
    pub chunk_index: usize,
}

pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
        }
    }

    pub fn from_config(config: &RAGConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split text into overlapping chunks, preferring sentence boundaries.
    pub fn split(&self, text: &str, source: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let mut chunks = Vec::new();

        if total_chars == 0 {
            return chunks;
        }

        let mut start = 0;
        let mut chunk_index = 0;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let chunk_text: String = chars[start..end].iter().collect();

            let final_text = if end < total_chars {
                find_sentence_boundary(&chunk_text)
            } else {
                chunk_text
            };

            let kept_chars = final_text.chars().count();
            let trimmed = final_text.trim();
            if !trimmed.is_empty() {
                let leading = kept_chars - final_text.trim_start().chars().count();
                chunks.push(TextChunk {
                    text: trimmed.to_string(),
                    source: source.to_string(),
                    start_offset: start + leading,
                    chunk_index,
                });
                chunk_index += 1;
            }

            if end == total_chars {
                break;
            }
            // next chunk starts `chunk_overlap` before the end of what was kept
            start = (start + kept_chars)
                .saturating_sub(self.chunk_overlap)
                .max(start + 1);
        }

        chunks
    }
}

/// Cut the chunk after the last sentence ending in its final 20%.
fn find_sentence_boundary(text: &str) -> String {
    let sentence_endings = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let mut search_start = (text.len() * 80) / 100;
    while !text.is_char_boundary(search_start) {
        search_start += 1;
    }
    let search_text = &text[search_start..];

    let cut = sentence_endings
        .iter()
        .filter_map(|ending| search_text.rfind(ending).map(|pos| pos + ending.len()))
        .max();

    match cut {
        Some(pos) => text[..search_start + pos].to_string(),
        None => text.to_string(),
    }
}

/// Strips tags, scripts and styles from an HTML page.
pub fn strip_html_tags(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    let mut skip_until: Option<&str> = None;

    let lower = html.to_lowercase();
    // to_lowercase can change byte lengths; fall back to the original text
    let lower = if lower.len() == html.len() { lower } else { html.to_string() };

    let mut i = 0;
    while i < html.len() {
        let rest = lower.get(i..).unwrap_or("");

        if let Some(end_tag) = skip_until {
            if rest.starts_with(end_tag) {
                skip_until = None;
                i += end_tag.len();
            } else {
                i += next_char_len(html, i);
            }
            continue;
        }

        if rest.starts_with("<script") {
            skip_until = Some("</script>");
            continue;
        }
        if rest.starts_with("<style") {
            skip_until = Some("</style>");
            continue;
        }

        let len = next_char_len(html, i);
        let c = &html[i..i + len];
        if c == "<" {
            in_tag = true;
        } else if c == ">" {
            in_tag = false;
        } else if !in_tag {
            result.push_str(c);
        }
        i += len;
    }

    result
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn next_char_len(text: &str, at: usize) -> usize {
    text[at..].chars().next().map(char::len_utf8).unwrap_or(1)
}
