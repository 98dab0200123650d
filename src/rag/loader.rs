//! Document readers for local directories and web pages.

use std::path::Path;
use std::time::Duration;

use walkdir::{DirEntry, WalkDir};

use super::engine::strip_html_tags;
use crate::core::errors::BotError;

const TEXT_EXTENSIONS: [&str; 18] = [
    "txt", "md", "markdown", "rst", "html", "htm", "csv", "json", "yaml", "yml", "toml", "log",
    "py", "rs", "go", "js", "ts", "sh",
];

/// A loaded document before chunking.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    /// File path or URL
    pub source: String,
}

/// Reads every supported text file in `dir`. Hidden entries are skipped.
pub fn load_directory(dir: &Path, recursive: bool) -> Result<Vec<Document>, BotError> {
    if !dir.is_dir() {
        return Err(BotError::Validation(format!(
            "{} is not a valid directory",
            dir.display()
        )));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut documents = Vec::new();

    let walker = WalkDir::new(dir)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_supported(entry.path()) {
            continue;
        }

        match std::fs::read_to_string(entry.path()) {
            Ok(raw) => {
                let text = if is_html_path(entry.path()) {
                    strip_html_tags(&raw)
                } else {
                    raw
                };
                if text.trim().is_empty() {
                    continue;
                }
                documents.push(Document {
                    text,
                    source: entry.path().display().to_string(),
                });
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", entry.path().display(), e);
            }
        }
    }

    if documents.is_empty() {
        return Err(BotError::Validation(format!(
            "No files found in {}",
            dir.display()
        )));
    }

    Ok(documents)
}

/// Fetches a single page and reduces HTML to plain text.
pub async fn fetch_url(url: &str, timeout: Duration) -> Result<Document, BotError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| BotError::Validation(format!("invalid url {}: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(BotError::Validation(format!(
            "unsupported url scheme: {}",
            parsed.scheme()
        )));
    }

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(BotError::internal)?;

    let response = client
        .get(parsed)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| BotError::Internal(format!("failed to fetch {}: {}", url, e)))?;

    let is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("html"))
        .unwrap_or(false);

    let body = response.text().await.map_err(BotError::internal)?;
    let text = if is_html || body.trim_start().starts_with('<') {
        strip_html_tags(&body)
    } else {
        body
    };

    Ok(Document {
        text,
        source: url.to_string(),
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_html_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
        .unwrap_or(false)
}
