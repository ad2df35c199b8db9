//! PDF text extraction.
//!
//! The document is parsed once with `lopdf`, then its pages are extracted in
//! chunks on blocking workers that share the parsed document. The number of
//! workers running at once is bounded by a semaphore shared across requests.
//! When per-page extraction finds no text the whole document goes through
//! `pdf-extract` instead. Results are cleaned and cached by content digest.

use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

/// Extracted documents kept in memory.
const CACHE_ENTRIES: usize = 64;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("could not read PDF: {0}")]
    Load(String),

    #[error("PDF contains no extractable text")]
    NoText,

    #[error("extraction worker failed: {0}")]
    Worker(String),
}

pub struct PdfExtractor {
    workers: Arc<Semaphore>,
    max_workers: usize,
    cache: Mutex<LruCache<String, String>>,
}

impl PdfExtractor {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        let capacity = NonZeroUsize::new(CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN);
        Self {
            workers: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn extract(&self, bytes: Bytes) -> Result<String, PdfError> {
        let key = format!("{:x}", Sha256::digest(&bytes));
        if let Some(text) = self.cache.lock().get(&key).cloned() {
            debug!("PDF text cache hit");
            return Ok(text);
        }

        let raw = match self.extract_pages(bytes.clone()).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("no text from per-page extraction, trying whole-document extraction");
                self.extract_whole(bytes).await?
            }
            Err(PdfError::Load(reason)) => {
                warn!("lopdf could not load document ({reason}), trying pdf-extract");
                self.extract_whole(bytes).await?
            }
            Err(e) => return Err(e),
        };

        let text = clean_text(&raw);
        if text.is_empty() {
            return Err(PdfError::NoText);
        }

        self.cache.lock().put(key, text.clone());
        Ok(text)
    }

    async fn extract_pages(&self, bytes: Bytes) -> Result<String, PdfError> {
        let doc = spawn_blocking(move || lopdf::Document::load_mem(&bytes))
            .await
            .map_err(|e| PdfError::Worker(e.to_string()))?
            .map_err(|e| PdfError::Load(e.to_string()))?;
        let doc = Arc::new(doc);

        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        if pages.is_empty() {
            return Ok(String::new());
        }

        let chunk_size = pages.len().div_ceil(self.max_workers);
        debug!(pages = pages.len(), chunk_size, "extracting PDF pages");

        let tasks = pages.chunks(chunk_size).map(|chunk| {
            let chunk = chunk.to_vec();
            let doc = Arc::clone(&doc);
            let workers = self.workers.clone();
            async move {
                let _permit = workers
                    .acquire_owned()
                    .await
                    .map_err(|e| PdfError::Worker(e.to_string()))?;
                spawn_blocking(move || extract_chunk(&doc, &chunk))
                    .await
                    .map_err(|e| PdfError::Worker(e.to_string()))
            }
        });

        let mut text = String::new();
        for chunk_text in join_all(tasks).await {
            text.push_str(&chunk_text?);
        }
        Ok(text)
    }

    async fn extract_whole(&self, bytes: Bytes) -> Result<String, PdfError> {
        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|e| PdfError::Worker(e.to_string()))?;
        // pdf-extract panics on some malformed files; the join error covers that.
        spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| PdfError::Worker(e.to_string()))?
            .map_err(|e| PdfError::Load(e.to_string()))
    }
}

/// Text of `pages` in page order, one line break after each non-empty page.
fn extract_chunk(doc: &lopdf::Document, pages: &[u32]) -> String {
    let mut text = String::new();
    for &page in pages {
        if let Ok(page_text) = doc.extract_text(&[page]) {
            if !page_text.trim().is_empty() {
                text.push_str(&page_text);
                text.push('\n');
            }
        }
    }
    text
}

static HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w)-\n\s*(\w)").expect("invalid hyphen break pattern"));

/// Normalizes extracted text: unified line endings, hyphenated breaks rejoined,
/// control characters dropped, whitespace runs collapsed, at most one blank line
/// in a row.
pub fn clean_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let joined = HYPHEN_BREAK.replace_all(&unified, "$1$2");

    let mut out: Vec<String> = Vec::new();
    for line in joined.lines() {
        let line: String = line
            .chars()
            .filter(|c| !c.is_control() || *c == '\t')
            .collect();
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() && out.last().map_or(true, |prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}
