/// Remote content retrieval and visible-text extraction
///
/// One GET per call, no retries. Redirects follow reqwest's default policy
/// (up to 10 hops). The returned text is capped at `MAX_CONTENT_CHARS`.

use crate::error::{PipelineError, PipelineResult};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

/// Hard cap on extracted text handed to the prompt composer
pub const MAX_CONTENT_CHARS: usize = 8000;

/// Elements whose text is never rendered
const HIDDEN_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// HTTP content fetcher
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: reqwest::Client,
}

impl ContentFetcher {
    /// Build a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Fetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Retrieve `url`, extract the body's visible text and truncate it
    pub async fn fetch(&self, url: &str) -> PipelineResult<String> {
        let html = self.retrieve(url).await?;
        extract_content(url, &html)
    }

    /// Single GET of `url`, returning the raw body on a success status
    pub async fn retrieve(&self, url: &str) -> PipelineResult<String> {
        tracing::debug!("🌍 Fetching content from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::Fetch(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Fetch(format!("GET {} returned status {}", url, status)));
        }

        response
            .text()
            .await
            .map_err(|e| PipelineError::Fetch(format!("failed to read body of {}: {}", url, e)))
    }
}

/// Visible text of `html`, capped at `MAX_CONTENT_CHARS`.
/// Fails with `EmptyContent` when nothing but whitespace is rendered.
pub fn extract_content(url: &str, html: &str) -> PipelineResult<String> {
    let text = extract_body_text(html);
    if text.trim().is_empty() {
        return Err(PipelineError::EmptyContent(url.to_string()));
    }

    let content = truncate_content(&text);
    tracing::debug!(
        "📄 Extracted {} characters from {} ({} kept)",
        text.chars().count(),
        url,
        content.chars().count()
    );

    Ok(content)
}

/// Concatenate every rendered text node under `<body>`, markup discarded
pub fn extract_body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();

    match Selector::parse("body") {
        Ok(selector) => match document.select(&selector).next() {
            Some(body) => collect_text(&body, &mut text),
            None => collect_text(&document.root_element(), &mut text),
        },
        Err(_) => collect_text(&document.root_element(), &mut text),
    }

    text
}

fn collect_text(element: &ElementRef, out: &mut String) {
    for node in element.children() {
        if let Some(child) = ElementRef::wrap(node) {
            if HIDDEN_TAGS.contains(&child.value().name()) {
                continue;
            }
            collect_text(&child, out);
        } else if let Some(text) = node.value().as_text() {
            out.push_str(text);
        }
    }
}

/// First `MAX_CONTENT_CHARS` characters of `text`
pub fn truncate_content(text: &str) -> String {
    match text.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
