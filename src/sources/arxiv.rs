//! arXiv source implementation.
//!
//! Talks to the arXiv query API and maps its Atom feed into [`RawEntry`]
//! values. Ref: <https://info.arxiv.org/help/api/user-manual.html>

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::sync::Arc;

use crate::models::{PageRequest, QueryTarget, RawEntry};
use crate::sources::{ArticleSource, SourceError};
use crate::utils::HttpClient;

/// Base URL for arXiv API
const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// Entry IDs under this path carry API errors instead of articles
const ARXIV_ERROR_ID: &str = "/api/errors";

/// arXiv article source
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: Arc<HttpClient>,
    base_url: String,
}

/// Entry child elements whose text is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    Updated,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"id" => Some(Field::Id),
            b"title" => Some(Field::Title),
            b"summary" => Some(Field::Summary),
            b"published" => Some(Field::Published),
            b"updated" => Some(Field::Updated),
            _ => None,
        }
    }

    fn slot<'a>(&self, entry: &'a mut RawEntry) -> &'a mut String {
        match self {
            Field::Id => &mut entry.id,
            Field::Title => &mut entry.title,
            Field::Summary => &mut entry.summary,
            Field::Published => &mut entry.published,
            Field::Updated => &mut entry.updated,
        }
    }
}

impl ArxivSource {
    /// Create a new arXiv source
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?)))
    }

    /// Create with a custom HTTP client
    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: ARXIV_API_URL.to_string(),
        }
    }

    /// Point the source at another endpoint (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the query URL for one page request
    fn build_url(&self, request: &PageRequest) -> String {
        let target = match &request.target {
            QueryTarget::Expression(expression) => {
                format!("search_query={}", urlencoding::encode(expression))
            }
            QueryTarget::IdList(ids) => {
                format!("id_list={}", urlencoding::encode(&ids.join(",")))
            }
        };

        format!(
            "{}?{}&start={}&max_results={}&sortBy={}&sortOrder={}",
            self.base_url,
            target,
            request.start,
            request.max_results,
            request.sort_by.as_str(),
            request.sort_order.as_str()
        )
    }

    /// Parse an arXiv Atom feed into raw entries
    pub fn parse_feed(xml: &str) -> Result<Vec<RawEntry>, SourceError> {
        let mut reader = Reader::from_str(xml);
        let mut entries = Vec::new();
        let mut current: Option<RawEntry> = None;
        let mut field: Option<Field> = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    let name = e.local_name();
                    match name.as_ref() {
                        b"entry" => current = Some(RawEntry::default()),
                        b"category" | b"primary_category" => {
                            if let Some(entry) = current.as_mut() {
                                push_category(entry, e);
                            }
                            field = None;
                        }
                        other => {
                            field = current.as_ref().and(Field::from_local_name(other));
                        }
                    }
                }
                Event::Empty(ref e) => {
                    if let Some(entry) = current.as_mut() {
                        push_category(entry, e);
                    }
                }
                Event::Text(ref t) => {
                    if let (Some(entry), Some(field)) = (current.as_mut(), field) {
                        let text = t
                            .unescape()
                            .map_err(|e| SourceError::Parse(format!("XML text: {}", e)))?;
                        field.slot(entry).push_str(&text);
                    }
                }
                Event::CData(ref c) => {
                    if let (Some(entry), Some(field)) = (current.as_mut(), field) {
                        field.slot(entry).push_str(&String::from_utf8_lossy(c));
                    }
                }
                Event::End(ref e) => {
                    if e.local_name().as_ref() == b"entry" {
                        if let Some(entry) = current.take() {
                            if entry.id.contains(ARXIV_ERROR_ID) {
                                return Err(SourceError::Api(entry.summary.trim().to_string()));
                            }
                            entries.push(trimmed(entry));
                        }
                    }
                    field = None;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(entries)
    }
}

/// Record `<category term=..>` and `<arxiv:primary_category term=..>` elements
fn push_category(entry: &mut RawEntry, element: &BytesStart<'_>) {
    let term = element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"term")
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned());

    let Some(term) = term else {
        return;
    };

    match element.local_name().as_ref() {
        b"primary_category" => entry.primary_category = Some(term),
        b"category" => entry.categories.push(term),
        _ => {}
    }
}

/// Trim surrounding whitespace but keep interior line wraps for normalization
fn trimmed(mut entry: RawEntry) -> RawEntry {
    entry.id = entry.id.trim().to_string();
    entry.title = entry.title.trim().to_string();
    entry.summary = entry.summary.trim().to_string();
    entry.published = entry.published.trim().to_string();
    entry.updated = entry.updated.trim().to_string();
    entry
}

#[async_trait]
impl ArticleSource for ArxivSource {
    fn name(&self) -> &str {
        "arXiv"
    }

    async fn query(&self, request: &PageRequest) -> Result<Vec<RawEntry>, SourceError> {
        if let QueryTarget::IdList(ids) = &request.target {
            if ids.is_empty() {
                return Err(SourceError::InvalidRequest("Empty ID list".to_string()));
            }
        }

        let url = self.build_url(request);
        tracing::debug!("Requesting {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/atom+xml")
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch arXiv results: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "arXiv API returned status: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

        Self::parse_feed(&body)
    }
}
