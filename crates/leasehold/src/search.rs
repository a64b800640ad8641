//! Contracts for the external full-text search service.

use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::config::PaginationConfig;
use crate::pagination::PageRequest;
use crate::values::DomainError;

/// Query forwarded to the search service.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    index: String,
    text: String,
    filters: BTreeMap<String, String>,
    page: PageRequest,
}

impl SearchQuery {
    pub fn new(
        index: &str,
        text: &str,
        page: Option<u32>,
        page_size: Option<u32>,
        pagination: &PaginationConfig,
    ) -> Result<Self, DomainError> {
        let index = index.trim();
        if index.is_empty() {
            return Err(DomainError::validation("index", "must not be empty"));
        }
        Ok(Self {
            index: index.to_string(),
            text: text.trim().to_string(),
            filters: BTreeMap::new(),
            page: PageRequest::normalize(page, page_size, pagination),
        })
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    pub fn page(&self) -> PageRequest {
        self.page
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationBucket {
    pub key: String,
    pub doc_count: u64,
}

/// One page of hits returned by the search service.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultDto<T> {
    pub documents: Vec<T>,
    pub total_hits: u64,
    pub page: u32,
    pub page_size: u32,
    pub max_score: Option<f64>,
    /// Milliseconds the search service spent on the query.
    pub took: u64,
    pub aggregations: BTreeMap<String, Vec<AggregationBucket>>,
}

impl<T> SearchResultDto<T> {
    pub fn empty(query: &SearchQuery) -> Self {
        Self {
            documents: Vec::new(),
            total_hits: 0,
            page: query.page().page(),
            page_size: query.page().page_size(),
            max_score: None,
            took: 0,
            aggregations: BTreeMap::new(),
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        let pages = self.total_hits.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn map<U, F>(self, f: F) -> SearchResultDto<U>
    where
        F: FnMut(T) -> U,
    {
        SearchResultDto {
            documents: self.documents.into_iter().map(f).collect(),
            total_hits: self.total_hits,
            page: self.page,
            page_size: self.page_size,
            max_score: self.max_score,
            took: self.took,
            aggregations: self.aggregations,
        }
    }
}

impl<T: Serialize> Serialize for SearchResultDto<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SearchResultDto", 8)?;
        state.serialize_field("documents", &self.documents)?;
        state.serialize_field("total_hits", &self.total_hits)?;
        state.serialize_field("page", &self.page)?;
        state.serialize_field("page_size", &self.page_size)?;
        state.serialize_field("max_score", &self.max_score)?;
        state.serialize_field("took", &self.took)?;
        state.serialize_field("aggregations", &self.aggregations)?;
        state.serialize_field("total_pages", &self.total_pages())?;
        state.end()
    }
}

/// Client for the hosted search service.
pub trait SearchClient: Send + Sync {
    fn search(&self, query: &SearchQuery) -> Result<SearchResultDto<Value>, SearchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search index '{0}' does not exist")]
    UnknownIndex(String),
    #[error("search service unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected search document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Run a query and decode each hit into `T`.
pub fn search_typed<C, T>(client: &C, query: &SearchQuery) -> Result<SearchResultDto<T>, SearchError>
where
    C: SearchClient + ?Sized,
    T: for<'de> Deserialize<'de>,
{
    let raw = client.search(query)?;
    let documents = raw
        .documents
        .iter()
        .cloned()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()?;

    Ok(SearchResultDto {
        documents,
        total_hits: raw.total_hits,
        page: raw.page,
        page_size: raw.page_size,
        max_score: raw.max_score,
        took: raw.took,
        aggregations: raw.aggregations,
    })
}
