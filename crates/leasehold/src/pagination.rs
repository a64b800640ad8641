use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::PaginationConfig;

/// Raw `?page=&page_size=` query parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// One-based page request clamped to the configured bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn normalize(page: Option<u32>, page_size: Option<u32>, config: &PaginationConfig) -> Self {
        let page = page.unwrap_or(1).max(1);
        let page_size = match page_size {
            None | Some(0) => config.default_page_size(),
            Some(size) => size.min(config.max_page_size()),
        };
        Self { page, page_size }
    }

    pub fn from_params(params: PageParams, config: &PaginationConfig) -> Self {
        Self::normalize(params.page, params.page_size, config)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.page_size as usize)
    }
}

/// A single page of results along with the numbers needed to navigate the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total_count: u64, page: u32, page_size: u32) -> Self {
        Self {
            items,
            total_count,
            page,
            page_size,
        }
    }

    /// Slice an already ordered collection down to the requested page.
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Self {
        let total_count = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.page_size() as usize)
            .collect();
        Self::new(items, total_count, request.page(), request.page_size())
    }

    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        let pages = self.total_count.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    pub fn map<U, F>(self, f: F) -> PaginatedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

impl<T: Serialize> Serialize for PaginatedResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PaginatedResult", 7)?;
        state.serialize_field("items", &self.items)?;
        state.serialize_field("total_count", &self.total_count)?;
        state.serialize_field("page", &self.page)?;
        state.serialize_field("page_size", &self.page_size)?;
        state.serialize_field("total_pages", &self.total_pages())?;
        state.serialize_field("has_next_page", &self.has_next_page())?;
        state.serialize_field("has_previous_page", &self.has_previous_page())?;
        state.end()
    }
}
