//! # Pagination
//!
//! Page requests in, page envelopes out.
//!
//! ```text
//! PageRequest { page: 3, limit: 10 }  ──►  OFFSET 20 LIMIT 10
//!
//! total_results = 41  ──►  total_pages = ceil(41 / 10) = 5
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::{validate_search_query, ValidationResult};
use crate::{DEFAULT_PAGE, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

/// Which page of a listing to return, plus optional free-text search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PageRequest {
    /// 1-based.
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub search: Option<String>,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_LIMIT,
            search: None,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        PageRequest {
            page,
            limit,
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Checks bounds and normalises the search term (trimmed, blank → None).
    pub fn validate(&self) -> ValidationResult<PageRequest> {
        if self.page < 1 {
            return Err(ValidationError::OutOfRange {
                field: "page".to_string(),
                min: 1,
                max: i64::from(u32::MAX),
            });
        }
        if self.limit < 1 || self.limit > MAX_PAGE_LIMIT {
            return Err(ValidationError::OutOfRange {
                field: "limit".to_string(),
                min: 1,
                max: i64::from(MAX_PAGE_LIMIT),
            });
        }
        let search = match &self.search {
            Some(s) => validate_search_query(s)?,
            None => None,
        };

        Ok(PageRequest {
            page: self.page,
            limit: self.limit,
            search,
        })
    }

    /// Rows to skip.
    #[inline]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

/// One page of results and the counts needed to render a pager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total_results: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, request: &PageRequest, total_results: i64) -> Self {
        Page {
            results,
            page: request.page,
            limit: request.limit,
            total_results,
            total_pages: total_pages(total_results, request.limit),
        }
    }
}

/// `ceil(total / limit)`; zero when there is nothing to show.
pub fn total_pages(total_results: i64, limit: u32) -> i64 {
    if limit == 0 || total_results <= 0 {
        return 0;
    }
    let limit = i64::from(limit);
    (total_results + limit - 1) / limit
}
