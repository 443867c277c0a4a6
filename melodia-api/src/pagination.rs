//! Pagination parameters
//!
//! Every list endpoint takes `skip` (default 0) and `limit` (default 20,
//! at most 100).

use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Validated offset and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

/// Raw `?skip=&limit=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn page(self) -> ApiResult<Page> {
        check_page(self.skip, self.limit)
    }
}

/// Apply defaults and bounds
pub fn check_page(skip: Option<i64>, limit: Option<i64>) -> ApiResult<Page> {
    let skip = skip.unwrap_or(0);
    let limit = limit.unwrap_or(DEFAULT_LIMIT);

    if skip < 0 {
        return Err(ApiError::validation("skip", "skip must be 0 or greater"));
    }
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::validation(
            "limit",
            format!("limit must be between 1 and {}", MAX_LIMIT),
        ));
    }

    Ok(Page { skip, limit })
}
