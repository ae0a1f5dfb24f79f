//! Pagination windows and the search result envelope.

use serde::{Deserialize, Serialize};

/// Window of rows requested by a search.
///
/// Both forms are normalised on construction: `page` and `limit` are at
/// least 1 and `offset` is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    Page { page: u32, limit: u32 },
    Offset { limit: u32, offset: u64 },
}

impl Pagination {
    pub fn page(page: u32, limit: u32) -> Self {
        Self::Page {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn offset(limit: u32, offset: u64) -> Self {
        Self::Offset {
            limit: limit.max(1),
            offset,
        }
    }

    pub fn limit(&self) -> u32 {
        match *self {
            Self::Page { limit, .. } | Self::Offset { limit, .. } => limit,
        }
    }

    /// Rows skipped before the window: `(page - 1) * limit` for page-based requests.
    pub fn offset_rows(&self) -> u64 {
        match *self {
            Self::Page { page, limit } => u64::from(page - 1) * u64::from(limit),
            Self::Offset { offset, .. } => offset,
        }
    }

    /// 1-based page the window starts on.
    pub fn page_number(&self) -> u32 {
        match *self {
            Self::Page { page, .. } => page,
            Self::Offset { limit, offset } => {
                u32::try_from(offset / u64::from(limit)).map_or(u32::MAX, |p| p.saturating_add(1))
            }
        }
    }

    /// Cap the window size.
    pub fn clamp_limit(self, max_limit: u32) -> Self {
        let max_limit = max_limit.max(1);
        match self {
            Self::Page { page, limit } => Self::page(page, limit.min(max_limit)),
            Self::Offset { limit, offset } => Self::offset(limit.min(max_limit), offset),
        }
    }

    pub fn info(&self, total: i64) -> PageInfo {
        let total = total.max(0);
        PageInfo {
            page: self.page_number(),
            limit: self.limit(),
            total,
            total_pages: total_pages(total, self.limit()),
        }
    }
}

/// `ceil(total / limit)`; zero when there is nothing to page through.
pub fn total_pages(total: i64, limit: u32) -> u64 {
    if total <= 0 {
        return 0;
    }
    (total as u64).div_ceil(u64::from(limit.max(1)))
}

/// Raw paging input (`page`/`limit` or `limit`/`offset`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u64>,
}

impl PageRequest {
    /// Resolve into a window. An explicit `offset` selects offset paging;
    /// otherwise page paging is used. Missing or zero limits take
    /// `default_limit`, and every limit is capped at `max_limit`.
    pub fn resolve(&self, default_limit: u32, max_limit: u32) -> Pagination {
        let limit = self.limit.filter(|l| *l > 0).unwrap_or(default_limit);
        let pagination = match self.offset {
            Some(offset) => Pagination::offset(limit, offset),
            None => Pagination::page(self.page.unwrap_or(1), limit),
        };
        pagination.clamp_limit(max_limit)
    }
}

/// Pagination block of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: u64,
}

/// Uniform search result: `{data, pagination}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEnvelope<T> {
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> RecordEnvelope<T> {
    pub fn new(data: Vec<T>, pagination: PageInfo) -> Self {
        Self { data, pagination }
    }
}
