use serde::Serialize;

use crate::config::MarketplaceConfig;

/// One-based page request after limits have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn resolve(config: &MarketplaceConfig, page: Option<u32>, limit: Option<u32>) -> Self {
        let limit = limit
            .filter(|limit| *limit > 0)
            .unwrap_or(config.default_page_size)
            .min(config.max_page_size);
        Self {
            page: page.unwrap_or(1).max(1),
            limit,
        }
    }

    fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.limit as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn slice(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len();
        let total_pages = total.div_ceil(request.limit as usize) as u32;
        let items = items
            .into_iter()
            .skip(request.offset())
            .take(request.limit as usize)
            .collect();
        Self {
            items,
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
        }
    }
}
