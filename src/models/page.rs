use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Query parameters for page-number pagination (1-based).
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
}

/// One page of results plus the total item count across all pages.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: i64,
}

impl PageParams {
    /// Row offset of the requested page. Pages start at 1.
    pub fn offset(&self, page_size: i64) -> Result<i64, AppError> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::ValidationError(
                "page must be greater than or equal to 1".to_string(),
            ));
        }
        Ok((page - 1).saturating_mul(page_size))
    }
}

impl<T> Page<T> {
    /// Cuts page `page` (1-based, defaults to 1) of `page_size` items out of `items`.
    /// A page past the end is empty.
    pub fn paginate(items: Vec<T>, page: Option<i64>, page_size: i64) -> Result<Self, AppError> {
        let offset = PageParams { page }.offset(page_size)? as usize;
        let count = items.len() as i64;
        let items = items
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .collect();

        Ok(Self { items, count })
    }
}
