//! Thin endpoint wrappers built on [`ApiClient`](crate::ApiClient).
//!
//! Services only shape paths and payloads; authentication, refresh and
//! error classification all happen in the client.

mod albums;
mod auth;
mod images;

pub use albums::AlbumService;
pub use auth::AuthService;
pub use images::{ImageService, ImageUpload};

use photox_domain::ApiRequest;

/// Pagination and ordering parameters for list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size.
    pub page_size: Option<u32>,
    /// Ordering expression, e.g. `-created_at`.
    pub ordering: Option<String>,
}

impl ListQuery {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page number.
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the page size.
    #[must_use]
    pub const fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn ordering(mut self, ordering: impl Into<String>) -> Self {
        self.ordering = Some(ordering.into());
        self
    }

    pub(crate) fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(page) = self.page {
            request = request.query("page", page.to_string());
        }
        if let Some(page_size) = self.page_size {
            request = request.query("page_size", page_size.to_string());
        }
        if let Some(ordering) = &self.ordering {
            request = request.query("ordering", ordering.clone());
        }
        request
    }
}
