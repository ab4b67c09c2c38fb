//! Page-number pagination metadata and page-change bounds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A requested page outside `[1, total_pages]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("page {requested} is outside 1..={total_pages}")]
pub struct PageOutOfRange {
    pub requested: i64,
    pub total_pages: u32,
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    #[serde(rename = "has_prev")]
    pub has_previous: bool,
}

impl Pagination {
    /// Metadata for a single page of results.
    #[must_use]
    pub const fn single() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            has_next: false,
            has_previous: false,
        }
    }

    /// Validate a page-change request against these bounds.
    ///
    /// Page 1 is always reachable, even for an empty catalog that reports
    /// zero pages.
    ///
    /// # Errors
    ///
    /// Returns [`PageOutOfRange`] if `requested` is below 1 or above
    /// `total_pages`.
    pub fn check_target(&self, requested: i64) -> Result<u32, PageOutOfRange> {
        let out_of_range = PageOutOfRange {
            requested,
            total_pages: self.total_pages,
        };
        let page = u32::try_from(requested).map_err(|_| out_of_range)?;
        if page == 1 || (1..=self.total_pages).contains(&page) {
            Ok(page)
        } else {
            Err(out_of_range)
        }
    }

    /// Next page number, if there is one.
    #[must_use]
    pub fn next_page(&self) -> Option<u32> {
        self.has_next.then(|| self.current_page.saturating_add(1))
    }

    /// Previous page number, if there is one.
    #[must_use]
    pub fn previous_page(&self) -> Option<u32> {
        (self.has_previous && self.current_page > 1).then(|| self.current_page - 1)
    }

    /// Whether the metadata agrees with a request for `page`.
    ///
    /// The backend reports `has_next`/`has_prev` independently of the page
    /// counts; this checks they line up.
    #[must_use]
    pub const fn is_consistent_with(&self, page: u32) -> bool {
        self.current_page == page
            && self.has_next == (page < self.total_pages)
            && self.has_previous == (page > 1)
    }
}

/// Check a page request when the bounds may not be known yet.
///
/// Without prior metadata only pages below 1 are rejected; the first fetch
/// establishes the bounds.
///
/// # Errors
///
/// Returns [`PageOutOfRange`] when the request is known to be out of range.
pub fn resolve_page(requested: i64, known: Option<&Pagination>) -> Result<u32, PageOutOfRange> {
    match known {
        Some(pagination) => pagination.check_target(requested),
        None => u32::try_from(requested)
            .ok()
            .filter(|page| *page >= 1)
            .ok_or(PageOutOfRange {
                requested,
                total_pages: 0,
            }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn meta(current_page: u32, total_pages: u32) -> Pagination {
        Pagination {
            current_page,
            total_pages,
            has_next: current_page < total_pages,
            has_previous: current_page > 1,
        }
    }

    #[test]
    fn test_every_page_in_range_is_accepted() {
        let pagination = meta(1, 5);
        for page in 1..=5 {
            assert_eq!(pagination.check_target(page).unwrap(), u32::try_from(page).unwrap());
        }
    }

    #[test]
    fn test_out_of_range_pages_are_rejected() {
        let pagination = meta(2, 3);
        assert_eq!(
            pagination.check_target(0),
            Err(PageOutOfRange {
                requested: 0,
                total_pages: 3
            })
        );
        assert!(pagination.check_target(-4).is_err());
        assert!(pagination.check_target(4).is_err());
        assert!(pagination.check_target(i64::MAX).is_err());
    }

    #[test]
    fn test_first_page_allowed_for_empty_catalog() {
        let pagination = Pagination {
            current_page: 1,
            total_pages: 0,
            has_next: false,
            has_previous: false,
        };
        assert_eq!(pagination.check_target(1).unwrap(), 1);
        assert!(pagination.check_target(2).is_err());
    }

    #[test]
    fn test_neighbour_pages() {
        assert_eq!(meta(1, 3).previous_page(), None);
        assert_eq!(meta(1, 3).next_page(), Some(2));
        assert_eq!(meta(3, 3).next_page(), None);
        assert_eq!(meta(3, 3).previous_page(), Some(2));
    }

    #[test]
    fn test_consistency() {
        assert!(meta(2, 4).is_consistent_with(2));
        assert!(!meta(2, 4).is_consistent_with(3));
        let lying = Pagination {
            has_next: false,
            ..meta(2, 4)
        };
        assert!(!lying.is_consistent_with(2));
    }

    #[test]
    fn test_resolve_without_known_bounds() {
        assert_eq!(resolve_page(7, None).unwrap(), 7);
        assert!(resolve_page(0, None).is_err());
        assert!(resolve_page(-1, None).is_err());
        assert!(resolve_page(7, Some(&meta(1, 2))).is_err());
    }

    #[test]
    fn test_deserialize_backend_field_names() {
        let pagination: Pagination = serde_json::from_str(
            r#"{"current_page": 2, "total_pages": 3, "has_next": true, "has_prev": true}"#,
        )
        .unwrap();
        assert_eq!(pagination, meta(2, 3));
    }
}
