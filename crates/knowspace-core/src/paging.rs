//! Page requests and paged results.
//!
//! Page indices are 1-based. The offset of a page is
//! `(page_index - 1) * page_size`.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Upper bound on `page_size`; larger requests are clamped.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  page_index: i64,
  page_size:  i64,
}

impl PageRequest {
  /// Rejects non-positive index or size. Sizes above [`MAX_PAGE_SIZE`] are
  /// clamped rather than rejected.
  pub fn new(page_index: i64, page_size: i64) -> Result<Self> {
    if page_index < 1 {
      return Err(Error::InvalidPage(format!(
        "pageIndex must be at least 1, got {page_index}"
      )));
    }
    if page_size < 1 {
      return Err(Error::InvalidPage(format!(
        "pageSize must be at least 1, got {page_size}"
      )));
    }
    Ok(Self { page_index, page_size: page_size.min(MAX_PAGE_SIZE) })
  }

  pub fn page_index(&self) -> i64 { self.page_index }

  pub fn page_size(&self) -> i64 { self.page_size }

  pub fn offset(&self) -> i64 { (self.page_index - 1).saturating_mul(self.page_size) }

  /// Number of items this page holds when `total` records match.
  pub fn window_len(&self, total: i64) -> i64 {
    total.saturating_sub(self.offset()).clamp(0, self.page_size)
  }
}

impl Default for PageRequest {
  fn default() -> Self { Self { page_index: 1, page_size: 10 } }
}

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub items:         Vec<T>,
  pub page_index:    i64,
  pub page_size:     i64,
  /// Number of matching records before pagination.
  pub total_records: i64,
}

impl<T> Page<T> {
  pub fn new(request: PageRequest, items: Vec<T>, total_records: i64) -> Self {
    Self {
      items,
      page_index: request.page_index,
      page_size: request.page_size,
      total_records,
    }
  }
}

/// Treat an absent or empty filter as "match all".
pub fn normalize_filter(filter: Option<String>) -> Option<String> {
  filter.filter(|f| !f.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn offset_is_zero_based() {
    assert_eq!(PageRequest::new(1, 10).unwrap().offset(), 0);
    assert_eq!(PageRequest::new(2, 10).unwrap().offset(), 10);
    assert_eq!(PageRequest::new(5, 3).unwrap().offset(), 12);
  }

  #[test]
  fn rejects_non_positive_values() {
    assert!(matches!(PageRequest::new(0, 10), Err(Error::InvalidPage(_))));
    assert!(matches!(PageRequest::new(1, 0), Err(Error::InvalidPage(_))));
    assert!(matches!(PageRequest::new(1, -5), Err(Error::InvalidPage(_))));
  }

  #[test]
  fn clamps_large_page_size() {
    assert_eq!(PageRequest::new(1, 10_000).unwrap().page_size(), MAX_PAGE_SIZE);
  }

  #[test]
  fn window_length_never_negative() {
    let p = PageRequest::new(2, 10).unwrap();
    assert_eq!(p.window_len(15), 5);
    assert_eq!(p.window_len(25), 10);
    assert_eq!(p.window_len(10), 0);
    assert_eq!(p.window_len(3), 0);

    let far = PageRequest::new(i64::MAX, 100).unwrap();
    assert_eq!(far.window_len(1_000), 0);
  }

  #[test]
  fn empty_filter_matches_all() {
    assert_eq!(normalize_filter(Some(String::new())), None);
    assert_eq!(normalize_filter(Some("vpn".into())), Some("vpn".into()));
    assert_eq!(normalize_filter(None), None);
  }
}
