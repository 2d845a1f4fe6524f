//! Query-string parameters shared by the paged endpoints.

use knowspace_core::paging::{PageRequest, normalize_filter};
use serde::Deserialize;

use crate::error::ApiError;

/// `?pageIndex=..&pageSize=..`; both default to the first page of ten.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
  pub page_index: Option<i64>,
  pub page_size:  Option<i64>,
}

impl PageParams {
  pub fn page(&self) -> Result<PageRequest, ApiError> {
    page_request(self.page_index, self.page_size)
  }
}

/// `?filter=..&categoryId=..&pageIndex=..&pageSize=..`
// Not flattened over `PageParams`: serde_urlencoded cannot parse numbers
// through `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
  pub filter:      Option<String>,
  pub category_id: Option<i64>,
  pub page_index:  Option<i64>,
  pub page_size:   Option<i64>,
}

impl FilterParams {
  pub fn page(&self) -> Result<PageRequest, ApiError> {
    page_request(self.page_index, self.page_size)
  }

  /// The filter text, with an empty string treated as absent.
  pub fn text(&self) -> Option<String> { normalize_filter(self.filter.clone()) }
}

fn page_request(index: Option<i64>, size: Option<i64>) -> Result<PageRequest, ApiError> {
  let default = PageRequest::default();
  let page = PageRequest::new(
    index.unwrap_or(default.page_index()),
    size.unwrap_or(default.page_size()),
  )?;
  Ok(page)
}

#[cfg(test)]
mod tests {
  use axum::http::StatusCode;

  use super::*;

  #[test]
  fn missing_values_use_first_page_of_ten() {
    let page = PageParams::default().page().unwrap();
    assert_eq!((page.page_index(), page.page_size()), (1, 10));
  }

  #[test]
  fn zero_index_is_a_bad_request() {
    let params = FilterParams { page_index: Some(0), ..Default::default() };
    assert_eq!(params.page().unwrap_err().status(), StatusCode::BAD_REQUEST);
  }

  #[test]
  fn empty_filter_is_absent() {
    let params = FilterParams { filter: Some(String::new()), ..Default::default() };
    assert_eq!(params.text(), None);
  }
}
