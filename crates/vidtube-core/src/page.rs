//! Pagination parameters and paginated results.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// A validated, one-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  page: u32,
  size: u32,
}

impl Default for Page {
  fn default() -> Self {
    Self { page: DEFAULT_PAGE, size: DEFAULT_PAGE_SIZE }
  }
}

impl Page {
  pub fn new(page: u32, size: u32) -> Result<Self> {
    if page == 0 {
      return Err(Error::InvalidPage(page));
    }
    if size == 0 || size > MAX_PAGE_SIZE {
      return Err(Error::InvalidPageSize { got: size, max: MAX_PAGE_SIZE });
    }
    Ok(Self { page, size })
  }

  /// Fill unset query parameters with defaults, then validate.
  pub fn from_query(page: Option<u32>, size: Option<u32>) -> Result<Self> {
    Self::new(page.unwrap_or(DEFAULT_PAGE), size.unwrap_or(DEFAULT_PAGE_SIZE))
  }

  pub fn number(&self) -> u32 { self.page }

  pub fn size(&self) -> u32 { self.size }

  /// Documents to skip before this page starts.
  pub fn offset(&self) -> u64 {
    u64::from(self.page - 1) * u64::from(self.size)
  }

  pub fn total_pages(&self, total_items: u64) -> u64 {
    total_items.div_ceil(u64::from(self.size))
  }
}

/// One page of results plus the totals needed to render a pager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
  pub items:       Vec<T>,
  pub page:        u32,
  pub page_size:   u32,
  pub total_items: u64,
  pub total_pages: u64,
}

impl<T> Paginated<T> {
  pub fn new(items: Vec<T>, page: Page, total_items: u64) -> Self {
    Self {
      items,
      page: page.number(),
      page_size: page.size(),
      total_items,
      total_pages: page.total_pages(total_items),
    }
  }

  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
    Paginated {
      items:       self.items.into_iter().map(f).collect(),
      page:        self.page,
      page_size:   self.page_size,
      total_items: self.total_items,
      total_pages: self.total_pages,
    }
  }
}
