//! Paging request/response shapes.

use serde::{Deserialize, Serialize};

/// Sort direction; `0 = Ascending`, `1 = Descending` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl From<SortDirection> for u8 {
    fn from(value: SortDirection) -> Self {
        match value {
            SortDirection::Ascending => 0,
            SortDirection::Descending => 1,
        }
    }
}

impl TryFrom<u8> for SortDirection {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Ascending),
            1 => Ok(Self::Descending),
            other => Err(format!("invalid sort direction `{other}`; expected 0|1")),
        }
    }
}

/// Order and window requested by a caller.
///
/// Without `page_size` the whole sorted sequence comes back as one page.
/// A `page_size` of zero is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub order_by_field: String,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub page_index: Option<u32>,
}

impl PageQuery {
    pub fn new(order_by_field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            order_by_field: order_by_field.into(),
            direction,
            page_size: None,
            page_index: None,
        }
    }

    pub fn with_page(mut self, page_size: u32, page_index: u32) -> Self {
        self.page_size = Some(page_size);
        self.page_index = Some(page_index);
        self
    }

    pub(crate) fn effective_page_size(&self) -> Option<u32> {
        self.page_size.filter(|size| *size > 0)
    }
}

/// One window of a sorted, filtered sequence plus its totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub total_pages: u64,
    pub page_index: u64,
    pub page_size: u64,
}

impl<T> PageResult<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            total_items: self.total_items,
            total_pages: self.total_pages,
            page_index: self.page_index,
            page_size: self.page_size,
        }
    }
}

/// Number of pages needed for `total_items` at `page_size` per page.
pub(crate) fn total_pages(total_items: u64, page_size: Option<u32>) -> u64 {
    match page_size {
        Some(size) => total_items.div_ceil(u64::from(size)),
        None if total_items == 0 => 0,
        None => 1,
    }
}
