//! Page request and counted page envelope primitives.
//!
//! Repositories expose unbounded queries; this crate turns a page number and
//! page size into a bounded, counted fetch. A page is assembled from two
//! independent store round-trips (a count of the full query, then a bounded
//! fetch), so `total_count` is advisory under concurrent writes: no snapshot
//! isolation is promised between the two calls.
//!
//! # Example
//!
//! ```
//! use pagination::{Page, PageRequest};
//!
//! let request = PageRequest::new(2, 10).expect("valid request");
//! assert_eq!(request.skip(), 10);
//!
//! let page = Page::new(vec![11, 12, 13], request, 23);
//! assert_eq!(page.total_pages(), 3);
//! assert!(page.has_previous_page());
//! assert!(page.has_next_page());
//! ```

use std::future::Future;

use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Page number used when a request does not specify one.
pub const DEFAULT_PAGE_NUMBER: u32 = 1;

/// Page size used when a request does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Validation failures for [`PageRequest`] construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageRequestError {
    /// Page numbers are one-based.
    #[error("page number must be at least 1")]
    ZeroPageNumber,
    /// A page must hold at least one item.
    #[error("page size must be at least 1")]
    ZeroPageSize,
}

/// A validated, one-based page request.
///
/// ## Invariants
/// - `page_number >= 1`
/// - `page_size >= 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PageRequestDto")]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
}

impl PageRequest {
    /// Build a page request, rejecting zero page numbers and sizes.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError`] when either value is zero.
    pub const fn new(page_number: u32, page_size: u32) -> Result<Self, PageRequestError> {
        if page_number == 0 {
            return Err(PageRequestError::ZeroPageNumber);
        }
        if page_size == 0 {
            return Err(PageRequestError::ZeroPageSize);
        }
        Ok(Self {
            page_number,
            page_size,
        })
    }

    /// One-based page number.
    #[must_use]
    pub const fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Maximum number of items on the page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of records preceding this page: `(page_number - 1) * page_size`.
    #[must_use]
    pub const fn skip(&self) -> u64 {
        // Both factors are widened from u32, so the product fits in u64.
        (self.page_number.saturating_sub(1) as u64) * (self.page_size as u64)
    }

    /// Upper bound on the number of records fetched for this page.
    #[must_use]
    pub const fn take(&self) -> u64 {
        self.page_size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

const fn default_page_number() -> u32 {
    DEFAULT_PAGE_NUMBER
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageRequestDto {
    #[serde(default = "default_page_number")]
    page_number: u32,
    #[serde(default = "default_page_size")]
    page_size: u32,
}

impl TryFrom<PageRequestDto> for PageRequest {
    type Error = PageRequestError;

    fn try_from(value: PageRequestDto) -> Result<Self, Self::Error> {
        Self::new(value.page_number, value.page_size)
    }
}

/// One page of a counted query.
///
/// `total_count` reflects the full query at the time the count ran; the
/// derived flags are computed from it and are not cached across pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    items: Vec<T>,
    page_number: u32,
    page_size: u32,
    total_count: u64,
}

impl<T> Page<T> {
    /// Assemble a page from fetched items and the counted total.
    #[must_use]
    pub const fn new(items: Vec<T>, request: PageRequest, total_count: u64) -> Self {
        Self {
            items,
            page_number: request.page_number,
            page_size: request.page_size,
            total_count,
        }
    }

    /// Items on this page, in store order.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the page, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// One-based page number.
    #[must_use]
    pub const fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Requested page size.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total records matched by the query when it was counted.
    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    /// `ceil(total_count / page_size)`; zero when nothing matched.
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.page_size as u64)
    }

    /// True for every page after the first.
    #[must_use]
    pub const fn has_previous_page(&self) -> bool {
        self.page_number > 1
    }

    /// True while later pages exist.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        (self.page_number as u64) < self.total_pages()
    }

    /// True when the page carries no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Transform every item while keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Page", 7)?;
        state.serialize_field("items", &self.items)?;
        state.serialize_field("pageNumber", &self.page_number)?;
        state.serialize_field("pageSize", &self.page_size)?;
        state.serialize_field("totalCount", &self.total_count)?;
        state.serialize_field("totalPages", &self.total_pages())?;
        state.serialize_field("hasPreviousPage", &self.has_previous_page())?;
        state.serialize_field("hasNextPage", &self.has_next_page())?;
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageDto<T> {
    items: Vec<T>,
    page_number: u32,
    page_size: u32,
    total_count: u64,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Page<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dto = PageDto::<T>::deserialize(deserializer)?;
        let request = PageRequest::new(dto.page_number, dto.page_size).map_err(D::Error::custom)?;
        Ok(Self::new(dto.items, request, dto.total_count))
    }
}

/// Run a counted, bounded query and assemble the page.
///
/// `count` executes the full query's count; `fetch` receives `(skip, take)`
/// and returns at most `take` records. The two run as separate round-trips,
/// count first. Items beyond the page size are dropped.
///
/// # Errors
///
/// Propagates the first error returned by `count` or `fetch`.
///
/// # Example
///
/// ```
/// use pagination::{PageRequest, paginate};
///
/// # let runtime = tokio::runtime::Builder::new_current_thread().build().expect("runtime");
/// # runtime.block_on(async {
/// let rows: Vec<u32> = (1..=25).collect();
/// let total = rows.len() as u64;
/// let request = PageRequest::new(3, 10).expect("valid request");
/// let page = paginate(
///     request,
///     move || async move { Ok::<_, std::convert::Infallible>(total) },
///     move |skip, take| async move {
///         Ok(rows.into_iter().skip(skip as usize).take(take as usize).collect())
///     },
/// )
/// .await
/// .expect("infallible");
/// assert_eq!(page.items(), &[21, 22, 23, 24, 25]);
/// assert!(!page.has_next_page());
/// # });
/// ```
pub async fn paginate<T, E, C, CF, F, FF>(
    request: PageRequest,
    count: C,
    fetch: F,
) -> Result<Page<T>, E>
where
    C: FnOnce() -> CF,
    CF: Future<Output = Result<u64, E>>,
    F: FnOnce(u64, u64) -> FF,
    FF: Future<Output = Result<Vec<T>, E>>,
{
    let total_count = count().await?;
    let mut items = fetch(request.skip(), request.take()).await?;
    items.truncate(usize::try_from(request.take()).unwrap_or(usize::MAX));
    Ok(Page::new(items, request, total_count))
}

#[cfg(test)]
mod tests;
