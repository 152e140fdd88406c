//! Page arithmetic.
//!
//! Every page computation in the workspace goes through [`page_count`] and
//! [`PageWindow::range`], so page counts always use ceiling division.

use crate::error::{ViewError, ViewResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Number of pages needed to show `len` items, `page_size` at a time.
///
/// `page_count(0, n) == 0` and any non-empty list has at least one page.
/// A zero page size has no pages.
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// A page position: which page, and how many items per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageWindow {
    page_index: usize,
    page_size: usize,
}

impl PageWindow {
    /// Creates a window, rejecting a zero page size.
    pub fn new(page_index: usize, page_size: usize) -> ViewResult<Self> {
        if page_size == 0 {
            return Err(ViewError::InvalidPageSize(page_size));
        }
        Ok(Self {
            page_index,
            page_size,
        })
    }

    /// The first page.
    pub fn first(page_size: usize) -> ViewResult<Self> {
        Self::new(0, page_size)
    }

    /// Zero-based page index.
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Items per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Offset of the first item on this page (may lie past the end).
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }

    /// The item range this page covers in a list of `len` items.
    ///
    /// Clipped to `len`; a page past the end yields an empty range.
    pub fn range(&self, len: usize) -> Range<usize> {
        let start = self.offset().min(len);
        let end = start.saturating_add(self.page_size).min(len);
        start..end
    }

    /// The same page size at another index.
    #[must_use]
    pub fn with_page_index(self, page_index: usize) -> Self {
        Self { page_index, ..self }
    }
}

/// The items on `window`'s page.
pub fn page_slice<T>(items: &[T], window: PageWindow) -> &[T] {
    &items[window.range(items.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn page_count_edges() {
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(1, 20), 1);
        assert_eq!(page_count(40, 20), 2);
        assert_eq!(page_count(41, 20), 3);
        assert_eq!(page_count(10, 0), 0);
    }

    #[test]
    fn window_rejects_zero_size() {
        assert_eq!(PageWindow::new(0, 0), Err(ViewError::InvalidPageSize(0)));
    }

    #[test]
    fn slice_is_clipped() {
        let items: Vec<u32> = (0..25).collect();
        let w = PageWindow::first(20).unwrap();
        assert_eq!(page_slice(&items, w).len(), 20);
        assert_eq!(page_slice(&items, w.with_page_index(1)), &items[20..25]);
        assert!(page_slice(&items, w.with_page_index(2)).is_empty());
        assert!(page_slice(&items, w.with_page_index(usize::MAX)).is_empty());
    }

    proptest! {
        #[test]
        fn pages_partition_the_list(len in 0usize..500, size in 1usize..50) {
            let items: Vec<usize> = (0..len).collect();
            let pages = page_count(len, size);

            let mut joined = Vec::new();
            for index in 0..pages {
                let page = page_slice(&items, PageWindow::new(index, size).unwrap());
                prop_assert!(!page.is_empty());
                prop_assert!(page.len() <= size);
                joined.extend_from_slice(page);
            }
            prop_assert_eq!(joined, items.clone());
            prop_assert!(page_slice(&items, PageWindow::new(pages, size).unwrap()).is_empty());
        }
    }
}
