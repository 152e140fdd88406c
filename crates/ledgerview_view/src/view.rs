//! Paged, filtered, sorted projection over a collection.

use crate::error::ViewResult;
use crate::filter::{default_resolver, FieldResolver, FilterSpec};
use crate::paging::{page_count, PageWindow};
use crate::sort::{SortScope, SortSpec};
use ledgerview_protocol::{Collection, FieldValue, Record, RecordId};
use std::fmt;
use std::sync::Arc;

/// A non-owning display projection over a [`Collection`].
///
/// The view filters first, then pages the filtered set. A sort, if set,
/// reorders either the whole filtered set or just the visible page,
/// depending on its [`SortScope`]. The collection itself is never
/// modified; swapping in the next fetched collection is
/// [`PagedView::set_collection`].
#[derive(Clone)]
pub struct PagedView {
    collection: Arc<Collection>,
    window: PageWindow,
    filter: FilterSpec,
    sort: Option<SortSpec>,
    sort_scope: SortScope,
    resolver: FieldResolver,
}

impl PagedView {
    /// Creates a view on page 0 with no filter and no sort.
    pub fn new(collection: Arc<Collection>, page_size: usize) -> ViewResult<Self> {
        Ok(Self {
            collection,
            window: PageWindow::first(page_size)?,
            filter: FilterSpec::default(),
            sort: None,
            sort_scope: SortScope::default(),
            resolver: default_resolver(),
        })
    }

    /// Uses `resolver` to read fields for filtering and sorting.
    #[must_use]
    pub fn with_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Record, &str) -> Option<FieldValue> + Send + Sync + 'static,
    {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Sets what the sort applies to.
    #[must_use]
    pub fn with_sort_scope(mut self, scope: SortScope) -> Self {
        self.sort_scope = scope;
        self
    }

    /// The underlying collection.
    pub fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }

    /// Replaces the collection, keeping page, filter and sort.
    ///
    /// If the new collection is shorter the current page may now be past
    /// the end; call [`PagedView::clamp_page_index`] to move back.
    pub fn set_collection(&mut self, collection: Arc<Collection>) {
        self.collection = collection;
    }

    /// The current page window.
    pub fn window(&self) -> PageWindow {
        self.window
    }

    /// Zero-based index of the current page.
    pub fn page_index(&self) -> usize {
        self.window.page_index()
    }

    /// Records per page.
    pub fn page_size(&self) -> usize {
        self.window.page_size()
    }

    /// Moves to a page. Pages past the end are allowed and show nothing.
    pub fn set_page_index(&mut self, page_index: usize) {
        self.window = self.window.with_page_index(page_index);
    }

    /// Changes the page size and returns to page 0.
    pub fn set_page_size(&mut self, page_size: usize) -> ViewResult<()> {
        self.window = PageWindow::first(page_size)?;
        Ok(())
    }

    /// The active filter.
    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    /// Sets the filter and returns to page 0.
    pub fn set_filter(&mut self, filter: FilterSpec) {
        tracing::trace!(field = %filter.field, query = %filter.query, "view filter set");
        self.filter = filter;
        self.set_page_index(0);
    }

    /// Removes the filter and returns to page 0.
    pub fn clear_filter(&mut self) {
        self.set_filter(FilterSpec::default());
    }

    /// The active sort.
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Sets or clears the sort. The page index is kept.
    pub fn set_sort(&mut self, sort: Option<SortSpec>) {
        self.sort = sort;
    }

    /// What the sort applies to.
    pub fn sort_scope(&self) -> SortScope {
        self.sort_scope
    }

    /// Changes what the sort applies to.
    pub fn set_sort_scope(&mut self, scope: SortScope) {
        self.sort_scope = scope;
    }

    /// Number of records in the collection.
    pub fn total_count(&self) -> usize {
        self.collection.len()
    }

    /// Number of records that pass the filter.
    pub fn filtered_count(&self) -> usize {
        if self.filter.is_identity() {
            return self.collection.len();
        }
        self.collection
            .iter()
            .filter(|r| self.filter.matches(r, &self.resolver))
            .count()
    }

    /// Number of pages of the filtered set.
    pub fn page_count(&self) -> usize {
        page_count(self.filtered_count(), self.page_size())
    }

    /// The filtered records in display order, across all pages.
    ///
    /// With [`SortScope::VisiblePage`] the order is collection order.
    pub fn filtered_records(&self) -> Vec<&Record> {
        let mut records = self.filter.apply(self.collection.records(), &self.resolver);
        if self.sort_scope == SortScope::FilteredSet {
            if let Some(sort) = &self.sort {
                sort.sort(&mut records, &self.resolver);
            }
        }
        records
    }

    /// The records on the current page, in display order.
    pub fn visible_records(&self) -> Vec<&Record> {
        let filtered = self.filtered_records();
        let range = self.window.range(filtered.len());
        let mut visible = filtered[range].to_vec();
        if self.sort_scope == SortScope::VisiblePage {
            if let Some(sort) = &self.sort {
                sort.sort(&mut visible, &self.resolver);
            }
        }
        visible
    }

    /// Identifiers of the records on the current page.
    pub fn visible_ids(&self) -> Vec<RecordId> {
        self.visible_records()
            .into_iter()
            .map(|r| r.id().clone())
            .collect()
    }

    /// Moves back to the last page if the current one is past the end.
    /// Returns true if the page index changed.
    pub fn clamp_page_index(&mut self) -> bool {
        let last = self.page_count().saturating_sub(1);
        if self.page_index() <= last {
            return false;
        }
        tracing::debug!(from = self.page_index(), to = last, "page index clamped");
        self.set_page_index(last);
        true
    }
}

impl fmt::Debug for PagedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedView")
            .field("records", &self.collection.len())
            .field("window", &self.window)
            .field("filter", &self.filter)
            .field("sort", &self.sort)
            .field("sort_scope", &self.sort_scope)
            .finish_non_exhaustive()
    }
}
