use std::collections::BTreeMap;

use tracing::trace;

/// Page sizes offered by the page size selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    Five,
    #[default]
    Ten,
    Twenty,
    Fifty,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [PageSize::Five, PageSize::Ten, PageSize::Twenty, PageSize::Fifty];

    pub fn get(self) -> usize {
        match self {
            PageSize::Five => 5,
            PageSize::Ten => 10,
            PageSize::Twenty => 20,
            PageSize::Fifty => 50,
        }
    }

    pub fn from_usize(size: usize) -> Option<Self> {
        PageSize::ALL.into_iter().find(|p| p.get() == size)
    }

    pub fn next(self) -> Self {
        match self {
            PageSize::Five => PageSize::Ten,
            PageSize::Ten => PageSize::Twenty,
            PageSize::Twenty => PageSize::Fifty,
            PageSize::Fifty => PageSize::Five,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub key: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn ascending(key: impl Into<String>) -> Self {
        Sort {
            key: key.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Sort {
            key: key.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Interactive query state of one table.
///
/// Any change to the search term, a filter, the sort or the page size moves
/// back to the first page. The stored page is only an upper bound: the engine
/// clamps it against the current number of pages when building a page.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    search_term: String,
    filters: BTreeMap<String, String>,
    sort: Option<Sort>,
    current_page: usize,
    page_size: PageSize,
}

impl Default for QueryState {
    fn default() -> Self {
        QueryState::new(PageSize::default())
    }
}

impl QueryState {
    pub fn new(page_size: PageSize) -> Self {
        QueryState {
            search_term: String::new(),
            filters: BTreeMap::new(),
            sort: None,
            current_page: 1,
            page_size,
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn has_search(&self) -> bool {
        !self.search_term.is_empty()
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.reset_page();
    }

    /// Sets the filter text of a column. An empty value removes the filter.
    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if value.is_empty() {
            self.filters.remove(&key);
        } else {
            self.filters.insert(key, value);
        }
        self.reset_page();
    }

    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    /// Filters with a non empty value, ordered by column key.
    pub fn active_filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn clear(&mut self) {
        self.search_term.clear();
        self.filters.clear();
        self.reset_page();
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn set_sort(&mut self, sort: Option<Sort>) {
        self.sort = sort;
        self.reset_page();
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        self.reset_page();
    }

    /// The stored page, not clamped. See `pagination::clamp_page`.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Moves to `page`, kept within `1..=total_pages`.
    pub fn go_to_page(&mut self, page: usize, total_pages: usize) {
        self.current_page = crate::pagination::clamp_page(page, total_pages);
        trace!("Go to page {} of {}", self.current_page, total_pages);
    }

    pub fn next_page(&mut self, total_pages: usize) {
        let page = crate::pagination::clamp_page(self.current_page, total_pages);
        self.go_to_page(page + 1, total_pages);
    }

    pub fn prev_page(&mut self, total_pages: usize) {
        let page = crate::pagination::clamp_page(self.current_page, total_pages);
        self.go_to_page(page.saturating_sub(1), total_pages);
    }

    pub fn first_page(&mut self) {
        self.current_page = 1;
    }

    pub fn last_page(&mut self, total_pages: usize) {
        self.go_to_page(total_pages, total_pages);
    }

    fn reset_page(&mut self) {
        self.current_page = 1;
    }
}
