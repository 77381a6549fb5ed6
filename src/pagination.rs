use std::fmt;
use std::ops::Range;

/// Most page number buttons shown at once.
pub const MAX_PAGE_BUTTONS: usize = 5;

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}

/// `min(page, max(1, total_pages))`, never below 1.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.min(total_pages.max(1)).max(1)
}

/// Slice of the filtered set shown on `page` (1 based, already clamped).
pub fn page_range(page: usize, page_size: usize, total_items: usize) -> Range<usize> {
    let start = page.saturating_sub(1).saturating_mul(page_size).min(total_items);
    let end = start.saturating_add(page_size).min(total_items);
    start..end
}

/// Page numbers shown in the pagination bar.
pub fn page_window(current_page: usize, total_pages: usize) -> Vec<usize> {
    if total_pages <= MAX_PAGE_BUTTONS {
        return (1..=total_pages).collect();
    }
    let half = MAX_PAGE_BUTTONS / 2;
    let first = if current_page <= half + 1 {
        1
    } else if current_page + half >= total_pages {
        total_pages + 1 - MAX_PAGE_BUTTONS
    } else {
        current_page - half
    };
    (first..first + MAX_PAGE_BUTTONS).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationBar {
    pub current_page: usize,
    pub total_pages: usize,
    pub pages: Vec<usize>,
    pub first_enabled: bool,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub last_enabled: bool,
}

impl PaginationBar {
    /// `None` when everything fits on one page.
    pub fn new(current_page: usize, total_pages: usize) -> Option<Self> {
        if total_pages <= 1 {
            return None;
        }
        let current_page = clamp_page(current_page, total_pages);
        let at_start = current_page == 1;
        let at_end = current_page == total_pages;
        Some(PaginationBar {
            current_page,
            total_pages,
            pages: page_window(current_page, total_pages),
            first_enabled: !at_start,
            prev_enabled: !at_start,
            next_enabled: !at_end,
            last_enabled: !at_end,
        })
    }
}

/// "Showing 11-20 of 23 results (filtered from 40 total)"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSummary {
    pub start_item: usize,
    pub end_item: usize,
    pub filtered: usize,
    pub total: usize,
    pub search_active: bool,
}

impl ResultSummary {
    pub fn new(range: &Range<usize>, filtered: usize, total: usize, search_active: bool) -> Self {
        let (start_item, end_item) = if range.is_empty() {
            (0, 0)
        } else {
            (range.start + 1, range.end)
        };
        ResultSummary {
            start_item,
            end_item,
            filtered,
            total,
            search_active,
        }
    }
}

impl fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Showing {}-{} of {} results",
            self.start_item, self.end_item, self.filtered
        )?;
        if self.search_active {
            write!(f, " (filtered from {} total)", self.total)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_and_slices() {
        assert_eq!(total_pages(23, 10), 3);
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(page_range(1, 10, 23), 0..10);
        assert_eq!(page_range(3, 10, 23), 20..23);
        assert_eq!(page_range(1, 10, 0), 0..0);
    }

    #[test]
    fn clamping() {
        assert_eq!(clamp_page(5, 3), 3);
        assert_eq!(clamp_page(0, 3), 1);
        assert_eq!(clamp_page(4, 0), 1);
        assert_eq!(clamp_page(2, 3), 2);
    }

    #[test]
    fn window_positions() {
        assert_eq!(page_window(2, 4), vec![1, 2, 3, 4]);
        assert_eq!(page_window(1, 10), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_window(3, 10), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_window(4, 10), vec![2, 3, 4, 5, 6]);
        assert_eq!(page_window(7, 10), vec![5, 6, 7, 8, 9]);
        assert_eq!(page_window(8, 10), vec![6, 7, 8, 9, 10]);
        assert_eq!(page_window(10, 10), vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn bar_only_for_multiple_pages() {
        assert_eq!(PaginationBar::new(1, 1), None);
        let bar = PaginationBar::new(1, 3).unwrap();
        assert!(!bar.first_enabled && !bar.prev_enabled);
        assert!(bar.next_enabled && bar.last_enabled);
        let bar = PaginationBar::new(3, 3).unwrap();
        assert!(bar.prev_enabled && !bar.next_enabled && !bar.last_enabled);
    }

    #[test]
    fn summary_text() {
        let summary = ResultSummary::new(&(20..23), 23, 40, true);
        assert_eq!(summary.to_string(), "Showing 21-23 of 23 results (filtered from 40 total)");
        let summary = ResultSummary::new(&(0..0), 0, 40, false);
        assert_eq!(summary.to_string(), "Showing 0-0 of 0 results");
    }
}
