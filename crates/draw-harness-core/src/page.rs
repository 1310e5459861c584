//! Pagination over a newest-first dataset.

pub const DEFAULT_PER_PAGE: usize = 20;

/// One page of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based page number actually shown (after clamping).
    pub number: usize,
    /// Total number of pages; at least 1, even for an empty dataset.
    pub total_pages: usize,
    pub total_items: usize,
}

impl<'a, T> Page<'a, T> {
    /// Slice out 1-based page `number`. Page numbers outside
    /// `1..=total_pages` are clamped; a zero `per_page` falls back to the
    /// default.
    pub fn of(items: &'a [T], number: usize, per_page: usize) -> Self {
        let per_page = if per_page == 0 { DEFAULT_PER_PAGE } else { per_page };
        let total_pages = items.len().div_ceil(per_page).max(1);
        let number = number.clamp(1, total_pages);
        let start = ((number - 1) * per_page).min(items.len());
        let end = (start + per_page).min(items.len());
        Self {
            items: &items[start..end],
            number,
            total_pages,
            total_items: items.len(),
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.number > 1
    }
}
