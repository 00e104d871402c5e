//! Pagination Controller
//!
//! Tracks the server-reported pagination of the current listing and derives
//! which page buttons to show. `total` and `pages` are never recomputed here.

use super::model::Pagination;
use super::query::PageRequest;
use serde::{Deserialize, Serialize};

/// Number of page buttons rendered at once
pub const PAGE_WINDOW_SIZE: u32 = 5;

/// Which page numbers to offer as buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageWindow {
    /// Always the first `min(5, pages)` pages
    Leading,
    /// Up to 5 pages around the current one
    #[default]
    Centered,
}

#[derive(Debug, Clone)]
pub struct PaginationController {
    state: Pagination,
    window: PageWindow,
}

impl Default for PaginationController {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PaginationController {
    pub fn new(limit: u32) -> Self {
        Self {
            state: Pagination {
                limit: limit.max(1),
                ..Pagination::default()
            },
            window: PageWindow::default(),
        }
    }

    pub fn with_window(mut self, window: PageWindow) -> Self {
        self.window = window;
        self
    }

    pub fn state(&self) -> Pagination {
        self.state
    }

    pub fn page(&self) -> u32 {
        self.state.page
    }

    pub fn pages(&self) -> u32 {
        self.state.pages
    }

    /// Page and limit for the next request
    pub fn request(&self) -> PageRequest {
        PageRequest {
            page: self.state.page,
            limit: self.state.limit,
        }
    }

    /// Adopt the pagination reported with a list response
    pub fn apply_server(&mut self, reported: Pagination) {
        let mut state = reported;
        if state.limit == 0 {
            state.limit = self.state.limit;
        }
        if state.pages > 0 && !(1..=state.pages).contains(&state.page) {
            tracing::debug!(
                "Server reported page {} of {}, clamping",
                state.page,
                state.pages
            );
            state.page = state.page.clamp(1, state.pages);
        } else if state.page == 0 {
            state.page = 1;
        }
        self.state = state;
    }

    /// Jump to page `n`; ignored unless `1 <= n <= pages`. Returns whether the page changed.
    pub fn go_to(&mut self, n: u32) -> bool {
        if n < 1 || n > self.state.pages || n == self.state.page {
            return false;
        }
        self.state.page = n;
        true
    }

    /// Next page; no-op on the last page
    pub fn next(&mut self) -> bool {
        self.go_to(self.state.page.saturating_add(1))
    }

    /// Previous page; no-op on the first page
    pub fn prev(&mut self) -> bool {
        self.go_to(self.state.page.saturating_sub(1))
    }

    /// Back to page 1 without waiting for the server (filters changed)
    pub fn reset(&mut self) -> bool {
        let changed = self.state.page != 1;
        self.state.page = 1;
        changed
    }

    pub fn has_next(&self) -> bool {
        self.state.page < self.state.pages
    }

    pub fn has_prev(&self) -> bool {
        self.state.page > 1
    }

    /// Page numbers to render as buttons
    pub fn page_numbers(&self) -> Vec<u32> {
        let pages = self.state.pages;
        if pages == 0 {
            return Vec::new();
        }

        let count = pages.min(PAGE_WINDOW_SIZE);
        let start = match self.window {
            PageWindow::Leading => 1,
            PageWindow::Centered => {
                let half = PAGE_WINDOW_SIZE / 2;
                let latest_start = pages - count + 1;
                self.state.page.saturating_sub(half).clamp(1, latest_start)
            }
        };
        (start..start + count).collect()
    }

    /// "Showing 11 to 20 of 47"
    pub fn range_label(&self) -> String {
        let Pagination {
            page, limit, total, ..
        } = self.state;
        if total == 0 {
            return "No results".to_string();
        }
        let first = (u64::from(page) - 1) * u64::from(limit) + 1;
        let last = (u64::from(page) * u64::from(limit)).min(total);
        format!("Showing {} to {} of {}", first, last, total)
    }
}
