//! Resource List View State
//!
//! State behind a filterable, paginated resource listing. Search, filter and
//! page changes only mark the view dirty; the next [`ResourceListView::take_pending`]
//! turns all of them into a single request. Responses are applied through a
//! [`RequestSequencer`] so a slow, older response can never overwrite a
//! newer one.

use crate::api::{format_api_error, ApiError, ApiResult};
use crate::resource::{
    build_query, FilterKey, FilterSet, PageWindow, PaginationController, QueryParams, Resource,
    ResourceClient, ResourcePage,
};

/// Identifies one issued list request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Hands out increasing tickets and rejects responses older than the newest applied one
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: u64,
    applied: u64,
}

impl RequestSequencer {
    pub fn issue(&mut self) -> RequestTicket {
        self.issued += 1;
        RequestTicket(self.issued)
    }

    /// Whether a response for `ticket` may be applied; accepting it makes it the newest
    pub fn accept(&mut self, ticket: RequestTicket) -> bool {
        if ticket.0 <= self.applied {
            return false;
        }
        self.applied = ticket.0;
        true
    }

    /// Requests issued but not yet superseded by an applied response
    pub fn in_flight(&self) -> bool {
        self.issued > self.applied
    }
}

/// A list request ready to be sent
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub ticket: RequestTicket,
    pub query: QueryParams,
}

/// Outcome of applying a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Fresh,
    /// Older than what is already displayed; dropped
    Stale,
}

/// Listing state: query inputs, last results, loading/error flags
pub struct ResourceListView {
    search: String,
    filters: FilterSet,
    pub pagination: PaginationController,
    pub resources: Vec<Resource>,
    pub loading: bool,
    pub error_message: Option<String>,
    /// Set when the backend rejected the session; callers should send the user to login
    pub session_expired: bool,
    dirty: bool,
    sequencer: RequestSequencer,
}

impl ResourceListView {
    pub fn new(page_size: u32) -> Self {
        Self {
            search: String::new(),
            filters: FilterSet::new(),
            pagination: PaginationController::new(page_size),
            resources: Vec::new(),
            loading: false,
            error_message: None,
            session_expired: false,
            // The first render always fetches
            dirty: true,
            sequencer: RequestSequencer::default(),
        }
    }

    pub fn with_window(mut self, window: PageWindow) -> Self {
        self.pagination = self.pagination.with_window(window);
        self
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // =========================================================================
    // Query inputs
    // =========================================================================

    pub fn set_search(&mut self, text: &str) {
        if self.search == text {
            return;
        }
        self.search = text.to_string();
        self.on_query_changed();
    }

    pub fn set_filter(&mut self, key: FilterKey, value: &str) {
        if self.filters.set(key, value) {
            self.on_query_changed();
        }
    }

    pub fn clear_filter(&mut self, key: FilterKey) {
        if self.filters.remove(key) {
            self.on_query_changed();
        }
    }

    pub fn clear_filters(&mut self) {
        let cleared_filters = self.filters.clear();
        let cleared_search = !self.search.is_empty();
        self.search.clear();
        if cleared_filters || cleared_search {
            self.on_query_changed();
        }
    }

    /// Different results: start again from the first page
    fn on_query_changed(&mut self) {
        self.pagination.reset();
        self.dirty = true;
    }

    /// Returns false when `page` is out of range or already current
    pub fn go_to(&mut self, page: u32) -> bool {
        let moved = self.pagination.go_to(page);
        if moved {
            self.dirty = true;
        }
        moved
    }

    pub fn next_page(&mut self) {
        if self.pagination.next() {
            self.dirty = true;
        }
    }

    pub fn prev_page(&mut self) {
        if self.pagination.prev() {
            self.dirty = true;
        }
    }

    /// Force a re-fetch of the current page (after create/update/delete)
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    // =========================================================================
    // Fetch lifecycle
    // =========================================================================

    /// The single request covering every change since the last call, if any
    pub fn take_pending(&mut self) -> Option<ListRequest> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        self.loading = true;

        let ticket = self.sequencer.issue();
        let query = build_query(self.pagination.request(), &self.filters, &self.search);
        tracing::debug!("List request #{}: {}", ticket.0, query.to_query_string());
        Some(ListRequest { ticket, query })
    }

    /// Apply a response unless a newer one has already been applied
    pub fn apply(&mut self, ticket: RequestTicket, result: ApiResult<ResourcePage>) -> Applied {
        if !self.sequencer.accept(ticket) {
            tracing::warn!("Discarding stale list response #{}", ticket.0);
            return Applied::Stale;
        }

        self.loading = self.sequencer.in_flight();
        match result {
            Ok(page) => {
                self.resources = page.resources;
                self.pagination.apply_server(page.pagination);
                self.error_message = None;
            }
            Err(e) => {
                if matches!(e, ApiError::Unauthenticated) {
                    self.session_expired = true;
                }
                self.error_message = Some(format_api_error(&e));
                self.resources.clear();
            }
        }
        Applied::Fresh
    }

    /// Issue the pending request (if any) and apply its response.
    /// Returns whether a fetch happened.
    pub async fn refresh(&mut self, client: &ResourceClient) -> bool {
        let Some(request) = self.take_pending() else {
            return false;
        };
        let result = client.list(&request.query).await;
        self.apply(request.ticket, result);
        true
    }
}

impl Default for ResourceListView {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Pagination;

    fn page(ids: &[&str], pagination: Pagination) -> ResourcePage {
        ResourcePage {
            resources: ids
                .iter()
                .map(|id| Resource {
                    id: id.to_string(),
                    ..Default::default()
                })
                .collect(),
            pagination,
        }
    }

    fn five_pages(page_no: u32) -> Pagination {
        Pagination {
            page: page_no,
            limit: 10,
            total: 47,
            pages: 5,
        }
    }

    #[test]
    fn test_first_render_fetches_once() {
        let mut view = ResourceListView::new(10);
        assert!(view.take_pending().is_some());
        assert!(view.take_pending().is_none());
    }

    #[test]
    fn test_simultaneous_changes_coalesce() {
        let mut view = ResourceListView::new(10);
        let first = view.take_pending().unwrap();
        view.apply(first.ticket, Ok(page(&["a"], five_pages(1))));

        view.set_search("laptop");
        view.set_filter(FilterKey::Department, "Physics");
        view.set_filter(FilterKey::Location, "all");

        let request = view.take_pending().expect("one fetch");
        assert_eq!(request.query.get("search"), Some("laptop"));
        assert_eq!(request.query.get("department"), Some("Physics"));
        assert_eq!(request.query.get("location"), None);
        assert!(view.take_pending().is_none());
    }

    #[test]
    fn test_unchanged_inputs_do_not_refetch() {
        let mut view = ResourceListView::new(10);
        view.take_pending();
        view.set_search("");
        view.clear_filters();
        view.go_to(1);
        assert!(view.take_pending().is_none());
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut view = ResourceListView::new(10);
        let first = view.take_pending().unwrap();
        view.apply(first.ticket, Ok(page(&[], five_pages(1))));
        view.go_to(3);
        view.set_filter(FilterKey::CostMin, "500");
        let request = view.take_pending().unwrap();
        assert_eq!(request.query.get("page"), Some("1"));
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut view = ResourceListView::new(10);
        view.set_filter(FilterKey::Department, "A");
        let a = view.take_pending().unwrap();
        view.set_filter(FilterKey::Department, "B");
        let b = view.take_pending().unwrap();

        assert_eq!(view.apply(b.ticket, Ok(page(&["b1"], five_pages(1)))), Applied::Fresh);
        assert_eq!(view.apply(a.ticket, Ok(page(&["a1"], five_pages(1)))), Applied::Stale);
        assert_eq!(view.resources[0].id, "b1");
        assert!(!view.loading);
    }

    #[test]
    fn test_in_order_responses_both_apply() {
        let mut view = ResourceListView::new(10);
        let a = view.take_pending().unwrap();
        view.next_page();
        view.invalidate();
        let b = view.take_pending().unwrap();

        assert_eq!(view.apply(a.ticket, Ok(page(&["a1"], five_pages(1)))), Applied::Fresh);
        assert!(view.loading);
        assert_eq!(view.apply(b.ticket, Ok(page(&["b1"], five_pages(1)))), Applied::Fresh);
        assert!(!view.loading);
    }

    #[test]
    fn test_unauthenticated_marks_session_expired() {
        let mut view = ResourceListView::new(10);
        let request = view.take_pending().unwrap();
        view.apply(request.ticket, Err(ApiError::Unauthenticated));
        assert!(view.session_expired);
        assert!(view.error_message.is_some());
    }

    #[test]
    fn test_navigation_marks_dirty_only_within_bounds() {
        let mut view = ResourceListView::new(10);
        let request = view.take_pending().unwrap();
        view.apply(request.ticket, Ok(page(&[], five_pages(1))));

        view.prev_page();
        assert!(!view.is_dirty());
        assert!(!view.go_to(6));
        assert!(!view.is_dirty());
        assert!(view.pagination.has_next());
        view.next_page();
        assert_eq!(view.take_pending().unwrap().query.get("page"), Some("2"));
    }
}
