//! Summary/full view switching, pagination and feed fetches.
//!
//! Each feed has one summary slot and one page slot. Issuing a request with
//! the same [`FetchKey`] as the outstanding one joins it; any other key
//! replaces it, and the replaced request's response is dropped when it lands.

use super::jobs::FetchLoaded;
use super::*;
use crate::model::{PAGE_SIZE, Page, PageState, SUMMARY_LIMIT};

impl DashboardController {
    /// Switch a feed between summary and full presentation.
    pub fn set_mode(&mut self, feed: FeedId, mode: ViewMode) -> FetchTicket {
        let cache = self.cache_mut(feed);
        cache.mode = mode;
        match mode {
            ViewMode::Summary => {
                if cache.summary_stale {
                    self.issue_summary_fetch(feed, false)
                } else {
                    FetchTicket::Cached
                }
            }
            ViewMode::Full => {
                if !cache.full_fetched || cache.full_stale {
                    self.issue_page_fetch(feed, false)
                } else {
                    match self.feeds.get(feed).page_request {
                        Some(in_flight) => FetchTicket::Coalesced(in_flight.token),
                        None => FetchTicket::Cached,
                    }
                }
            }
        }
    }

    /// Request a page of the full view. Pages outside `[1, total_pages]` are rejected.
    pub fn set_page(&mut self, feed: FeedId, page: u32) -> FetchTicket {
        let Some(page_state) = self.cache(feed).page_state else {
            tracing::debug!("{} page {page} rejected: no page loaded", feed.noun());
            return FetchTicket::Rejected;
        };
        if !page_state.accepts(page) {
            tracing::debug!(
                "{} page {page} rejected: {} pages",
                feed.noun(),
                page_state.total_pages
            );
            return FetchTicket::Rejected;
        }
        let cache = self.cache_mut(feed);
        cache.target_page = page;
        if page == page_state.page_number && !cache.full_stale {
            // Already showing it and nothing newer is owed; an outstanding
            // fetch for another page is now stale.
            self.feeds.get_mut(feed).page_request = None;
            return FetchTicket::Cached;
        }
        self.issue_page_fetch(feed, false)
    }

    pub fn next_page(&mut self, feed: FeedId) -> FetchTicket {
        let target = self.cache(feed).target_page.saturating_add(1);
        self.set_page(feed, target)
    }

    pub fn previous_page(&mut self, feed: FeedId) -> FetchTicket {
        let target = self.cache(feed).target_page.saturating_sub(1);
        self.set_page(feed, target)
    }

    /// Re-fetch the summary under the current filter.
    pub fn refresh_summary(&mut self, feed: FeedId) -> FetchTicket {
        self.issue_summary_fetch(feed, false)
    }

    /// Mark a feed stale and re-fetch its summary and, if shown, its current page.
    ///
    /// Outstanding requests are replaced even when their key matches, since
    /// they may have been answered before the change that caused the invalidation.
    pub fn invalidate(&mut self, feed: FeedId) {
        tracing::debug!("Invalidating {} cache", feed.noun());
        let mode = {
            let cache = self.cache_mut(feed);
            cache.summary_stale = true;
            cache.full_stale = true;
            cache.mode
        };
        self.issue_summary_fetch(feed, true);
        match mode {
            ViewMode::Full => {
                self.issue_page_fetch(feed, true);
            }
            // A page answered before the change must not clear the stale mark.
            ViewMode::Summary => self.feeds.get_mut(feed).page_request = None,
        }
    }

    pub(super) fn issue_summary_fetch(&mut self, feed: FeedId, force: bool) -> FetchTicket {
        let key = FetchKey {
            feed,
            kind: FetchKind::Summary,
            filter: self.filter.enabled(),
        };
        if let Some(in_flight) = self.feeds.get(feed).summary_request
            && in_flight.key == key
            && !force
        {
            tracing::debug!("Joined {} summary request {}", feed.noun(), in_flight.token);
            return FetchTicket::Coalesced(in_flight.token);
        }
        let token = self.begin_request();
        self.feeds.get_mut(feed).summary_request = Some(InFlight { token, key });
        tracing::debug!("Fetching {} summary {token} (filter {})", feed.noun(), key.filter);
        let backend = Arc::clone(&self.backend);
        self.jobs.begin(move || {
            JobMessage::SummaryLoaded(FetchLoaded {
                token,
                key,
                result: backend.fetch_summary(feed, key.filter),
            })
        });
        FetchTicket::Issued(token)
    }

    pub(super) fn issue_page_fetch(&mut self, feed: FeedId, force: bool) -> FetchTicket {
        let page = self.cache(feed).target_page;
        let key = FetchKey {
            feed,
            kind: FetchKind::Page(page),
            filter: self.filter.enabled(),
        };
        if let Some(in_flight) = self.feeds.get(feed).page_request
            && in_flight.key == key
            && !force
        {
            tracing::debug!("Joined {} page {page} request {}", feed.noun(), in_flight.token);
            return FetchTicket::Coalesced(in_flight.token);
        }
        let token = self.begin_request();
        if let Some(previous) = self.feeds.get_mut(feed).page_request.replace(InFlight { token, key })
        {
            tracing::debug!("{} page request {} superseded by {token}", feed.noun(), previous.token);
        }
        tracing::debug!("Fetching {} page {page} {token} (filter {})", feed.noun(), key.filter);
        let backend = Arc::clone(&self.backend);
        self.jobs.begin(move || {
            JobMessage::PageLoaded(FetchLoaded {
                token,
                key,
                result: backend.fetch_page(feed, page, PAGE_SIZE, key.filter),
            })
        });
        FetchTicket::Issued(token)
    }

    pub(super) fn apply_summary(&mut self, message: FetchLoaded<Vec<Record>>) {
        let FetchLoaded { token, key, result } = message;
        let feed = key.feed;
        let resolution = match self.check_current(token, key) {
            Err(reason) => Resolution::Discarded(reason),
            Ok(()) => match result {
                Ok(mut items) => {
                    items.truncate(SUMMARY_LIMIT);
                    let cache = self.cache_mut(feed);
                    cache.summary_items = items;
                    cache.summary_stale = false;
                    Resolution::Applied
                }
                Err(err) => {
                    self.notify_failure(&format!("Failed to load {}", feed.collection()), &err);
                    Resolution::Failed(err)
                }
            },
        };
        self.settle(token, resolution);
    }

    pub(super) fn apply_page(&mut self, message: FetchLoaded<Page>) {
        let FetchLoaded { token, key, result } = message;
        let feed = key.feed;
        let FetchKind::Page(requested) = key.kind else {
            return;
        };
        let resolution = match self.check_current(token, key) {
            Err(reason) => Resolution::Discarded(reason),
            Ok(()) => match result {
                Ok(page) if requested > page.pages.max(1) => {
                    let clamped = page.pages.max(1);
                    tracing::debug!(
                        "{} shrank to {} pages; requesting page {clamped} instead of {requested}",
                        feed.collection(),
                        page.pages
                    );
                    let cache = self.cache_mut(feed);
                    cache.target_page = clamped;
                    cache.full_stale = true;
                    self.issue_page_fetch(feed, false);
                    Resolution::Discarded(StaleReason::OutOfRange)
                }
                Ok(page) => {
                    let state = PageState::new(feed, requested, page.total);
                    let cache = self.cache_mut(feed);
                    cache.full_items = page.items;
                    cache.page_state = Some(state);
                    cache.target_page = state.page_number;
                    cache.full_stale = false;
                    cache.full_fetched = true;
                    Resolution::Applied
                }
                Err(err) => {
                    let cache = self.cache_mut(feed);
                    cache.target_page = cache.page_state.map_or(1, |state| state.page_number);
                    self.notify_failure(
                        &format!("Failed to load {} page {requested}", feed.collection()),
                        &err,
                    );
                    Resolution::Failed(err)
                }
            },
        };
        self.settle(token, resolution);
    }

    /// Release the request slot if `token` still owns it.
    ///
    /// A filter change always replaces or clears both slots, so an owning
    /// token was issued under the filter now in effect.
    fn check_current(&mut self, token: RequestToken, key: FetchKey) -> Result<(), StaleReason> {
        let slot = self.feeds.get_mut(key.feed);
        let request = match key.kind {
            FetchKind::Summary => &mut slot.summary_request,
            FetchKind::Page(_) => &mut slot.page_request,
        };
        if request.is_none_or(|in_flight| in_flight.token != token) {
            return Err(StaleReason::Superseded);
        }
        *request = None;
        Ok(())
    }

    pub(super) fn settle(&mut self, token: RequestToken, resolution: Resolution) {
        if let Resolution::Discarded(reason) = &resolution {
            tracing::debug!("Dropped response {token}: {reason:?}");
        }
        self.resolutions.settle(token, resolution);
    }
}
