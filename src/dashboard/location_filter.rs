//! Process-wide "only my region" toggle.
//!
//! The filter knows nothing about feeds. Changing it yields a
//! [`FilterChange`] which the controller applies to every feed in one call.

use super::*;

/// A published change of the location filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterChange {
    pub enabled: bool,
    /// Incremented on every change.
    pub generation: u64,
}

#[derive(Clone, Debug, Default)]
pub struct LocationFilter {
    enabled: bool,
    generation: u64,
}

impl LocationFilter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            generation: 0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Set the toggle; returns the change only if the value actually flipped.
    pub fn set(&mut self, enabled: bool) -> Option<FilterChange> {
        if self.enabled == enabled {
            return None;
        }
        self.enabled = enabled;
        self.generation += 1;
        Some(FilterChange {
            enabled,
            generation: self.generation,
        })
    }
}

impl DashboardController {
    pub fn filter_enabled(&self) -> bool {
        self.filter.enabled()
    }

    pub fn toggle_location_filter(&mut self) {
        self.set_location_filter(!self.filter.enabled());
    }

    pub fn set_location_filter(&mut self, enabled: bool) {
        if let Some(change) = self.filter.set(enabled) {
            self.on_filter_changed(change);
        }
    }

    /// Invalidate every summary and restart full views on page 1 under the new scope.
    fn on_filter_changed(&mut self, change: FilterChange) {
        tracing::info!(
            "Location filter {} (generation {})",
            if change.enabled { "on" } else { "off" },
            change.generation
        );
        for feed in FeedId::ALL {
            let mode = {
                let cache = self.cache_mut(feed);
                cache.summary_items.clear();
                cache.summary_stale = true;
                cache.full_stale = true;
                cache.target_page = 1;
                cache.mode
            };
            self.issue_summary_fetch(feed, false);
            match mode {
                ViewMode::Full => {
                    self.issue_page_fetch(feed, false);
                }
                ViewMode::Summary => self.feeds.get_mut(feed).page_request = None,
            }
        }
    }
}
