//! Client-side view-state engine for the health dashboard.
//!
//! [`DashboardController`] owns one [`CollectionCache`] per feed, the
//! location filter, the alert banner, the viewer profile and the transient
//! notification log. Entry points issue blocking backend calls as background
//! jobs; their results are applied one at a time in
//! [`DashboardController::poll_background_jobs`], which is the only place
//! fetched data enters the caches.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use crate::config::DashboardSettings;
use crate::gateway::{GatewayError, HealthBackend};
use crate::jobs::{JobQueue, JobSpawner, RequestToken, TokenSource};
use crate::model::{FeedId, Record, ViewerProfile};

mod admin;
mod alerts;
mod feeds;
mod jobs;
mod location_filter;
mod notifications;
mod profile;
mod state;

#[cfg(test)]
mod test_support;

use jobs::JobMessage;

pub use admin::{MutationKind, MutationRejected};
pub use location_filter::{FilterChange, LocationFilter};
pub use notifications::{Notification, Notifications, Tone};
pub use state::{
    AlertState, CollectionCache, FetchKey, FetchKind, FetchTicket, Resolution, StaleReason,
    ViewMode,
};

const MAX_RESOLUTIONS: usize = 256;

/// A request currently outstanding for one feed slot.
#[derive(Clone, Copy, Debug)]
struct InFlight {
    token: RequestToken,
    key: FetchKey,
}

/// Cache plus the outstanding summary and page requests of one feed.
struct FeedSlot {
    cache: CollectionCache,
    summary_request: Option<InFlight>,
    page_request: Option<InFlight>,
}

impl FeedSlot {
    fn new(feed: FeedId) -> Self {
        Self {
            cache: CollectionCache::new(feed),
            summary_request: None,
            page_request: None,
        }
    }
}

struct Feeds {
    outbreak: FeedSlot,
    vaccination: FeedSlot,
}

impl Feeds {
    fn get(&self, feed: FeedId) -> &FeedSlot {
        match feed {
            FeedId::Outbreak => &self.outbreak,
            FeedId::Vaccination => &self.vaccination,
        }
    }

    fn get_mut(&mut self, feed: FeedId) -> &mut FeedSlot {
        match feed {
            FeedId::Outbreak => &mut self.outbreak,
            FeedId::Vaccination => &mut self.vaccination,
        }
    }
}

/// Outcome log keyed by request token, oldest entries evicted first.
#[derive(Default)]
struct Resolutions {
    entries: HashMap<RequestToken, Resolution>,
    order: VecDeque<RequestToken>,
}

impl Resolutions {
    fn begin(&mut self, token: RequestToken) {
        self.entries.insert(token, Resolution::Pending);
        self.order.push_back(token);
        while self.order.len() > MAX_RESOLUTIONS {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
    }

    fn settle(&mut self, token: RequestToken, resolution: Resolution) {
        if let Some(entry) = self.entries.get_mut(&token) {
            *entry = resolution;
        }
    }

    fn get(&self, token: RequestToken) -> Option<&Resolution> {
        self.entries.get(&token)
    }
}

/// Maintains dashboard view state and reconciles it with the backing store.
pub struct DashboardController {
    backend: Arc<dyn HealthBackend>,
    jobs: JobQueue<JobMessage>,
    tokens: TokenSource,
    settings: DashboardSettings,
    filter: LocationFilter,
    feeds: Feeds,
    alerts: AlertState,
    alert_request: Option<RequestToken>,
    last_alert_fetch: Option<Instant>,
    profile: Option<ViewerProfile>,
    profile_request: Option<RequestToken>,
    notification_toggle: Option<RequestToken>,
    mutations: HashMap<RequestToken, admin::PendingMutation>,
    notifications: Notifications,
    resolutions: Resolutions,
}

impl DashboardController {
    pub fn new(
        backend: Arc<dyn HealthBackend>,
        spawner: Arc<dyn JobSpawner>,
        settings: DashboardSettings,
    ) -> Self {
        let settings = settings.normalized();
        Self {
            backend,
            jobs: JobQueue::new(spawner),
            tokens: TokenSource::default(),
            filter: LocationFilter::new(settings.filter_by_location),
            feeds: Feeds {
                outbreak: FeedSlot::new(FeedId::Outbreak),
                vaccination: FeedSlot::new(FeedId::Vaccination),
            },
            alerts: AlertState::default(),
            alert_request: None,
            last_alert_fetch: None,
            profile: None,
            profile_request: None,
            notification_toggle: None,
            mutations: HashMap::new(),
            notifications: Notifications::new(settings.notification_ttl()),
            resolutions: Resolutions::default(),
            settings,
        }
    }

    /// Fetch the summaries of every feed, the alerts and the viewer profile.
    pub fn mount(&mut self) {
        tracing::info!(
            "Mounting dashboard (location filter {})",
            if self.filter.enabled() { "on" } else { "off" }
        );
        for feed in FeedId::ALL {
            self.refresh_summary(feed);
        }
        self.fetch_alerts();
        self.fetch_profile();
    }

    /// Apply every completed background job. Returns how many were handled.
    pub fn poll_background_jobs(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let message = match self.jobs.try_recv_message() {
                Ok(message) => message,
                Err(
                    std::sync::mpsc::TryRecvError::Empty
                    | std::sync::mpsc::TryRecvError::Disconnected,
                ) => break,
            };
            handled += 1;
            match message {
                JobMessage::SummaryLoaded(message) => self.apply_summary(message),
                JobMessage::PageLoaded(message) => self.apply_page(message),
                JobMessage::AlertsLoaded(message) => self.apply_alerts(message),
                JobMessage::ProfileLoaded(message) => self.apply_profile(message),
                JobMessage::NotificationsUpdated(message) => {
                    self.apply_notification_toggle(message)
                }
                JobMessage::MutationFinished(message) => self.apply_mutation(message),
            }
        }
        handled
    }

    /// Expire notifications and refresh alerts when the refresh interval elapsed.
    pub fn tick(&mut self, now: Instant) {
        self.notifications.expire(now);
        let due = self
            .last_alert_fetch
            .is_some_and(|last| now.saturating_duration_since(last) >= self.settings.alert_refresh());
        if due {
            tracing::debug!("Alert refresh interval elapsed");
            self.fetch_alerts();
        }
    }

    pub fn cache(&self, feed: FeedId) -> &CollectionCache {
        &self.feeds.get(feed).cache
    }

    pub fn visible_items(&self, feed: FeedId) -> &[Record] {
        self.cache(feed).visible_items()
    }

    pub fn alerts(&self) -> &AlertState {
        &self.alerts
    }

    pub fn profile(&self) -> Option<&ViewerProfile> {
        self.profile.as_ref()
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// Outcome of a request; `None` once the token is too old to be tracked.
    pub fn resolution(&self, token: RequestToken) -> Option<&Resolution> {
        self.resolutions.get(token)
    }

    /// True while a summary or page request for the feed is outstanding.
    pub fn is_loading(&self, feed: FeedId) -> bool {
        let slot = self.feeds.get(feed);
        slot.summary_request.is_some() || slot.page_request.is_some()
    }

    /// True when no request of any kind is outstanding.
    pub fn is_idle(&self) -> bool {
        FeedId::ALL.iter().all(|feed| !self.is_loading(*feed))
            && self.alert_request.is_none()
            && self.profile_request.is_none()
            && self.notification_toggle.is_none()
            && self.mutations.is_empty()
    }

    /// Panel heading, scoped to the viewer's district when the filter is on.
    pub fn feed_heading(&self, feed: FeedId) -> String {
        match (&self.profile, self.filter.enabled()) {
            (Some(profile), true) => {
                format!("{} in {}, {}", feed.title(), profile.district, profile.state)
            }
            _ => format!("{} (All Regions)", feed.title()),
        }
    }

    /// `(first, last, total)` item numbers of the page held in the full view.
    pub fn page_range(&self, feed: FeedId) -> Option<(u64, u64, u64)> {
        self.cache(feed).page_state().map(|state| state.item_range())
    }

    fn cache_mut(&mut self, feed: FeedId) -> &mut CollectionCache {
        &mut self.feeds.get_mut(feed).cache
    }

    fn begin_request(&mut self) -> RequestToken {
        let token = self.tokens.next();
        self.resolutions.begin(token);
        token
    }

    fn notify(&mut self, tone: Tone, text: impl Into<String>) {
        self.notifications.push(tone, text, Instant::now());
    }

    fn notify_failure(&mut self, action: &str, err: &GatewayError) {
        self.notify(Tone::Error, format!("{action}: {err}"));
    }
}
