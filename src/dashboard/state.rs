use crate::gateway::GatewayError;
use crate::jobs::RequestToken;
use crate::model::{Alert, FeedId, PageState, Record, RecordId};

/// How a feed is presented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
    /// First few records of the location-scoped snapshot.
    #[default]
    Summary,
    /// One page of the paginated feed.
    Full,
}

/// What a fetch asks the backing store for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Summary,
    Page(u32),
}

/// Identity of a fetch; identical keys in flight together are coalesced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub feed: FeedId,
    pub kind: FetchKind,
    /// Location filter value captured when the request was issued.
    pub filter: bool,
}

/// What a fetch entry point did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchTicket {
    /// A new request was sent.
    Issued(RequestToken),
    /// An identical request was already in flight; its token is returned.
    Coalesced(RequestToken),
    /// The held data is current; nothing was sent.
    Cached,
    /// The request was invalid (e.g. page out of range); state is unchanged.
    Rejected,
}

impl FetchTicket {
    pub fn token(self) -> Option<RequestToken> {
        match self {
            Self::Issued(token) | Self::Coalesced(token) => Some(token),
            Self::Cached | Self::Rejected => None,
        }
    }
}

/// Why a response was dropped instead of applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaleReason {
    /// A newer request for the same feed and mode was issued, or a filter
    /// change or invalidation released the slot.
    Superseded,
    /// The feed shrank below the requested page; a clamped page was requested instead.
    OutOfRange,
}

/// Outcome of a request, as observed by every caller holding its token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Pending,
    Applied,
    Failed(GatewayError),
    Discarded(StaleReason),
}

/// Last-fetched data for one feed.
#[derive(Clone, Debug)]
pub struct CollectionCache {
    feed: FeedId,
    pub(super) mode: ViewMode,
    pub(super) summary_items: Vec<Record>,
    pub(super) full_items: Vec<Record>,
    pub(super) page_state: Option<PageState>,
    /// Summary must be re-fetched before it can be trusted.
    pub(super) summary_stale: bool,
    /// The held page predates a filter change or mutation; cleared only when a
    /// page response is applied.
    pub(super) full_stale: bool,
    /// A full-mode fetch has completed this session.
    pub(super) full_fetched: bool,
    /// Page the full view is heading to; equals `page_state.page_number` when settled.
    pub(super) target_page: u32,
}

impl CollectionCache {
    pub(super) fn new(feed: FeedId) -> Self {
        Self {
            feed,
            mode: ViewMode::Summary,
            summary_items: Vec::new(),
            full_items: Vec::new(),
            page_state: None,
            summary_stale: true,
            full_stale: false,
            full_fetched: false,
            target_page: 1,
        }
    }

    pub fn feed(&self) -> FeedId {
        self.feed
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn summary_items(&self) -> &[Record] {
        &self.summary_items
    }

    pub fn full_items(&self) -> &[Record] {
        &self.full_items
    }

    pub fn page_state(&self) -> Option<PageState> {
        self.page_state
    }

    /// Records the renderer should show for the current mode.
    pub fn visible_items(&self) -> &[Record] {
        match self.mode {
            ViewMode::Summary => &self.summary_items,
            ViewMode::Full => &self.full_items,
        }
    }

    pub fn is_summary_stale(&self) -> bool {
        self.summary_stale
    }

    /// Drop a record from every held list. Totals are left alone.
    pub(super) fn remove_record(&mut self, id: RecordId) -> bool {
        let before = self.summary_items.len() + self.full_items.len();
        self.summary_items.retain(|record| record.id != id);
        self.full_items.retain(|record| record.id != id);
        before != self.summary_items.len() + self.full_items.len()
    }
}

/// Alert banner contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlertState {
    pub(super) items: Vec<Alert>,
    pub(super) visible: bool,
}

impl AlertState {
    pub fn items(&self) -> &[Alert] {
        &self.items
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Replace the alerts; only a non-empty list may raise the banner.
    pub(super) fn replace(&mut self, items: Vec<Alert>) {
        if !items.is_empty() {
            self.visible = true;
        }
        self.items = items;
    }

    pub(super) fn dismiss(&mut self) {
        self.visible = false;
    }
}
