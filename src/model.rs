//! Data model shared by the dashboard, the chat session and the gateway.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Number of records shown per page in the full view.
pub const PAGE_SIZE: u32 = 10;
/// Maximum number of records kept in a summary snapshot.
pub const SUMMARY_LIMIT: usize = 5;

/// Identifies one of the independently paginated feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedId {
    /// Disease outbreak reports.
    Outbreak,
    /// Vaccination campaigns.
    Vaccination,
}

impl FeedId {
    /// Every feed, in display order.
    pub const ALL: [FeedId; 2] = [FeedId::Outbreak, FeedId::Vaccination];

    /// Collection name used by the backing store (`outbreaks`, `vaccinations`).
    pub fn collection(self) -> &'static str {
        match self {
            Self::Outbreak => "outbreaks",
            Self::Vaccination => "vaccinations",
        }
    }

    /// Singular noun for status messages.
    pub fn noun(self) -> &'static str {
        match self {
            Self::Outbreak => "outbreak",
            Self::Vaccination => "vaccination",
        }
    }

    /// Panel title shown above the feed.
    pub fn title(self) -> &'static str {
        match self {
            Self::Outbreak => "Recent Outbreaks",
            Self::Vaccination => "Vaccination Campaigns",
        }
    }
}

/// Server-assigned identity of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Feed-specific fields of a record, keyed by field name.
pub type RecordFields = serde_json::Map<String, serde_json::Value>;

/// A single feed item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identity; never changed by admin operations.
    pub id: RecordId,
    /// Every other field, e.g. `disease`/`severity` or `vaccine_name`/`doses_allocated`.
    #[serde(flatten)]
    pub fields: RecordFields,
}

impl Record {
    pub fn new(id: u64, fields: RecordFields) -> Self {
        Self {
            id: RecordId(id),
            fields,
        }
    }

    /// String value of a field, if present and textual.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|value| value.as_str())
    }
}

/// Pagination metadata for the page currently held in a full view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageState {
    pub feed: FeedId,
    pub page_number: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PageState {
    /// Build page metadata from a server total, clamping the page into range.
    pub fn new(feed: FeedId, page_number: u32, total_items: u64) -> Self {
        let total_pages = total_pages_for(total_items);
        Self {
            feed,
            page_number: page_number.clamp(1, total_pages.max(1)),
            page_size: PAGE_SIZE,
            total_items,
            total_pages,
        }
    }

    /// Highest page number that may be displayed (at least 1).
    pub fn max_page(&self) -> u32 {
        self.total_pages.max(1)
    }

    /// True when `page` lies within `[1, total_pages]`.
    pub fn accepts(&self, page: u32) -> bool {
        page >= 1 && page <= self.total_pages
    }

    /// One-based item numbers shown on this page plus the total, for
    /// "Showing 11 to 20 of 23" readouts.
    pub fn item_range(&self) -> (u64, u64, u64) {
        if self.total_items == 0 {
            return (0, 0, 0);
        }
        let size = u64::from(self.page_size);
        let first = u64::from(self.page_number - 1) * size + 1;
        let last = (u64::from(self.page_number) * size).min(self.total_items);
        (first, last, self.total_items)
    }
}

/// `ceil(total_items / PAGE_SIZE)`.
pub fn total_pages_for(total_items: u64) -> u32 {
    let pages = total_items.div_ceil(u64::from(PAGE_SIZE));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// One page of a feed as returned by the backing store.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    pub total: u64,
    pub pages: u32,
}

/// What an alert refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Outbreak,
    Vaccination,
}

/// Alert severity as reported by the backing store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Moderate,
    Low,
    #[default]
    #[serde(other)]
    Info,
}

/// Active notification shown in the alert banner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    #[serde(default)]
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

/// Which party authored a transcript turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speaker {
    Operator,
    Assistant,
}

/// One entry of the conversation transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: OffsetDateTime,
}

impl TurnEntry {
    pub fn operator(text: impl Into<String>, timestamp: OffsetDateTime) -> Self {
        Self {
            speaker: Speaker::Operator,
            text: text.into(),
            timestamp,
        }
    }

    pub fn assistant(text: impl Into<String>, timestamp: OffsetDateTime) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            timestamp,
        }
    }
}

/// Assistant answer to a single operator message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatReply {
    pub response: String,
    pub timestamp: OffsetDateTime,
}

/// The signed-in viewer, including their home region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerProfile {
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    pub state: String,
    pub district: String,
    #[serde(default)]
    pub notifications: bool,
}

/// A bulk-import upload. The content is passed through untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImportFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Result of a successful bulk import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportSummary {
    pub message: String,
    pub imported_count: u64,
}
