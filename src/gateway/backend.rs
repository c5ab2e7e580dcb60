use crate::model::{
    Alert, ChatReply, FeedId, ImportFile, ImportSummary, Page, Record, RecordFields, RecordId,
    TurnEntry, ViewerProfile,
};

/// User-visible failures of a backing-store call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Transport failure, timeout, server fault or an undecodable response.
    #[error("Network error: {0}")]
    Network(String),
    /// The backing store rejected the request contents.
    #[error("Rejected: {0}")]
    Validation(String),
    /// The referenced record no longer exists.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// The backing store as seen by the dashboard and chat session.
///
/// Calls block; callers run them on background jobs and apply the results on
/// the owning thread.
pub trait HealthBackend: Send + Sync + 'static {
    /// Up to five newest-first records, optionally scoped to the viewer's region.
    fn fetch_summary(&self, feed: FeedId, filter_by_location: bool)
    -> Result<Vec<Record>, GatewayError>;

    fn fetch_page(
        &self,
        feed: FeedId,
        page: u32,
        page_size: u32,
        filter_by_location: bool,
    ) -> Result<Page, GatewayError>;

    fn fetch_alerts(&self) -> Result<Vec<Alert>, GatewayError>;

    fn create_record(&self, feed: FeedId, fields: &RecordFields) -> Result<Record, GatewayError>;

    fn update_record(
        &self,
        feed: FeedId,
        id: RecordId,
        fields: &RecordFields,
    ) -> Result<Record, GatewayError>;

    fn delete_record(&self, feed: FeedId, id: RecordId) -> Result<(), GatewayError>;

    fn bulk_import(&self, feed: FeedId, file: &ImportFile) -> Result<ImportSummary, GatewayError>;

    /// Stored transcript, newest turn first.
    fn fetch_chat_history(&self) -> Result<Vec<TurnEntry>, GatewayError>;

    fn send_chat_message(&self, text: &str) -> Result<ChatReply, GatewayError>;

    fn fetch_profile(&self) -> Result<ViewerProfile, GatewayError>;

    fn update_notifications(&self, enabled: bool) -> Result<ViewerProfile, GatewayError>;
}
