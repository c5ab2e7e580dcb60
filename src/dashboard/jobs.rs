use super::admin::MutationOutcome;
use super::state::FetchKey;
use crate::gateway::GatewayError;
use crate::jobs::RequestToken;
use crate::model::{Alert, Page, Record, ViewerProfile};

/// Result of a feed fetch, tagged with the key captured at issue time.
pub(super) struct FetchLoaded<T> {
    pub token: RequestToken,
    pub key: FetchKey,
    pub result: Result<T, GatewayError>,
}

/// Result of a request that is not tied to a feed.
pub(super) struct Loaded<T> {
    pub token: RequestToken,
    pub result: Result<T, GatewayError>,
}

pub(super) enum JobMessage {
    SummaryLoaded(FetchLoaded<Vec<Record>>),
    PageLoaded(FetchLoaded<Page>),
    AlertsLoaded(Loaded<Vec<Alert>>),
    ProfileLoaded(Loaded<ViewerProfile>),
    NotificationsUpdated(Loaded<ViewerProfile>),
    MutationFinished(Loaded<MutationOutcome>),
}
