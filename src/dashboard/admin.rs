//! Create, update, delete and bulk import against a feed's backing store.
//!
//! Successful mutations never patch the cache; they invalidate the feed so
//! both views re-fetch. The one exception is delete, which drops the record
//! from held lists as soon as the server confirms it.

use super::jobs::Loaded;
use super::*;
use crate::model::{ImportFile, ImportSummary, RecordFields, RecordId};

/// Which admin operation a request performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update(RecordId),
    Delete(RecordId),
    BulkImport,
}

impl MutationKind {
    fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::BulkImport => "import",
        }
    }
}

/// A mutation refused before anything was sent.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MutationRejected {
    #[error("No fields to save")]
    EmptyFields,
    #[error("Nothing to update")]
    EmptyPatch,
    #[error("Import file must be a .csv file: {0}")]
    NotCsv(String),
    #[error("Import file is empty: {0}")]
    EmptyFile(String),
}

#[derive(Clone, Copy, Debug)]
pub(super) struct PendingMutation {
    feed: FeedId,
    kind: MutationKind,
}

pub(super) enum MutationOutcome {
    Created(Record),
    Updated(Record),
    Deleted(RecordId),
    Imported(ImportSummary),
}

impl DashboardController {
    pub fn create(
        &mut self,
        feed: FeedId,
        fields: RecordFields,
    ) -> Result<RequestToken, MutationRejected> {
        if fields.is_empty() {
            return Err(self.reject(MutationRejected::EmptyFields));
        }
        Ok(self.begin_mutation(feed, MutationKind::Create, move |backend| {
            backend
                .create_record(feed, &fields)
                .map(MutationOutcome::Created)
        }))
    }

    pub fn update(
        &mut self,
        feed: FeedId,
        id: RecordId,
        patch: RecordFields,
    ) -> Result<RequestToken, MutationRejected> {
        if patch.is_empty() {
            return Err(self.reject(MutationRejected::EmptyPatch));
        }
        Ok(self.begin_mutation(feed, MutationKind::Update(id), move |backend| {
            backend
                .update_record(feed, id, &patch)
                .map(MutationOutcome::Updated)
        }))
    }

    pub fn delete(&mut self, feed: FeedId, id: RecordId) -> RequestToken {
        self.begin_mutation(feed, MutationKind::Delete(id), move |backend| {
            backend
                .delete_record(feed, id)
                .map(|()| MutationOutcome::Deleted(id))
        })
    }

    /// Upload a CSV file. Only the file name and emptiness are checked locally.
    pub fn bulk_import(
        &mut self,
        feed: FeedId,
        file: ImportFile,
    ) -> Result<RequestToken, MutationRejected> {
        if !file.file_name.to_ascii_lowercase().ends_with(".csv") {
            return Err(self.reject(MutationRejected::NotCsv(file.file_name)));
        }
        if file.bytes.is_empty() {
            return Err(self.reject(MutationRejected::EmptyFile(file.file_name)));
        }
        tracing::info!(
            "Importing {} ({} bytes) into {}",
            file.file_name,
            file.bytes.len(),
            feed.collection()
        );
        Ok(self.begin_mutation(feed, MutationKind::BulkImport, move |backend| {
            backend
                .bulk_import(feed, &file)
                .map(MutationOutcome::Imported)
        }))
    }

    /// True while a mutation for the feed is outstanding.
    pub fn is_saving(&self, feed: FeedId) -> bool {
        self.mutations.values().any(|pending| pending.feed == feed)
    }

    fn reject(&mut self, rejection: MutationRejected) -> MutationRejected {
        self.notify(Tone::Warning, rejection.to_string());
        rejection
    }

    fn begin_mutation<F>(&mut self, feed: FeedId, kind: MutationKind, work: F) -> RequestToken
    where
        F: FnOnce(&dyn HealthBackend) -> Result<MutationOutcome, GatewayError> + Send + 'static,
    {
        let token = self.begin_request();
        self.mutations.insert(token, PendingMutation { feed, kind });
        tracing::debug!("Starting {} {} {token}", feed.noun(), kind.verb());
        let backend = Arc::clone(&self.backend);
        self.jobs.begin(move || {
            JobMessage::MutationFinished(Loaded {
                token,
                result: work(backend.as_ref()),
            })
        });
        token
    }

    pub(super) fn apply_mutation(&mut self, message: Loaded<MutationOutcome>) {
        let Loaded { token, result } = message;
        let Some(PendingMutation { feed, kind }) = self.mutations.remove(&token) else {
            return;
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.notify_failure(&format!("Failed to {} {}", kind.verb(), feed.noun()), &err);
                self.settle(token, Resolution::Failed(err));
                return;
            }
        };
        let text = match outcome {
            MutationOutcome::Created(record) => format!("Created {} #{}", feed.noun(), record.id),
            MutationOutcome::Updated(record) => format!("Updated {} #{}", feed.noun(), record.id),
            MutationOutcome::Deleted(id) => {
                if self.cache_mut(feed).remove_record(id) {
                    tracing::debug!("Removed {} #{id} from held lists", feed.noun());
                }
                format!("Deleted {} #{id}", feed.noun())
            }
            MutationOutcome::Imported(summary) => {
                tracing::info!("{}", summary.message);
                format!("Imported {} {}", summary.imported_count, feed.collection())
            }
        };
        self.notify(Tone::Info, text);
        self.settle(token, Resolution::Applied);
        self.invalidate(feed);
    }
}
