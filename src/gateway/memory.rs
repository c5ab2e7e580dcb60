//! In-process backing store used for offline demos and deterministic tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use time::OffsetDateTime;

use super::backend::{GatewayError, HealthBackend};
use crate::model::{
    Alert, ChatReply, FeedId, ImportFile, ImportSummary, Page, Record, RecordFields, RecordId,
    SUMMARY_LIMIT, TurnEntry, ViewerProfile, total_pages_for,
};

/// Backend operations, used to count calls and inject failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchSummary,
    FetchPage,
    FetchAlerts,
    CreateRecord,
    UpdateRecord,
    DeleteRecord,
    BulkImport,
    FetchChatHistory,
    SendChatMessage,
    FetchProfile,
    UpdateNotifications,
}

struct MemoryState {
    profile: ViewerProfile,
    outbreaks: Vec<Record>,
    vaccinations: Vec<Record>,
    alerts: Vec<Alert>,
    history: Vec<TurnEntry>,
    next_id: u64,
    calls: HashMap<Operation, usize>,
    failures: HashMap<Operation, GatewayError>,
}

impl MemoryState {
    fn records(&self, feed: FeedId) -> &Vec<Record> {
        match feed {
            FeedId::Outbreak => &self.outbreaks,
            FeedId::Vaccination => &self.vaccinations,
        }
    }

    fn records_mut(&mut self, feed: FeedId) -> &mut Vec<Record> {
        match feed {
            FeedId::Outbreak => &mut self.outbreaks,
            FeedId::Vaccination => &mut self.vaccinations,
        }
    }

    /// Count the call and return the injected failure, if one is armed.
    fn enter(&mut self, op: Operation) -> Result<(), GatewayError> {
        *self.calls.entry(op).or_default() += 1;
        match self.failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn scoped(&self, feed: FeedId, filter_by_location: bool) -> Vec<Record> {
        let profile = &self.profile;
        self.records(feed)
            .iter()
            .filter(|record| {
                !filter_by_location
                    || (record.text("state") == Some(profile.state.as_str())
                        && record.text("district") == Some(profile.district.as_str()))
            })
            .cloned()
            .collect()
    }

    fn insert(&mut self, feed: FeedId, fields: RecordFields) -> Record {
        let record = Record::new(self.next_id, fields);
        self.next_id += 1;
        self.records_mut(feed).insert(0, record.clone());
        record
    }
}

/// Backing store held entirely in memory.
///
/// Records are kept newest-first. A record belongs to the viewer's region
/// when its `state` and `district` fields match the profile.
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
}

impl InMemoryBackend {
    pub fn new(profile: ViewerProfile) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                profile,
                outbreaks: Vec::new(),
                vaccinations: Vec::new(),
                alerts: Vec::new(),
                history: Vec::new(),
                next_id: 1,
                calls: HashMap::new(),
                failures: HashMap::new(),
            }),
        }
    }

    /// A small populated store for running the dashboard without a server.
    pub fn demo() -> Self {
        let backend = Self::new(ViewerProfile {
            username: "demo".to_string(),
            full_name: "Demo Operator".to_string(),
            state: "Kerala".to_string(),
            district: "Ernakulam".to_string(),
            notifications: true,
        });
        let regions = [("Kerala", "Ernakulam"), ("Kerala", "Thrissur"), ("Goa", "North Goa")];
        for idx in 0..23 {
            let (state, district) = regions[idx % regions.len()];
            backend.insert_record(
                FeedId::Outbreak,
                fields(&[
                    ("disease", "Dengue"),
                    ("severity", if idx % 4 == 0 { "high" } else { "moderate" }),
                    ("state", state),
                    ("district", district),
                ]),
            );
        }
        for idx in 0..14 {
            let (state, district) = regions[idx % regions.len()];
            backend.insert_record(
                FeedId::Vaccination,
                fields(&[
                    ("vaccine_name", "Measles"),
                    ("status", "active"),
                    ("state", state),
                    ("district", district),
                ]),
            );
        }
        backend
    }

    /// Add a record at the front (newest) of a feed.
    pub fn insert_record(&self, feed: FeedId, fields: RecordFields) -> Record {
        self.lock().insert(feed, fields)
    }

    /// Remove the newest `count` records of a feed behind the dashboard's back.
    pub fn truncate_newest(&self, feed: FeedId, count: usize) {
        let mut state = self.lock();
        let records = state.records_mut(feed);
        let count = count.min(records.len());
        records.drain(..count);
    }

    pub fn set_alerts(&self, alerts: Vec<Alert>) {
        self.lock().alerts = alerts;
    }

    /// Seed the stored transcript; `turns` are given oldest-first.
    pub fn seed_history(&self, turns: Vec<TurnEntry>) {
        let mut state = self.lock();
        for turn in turns {
            state.history.insert(0, turn);
        }
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: Operation, err: GatewayError) {
        self.lock().failures.insert(op, err);
    }

    /// Number of times `op` has been called.
    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn record_count(&self, feed: FeedId) -> usize {
        self.lock().records(feed).len()
    }

    pub fn record(&self, feed: FeedId, id: RecordId) -> Option<Record> {
        self.lock()
            .records(feed)
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl HealthBackend for InMemoryBackend {
    fn fetch_summary(
        &self,
        feed: FeedId,
        filter_by_location: bool,
    ) -> Result<Vec<Record>, GatewayError> {
        let mut state = self.lock();
        state.enter(Operation::FetchSummary)?;
        let mut items = state.scoped(feed, filter_by_location);
        items.truncate(SUMMARY_LIMIT);
        Ok(items)
    }

    fn fetch_page(
        &self,
        feed: FeedId,
        page: u32,
        page_size: u32,
        filter_by_location: bool,
    ) -> Result<Page, GatewayError> {
        let mut state = self.lock();
        state.enter(Operation::FetchPage)?;
        let scoped = state.scoped(feed, filter_by_location);
        let total = scoped.len() as u64;
        let size = page_size.max(1) as usize;
        let skip = (page.max(1) as usize - 1) * size;
        let items = scoped.into_iter().skip(skip).take(size).collect();
        Ok(Page {
            items,
            total,
            pages: total_pages_for(total),
        })
    }

    fn fetch_alerts(&self) -> Result<Vec<Alert>, GatewayError> {
        let mut state = self.lock();
        state.enter(Operation::FetchAlerts)?;
        Ok(state.alerts.clone())
    }

    fn create_record(&self, feed: FeedId, fields: &RecordFields) -> Result<Record, GatewayError> {
        let mut state = self.lock();
        state.enter(Operation::CreateRecord)?;
        Ok(state.insert(feed, fields.clone()))
    }

    fn update_record(
        &self,
        feed: FeedId,
        id: RecordId,
        fields: &RecordFields,
    ) -> Result<Record, GatewayError> {
        let mut state = self.lock();
        state.enter(Operation::UpdateRecord)?;
        let record = state
            .records_mut(feed)
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| GatewayError::NotFound(format!("{} {id}", feed.noun())))?;
        for (key, value) in fields {
            record.fields.insert(key.clone(), value.clone());
        }
        Ok(record.clone())
    }

    fn delete_record(&self, feed: FeedId, id: RecordId) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.enter(Operation::DeleteRecord)?;
        let records = state.records_mut(feed);
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Err(GatewayError::NotFound(format!("{} {id}", feed.noun())));
        }
        Ok(())
    }

    fn bulk_import(&self, feed: FeedId, file: &ImportFile) -> Result<ImportSummary, GatewayError> {
        let mut state = self.lock();
        state.enter(Operation::BulkImport)?;
        let rows = parse_csv(&file.bytes)?;
        let imported_count = rows.len() as u64;
        for mut row in rows {
            let existing = row
                .remove("id")
                .and_then(|value| value.as_str().and_then(|text| text.parse().ok()))
                .map(RecordId);
            let position = existing
                .and_then(|id| state.records(feed).iter().position(|record| record.id == id));
            match position {
                Some(pos) => state.records_mut(feed)[pos].fields.extend(row),
                None => {
                    state.insert(feed, row);
                }
            }
        }
        Ok(ImportSummary {
            message: format!("Successfully uploaded {imported_count} {}", feed.collection()),
            imported_count,
        })
    }

    fn fetch_chat_history(&self) -> Result<Vec<TurnEntry>, GatewayError> {
        let mut state = self.lock();
        state.enter(Operation::FetchChatHistory)?;
        Ok(state.history.clone())
    }

    fn send_chat_message(&self, text: &str) -> Result<ChatReply, GatewayError> {
        let mut state = self.lock();
        state.enter(Operation::SendChatMessage)?;
        let timestamp = OffsetDateTime::now_utc();
        let response = format!("Noted: {text}");
        state.history.insert(0, TurnEntry::operator(text, timestamp));
        state
            .history
            .insert(0, TurnEntry::assistant(response.clone(), timestamp));
        Ok(ChatReply {
            response,
            timestamp,
        })
    }

    fn fetch_profile(&self) -> Result<ViewerProfile, GatewayError> {
        let mut state = self.lock();
        state.enter(Operation::FetchProfile)?;
        Ok(state.profile.clone())
    }

    fn update_notifications(&self, enabled: bool) -> Result<ViewerProfile, GatewayError> {
        let mut state = self.lock();
        state.enter(Operation::UpdateNotifications)?;
        state.profile.notifications = enabled;
        Ok(state.profile.clone())
    }
}

/// Build record fields from string pairs.
pub fn fields(pairs: &[(&str, &str)]) -> RecordFields {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect()
}

fn parse_csv(bytes: &[u8]) -> Result<Vec<RecordFields>, GatewayError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| GatewayError::Validation("CSV file is not valid UTF-8".to_string()))?;
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| GatewayError::Validation("CSV file has no header".to_string()))?
        .split(',')
        .map(str::trim)
        .collect();
    lines
        .enumerate()
        .map(|(idx, line)| {
            let cells: Vec<&str> = line.split(',').map(str::trim).collect();
            if cells.len() != header.len() {
                return Err(GatewayError::Validation(format!(
                    "Row {}: expected {} columns, found {}",
                    idx + 2,
                    header.len(),
                    cells.len()
                )));
            }
            Ok(header
                .iter()
                .zip(cells)
                .map(|(key, cell)| (key.to_string(), Value::String(cell.to_string())))
                .collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new(ViewerProfile {
            username: "asha".to_string(),
            full_name: String::new(),
            state: "Kerala".to_string(),
            district: "Ernakulam".to_string(),
            notifications: false,
        })
    }

    #[test]
    fn summary_is_scoped_and_capped() {
        let backend = backend();
        for idx in 0..8 {
            let district = if idx % 2 == 0 { "Ernakulam" } else { "Thrissur" };
            backend.insert_record(
                FeedId::Outbreak,
                fields(&[("state", "Kerala"), ("district", district)]),
            );
        }
        assert_eq!(backend.fetch_summary(FeedId::Outbreak, false).unwrap().len(), 5);
        let scoped = backend.fetch_summary(FeedId::Outbreak, true).unwrap();
        assert_eq!(scoped.len(), 4);
        assert_eq!(scoped[0].id, RecordId(7));
        assert_eq!(backend.calls(Operation::FetchSummary), 2);
    }

    #[test]
    fn failure_is_consumed_by_one_call() {
        let backend = backend();
        backend.fail_next(Operation::FetchAlerts, GatewayError::Network("down".into()));
        assert!(backend.fetch_alerts().is_err());
        assert!(backend.fetch_alerts().is_ok());
        assert_eq!(backend.calls(Operation::FetchAlerts), 2);
    }

    #[test]
    fn bulk_import_updates_known_ids_and_creates_the_rest() {
        let backend = backend();
        let existing = backend.insert_record(FeedId::Vaccination, fields(&[("status", "planned")]));
        let csv = format!("id,status\n{},active\n,planned\n", existing.id);
        let summary = backend
            .bulk_import(FeedId::Vaccination, &ImportFile::new("v.csv", csv))
            .unwrap();
        assert_eq!(summary.imported_count, 2);
        assert_eq!(summary.message, "Successfully uploaded 2 vaccinations");
        assert_eq!(backend.record_count(FeedId::Vaccination), 2);
        let updated = backend.record(FeedId::Vaccination, existing.id).unwrap();
        assert_eq!(updated.text("status"), Some("active"));
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let backend = backend();
        let err = backend
            .bulk_import(FeedId::Outbreak, &ImportFile::new("o.csv", "disease,state\nDengue\n"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
        assert_eq!(backend.record_count(FeedId::Outbreak), 0);
    }

    #[test]
    fn delete_of_unknown_id_is_not_found() {
        let backend = backend();
        let err = backend.delete_record(FeedId::Outbreak, RecordId(9)).unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }
}
