//! Response shapes of the health API and their conversion into the model.

use serde::Deserialize;
use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    format_description::well_known::Rfc3339, macros::format_description,
};

use super::GatewayError;
use crate::model::{Alert, FeedId, ImportSummary, Page, Record, TurnEntry, total_pages_for};

#[derive(Debug, Deserialize)]
pub(super) struct LocationDataWire {
    #[serde(default)]
    pub(super) state: Option<String>,
    #[serde(default)]
    pub(super) district: Option<String>,
    #[serde(default)]
    pub(super) outbreaks: Vec<Record>,
    #[serde(default)]
    pub(super) vaccinations: Vec<Record>,
}

impl LocationDataWire {
    pub(super) fn into_feed(self, feed: FeedId) -> Vec<Record> {
        match feed {
            FeedId::Outbreak => self.outbreaks,
            FeedId::Vaccination => self.vaccinations,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PageWire {
    items: Vec<Record>,
    total: u64,
    #[serde(default)]
    pages: Option<u32>,
}

impl From<PageWire> for Page {
    fn from(wire: PageWire) -> Self {
        let pages = wire.pages.unwrap_or_else(|| total_pages_for(wire.total));
        Page {
            items: wire.items,
            total: wire.total,
            pages,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AlertsWire {
    #[serde(default)]
    pub(super) alerts: Vec<Alert>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatMessageWire {
    message: String,
    response: Option<String>,
    timestamp: String,
}

impl ChatMessageWire {
    pub(super) fn reply(self) -> Result<crate::model::ChatReply, GatewayError> {
        let timestamp = parse_timestamp(&self.timestamp).map_err(GatewayError::Network)?;
        let response = self
            .response
            .ok_or_else(|| GatewayError::Network("Reply carried no response text".to_string()))?;
        Ok(crate::model::ChatReply {
            response,
            timestamp,
        })
    }
}

/// Expand newest-first stored exchanges into newest-first turns.
///
/// Within one exchange the reply is newer than the question, so it comes first.
pub(super) fn history_turns(
    exchanges: Vec<ChatMessageWire>,
) -> Result<Vec<TurnEntry>, GatewayError> {
    let mut turns = Vec::with_capacity(exchanges.len() * 2);
    for exchange in exchanges {
        let timestamp = parse_timestamp(&exchange.timestamp).map_err(GatewayError::Network)?;
        if let Some(response) = exchange.response {
            turns.push(TurnEntry::assistant(response, timestamp));
        }
        turns.push(TurnEntry::operator(exchange.message, timestamp));
    }
    Ok(turns)
}

#[derive(Debug, Deserialize)]
pub(super) struct ImportWire {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "importedCount")]
    imported_count: Option<u64>,
}

impl ImportWire {
    pub(super) fn into_summary(self) -> ImportSummary {
        let message = self.message.unwrap_or_default();
        let imported_count = self
            .imported_count
            .or_else(|| parse_imported_count(&message))
            .unwrap_or(0);
        ImportSummary {
            message,
            imported_count,
        }
    }
}

/// Pull `N` out of messages like "Successfully uploaded 12 outbreaks".
fn parse_imported_count(message: &str) -> Option<u64> {
    let lowered = message.to_ascii_lowercase();
    let rest = lowered.split("uploaded").nth(1)?;
    rest.split_whitespace().next()?.parse().ok()
}

#[derive(Debug, Deserialize)]
struct ErrorWire {
    detail: serde_json::Value,
}

/// Best-effort human message out of an error body (`{"detail": ...}`).
pub(super) fn error_detail(body: &str) -> String {
    let trimmed = body.trim();
    match serde_json::from_str::<ErrorWire>(trimmed) {
        Ok(ErrorWire {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorWire { detail }) => detail.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

pub(super) fn map_status_error(code: u16, body: &str) -> GatewayError {
    let detail = error_detail(body);
    match code {
        400 | 409 | 413 | 415 | 422 => GatewayError::Validation(detail),
        404 => GatewayError::NotFound(detail),
        _ => GatewayError::Network(format!("HTTP {code}: {detail}")),
    }
}

pub(super) fn parse_json<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body).map_err(|err| {
        let preview = String::from_utf8_lossy(&body[..body.len().min(200)]).into_owned();
        GatewayError::Network(format!("Invalid response ({err}): {preview}"))
    })
}

/// Accept RFC 3339 or the offset-less ISO form the API emits (read as UTC).
pub(crate) fn parse_timestamp(text: &str) -> Result<OffsetDateTime, String> {
    const NAIVE_FORMAT: &[BorrowedFormatItem<'_>] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let trimmed = text.trim();
    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(parsed);
    }
    let without_fraction = trimmed.split('.').next().unwrap_or(trimmed);
    PrimitiveDateTime::parse(without_fraction, NAIVE_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|err| format!("Invalid timestamp {trimmed:?}: {err}"))
}
