//! HTTP client for the health API.

use std::sync::OnceLock;

use serde_json::json;
use url::Url;

use super::wire::{
    self, AlertsWire, ChatMessageWire, ImportWire, LocationDataWire, PageWire, map_status_error,
    parse_json,
};
use super::{GatewayError, HealthBackend};
use crate::config::ServerSettings;
use crate::http_client;
use crate::model::{
    Alert, ChatReply, FeedId, ImportFile, ImportSummary, Page, Record, RecordFields, RecordId,
    SUMMARY_LIMIT, TurnEntry, ViewerProfile,
};

const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Viewer home region used to scope location-filtered page requests.
#[derive(Clone, Debug, PartialEq, Eq)]
struct HomeRegion {
    state: String,
    district: String,
}

enum RequestBody<'a> {
    Empty,
    Json(serde_json::Value),
    Multipart { boundary: String, bytes: &'a [u8] },
}

/// [`HealthBackend`] over the REST API, authenticated with a bearer token.
pub struct HttpGateway {
    base_url: Url,
    api_token: Option<String>,
    assistant_url: Option<String>,
    home_region: OnceLock<HomeRegion>,
}

impl HttpGateway {
    pub fn new(settings: &ServerSettings) -> Result<Self, GatewayError> {
        let mut base_url = Url::parse(settings.base_url.trim()).map_err(|err| {
            GatewayError::Validation(format!("Invalid server URL {}: {err}", settings.base_url))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            api_token: settings.resolved_api_token(),
            assistant_url: settings.assistant_url.clone(),
            home_region: OnceLock::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|err| GatewayError::Validation(format!("Invalid endpoint {path}: {err}")))
    }

    fn send(&self, method: &str, url: &Url, body: RequestBody<'_>) -> Result<Vec<u8>, GatewayError> {
        tracing::debug!("{method} {url}");
        let mut request = http_client::agent()
            .request_url(method, url)
            .set("Accept", "application/json");
        if let Some(token) = self.api_token.as_deref() {
            request = request.set("Authorization", &format!("Bearer {}", token.trim()));
        }
        let result = match body {
            RequestBody::Empty => request.call(),
            RequestBody::Json(value) => request.send_json(value),
            RequestBody::Multipart { boundary, bytes } => request
                .set(
                    "Content-Type",
                    &format!("multipart/form-data; boundary={boundary}"),
                )
                .send_bytes(bytes),
        };
        match result {
            Ok(response) => read_body(response),
            Err(ureq::Error::Status(code, response)) => {
                let body = read_body(response)
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .unwrap_or_else(|err| err.to_string());
                Err(map_status_error(code, &body))
            }
            Err(ureq::Error::Transport(err)) => Err(GatewayError::Network(err.to_string())),
        }
    }

    fn get<T: for<'de> serde::Deserialize<'de>>(&self, url: &Url) -> Result<T, GatewayError> {
        let body = self.send("GET", url, RequestBody::Empty)?;
        parse_json(&body)
    }

    fn home_region(&self) -> Result<HomeRegion, GatewayError> {
        if let Some(region) = self.home_region.get() {
            return Ok(region.clone());
        }
        let profile = self.fetch_profile()?;
        Ok(self.remember_region(profile.state, profile.district))
    }

    fn remember_region(&self, state: String, district: String) -> HomeRegion {
        self.home_region
            .get_or_init(|| HomeRegion { state, district })
            .clone()
    }
}

fn read_body(response: ureq::Response) -> Result<Vec<u8>, GatewayError> {
    http_client::read_response_bytes(response, MAX_RESPONSE_BYTES)
        .map_err(|err| GatewayError::Network(err.to_string()))
}

/// Encode a single-file `multipart/form-data` body under the `file` field.
fn multipart_body(boundary: &str, file: &ImportFile) -> Vec<u8> {
    let file_name = file.file_name.replace('"', "");
    let mut body = Vec::with_capacity(file.bytes.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(&file.bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

impl HealthBackend for HttpGateway {
    fn fetch_summary(
        &self,
        feed: FeedId,
        filter_by_location: bool,
    ) -> Result<Vec<Record>, GatewayError> {
        let mut url = self.endpoint("api/health/location-data")?;
        url.query_pairs_mut()
            .append_pair("filter_location", if filter_by_location { "true" } else { "false" });
        let data: LocationDataWire = self.get(&url)?;
        if let (Some(state), Some(district)) = (data.state.clone(), data.district.clone()) {
            self.remember_region(state, district);
        }
        let mut items = data.into_feed(feed);
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
        let region = if filter_by_location {
            Some(self.home_region()?)
        } else {
            None
        };
        let mut url = self.endpoint(&format!("api/health/{}", feed.collection()))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("page", &page.to_string())
                .append_pair("limit", &page_size.to_string());
            if let Some(region) = region.as_ref() {
                query
                    .append_pair("state", &region.state)
                    .append_pair("district", &region.district);
            }
        }
        let wire: PageWire = self.get(&url)?;
        Ok(Page::from(wire))
    }

    fn fetch_alerts(&self) -> Result<Vec<Alert>, GatewayError> {
        let url = self.endpoint("api/health/alerts")?;
        let wire: AlertsWire = self.get(&url)?;
        Ok(wire.alerts)
    }

    fn create_record(&self, feed: FeedId, fields: &RecordFields) -> Result<Record, GatewayError> {
        let url = self.endpoint(&format!("api/admin/{}", feed.collection()))?;
        let body = self.send(
            "POST",
            &url,
            RequestBody::Json(serde_json::Value::Object(fields.clone())),
        )?;
        parse_json(&body)
    }

    fn update_record(
        &self,
        feed: FeedId,
        id: RecordId,
        fields: &RecordFields,
    ) -> Result<Record, GatewayError> {
        let url = self.endpoint(&format!("api/admin/{}/{id}", feed.collection()))?;
        let body = self.send(
            "PUT",
            &url,
            RequestBody::Json(serde_json::Value::Object(fields.clone())),
        )?;
        parse_json(&body)
    }

    fn delete_record(&self, feed: FeedId, id: RecordId) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("api/admin/{}/{id}", feed.collection()))?;
        self.send("DELETE", &url, RequestBody::Empty).map(|_| ())
    }

    fn bulk_import(&self, feed: FeedId, file: &ImportFile) -> Result<ImportSummary, GatewayError> {
        let url = self.endpoint(&format!("api/admin/{}/upload-csv", feed.collection()))?;
        let boundary = format!("healthwatch-{}", uuid::Uuid::new_v4().simple());
        let bytes = multipart_body(&boundary, file);
        let body = self.send(
            "POST",
            &url,
            RequestBody::Multipart {
                boundary,
                bytes: &bytes,
            },
        )?;
        let wire: ImportWire = parse_json(&body)?;
        Ok(wire.into_summary())
    }

    fn fetch_chat_history(&self) -> Result<Vec<TurnEntry>, GatewayError> {
        let url = self.endpoint("api/chat/history")?;
        let exchanges: Vec<ChatMessageWire> = self.get(&url)?;
        wire::history_turns(exchanges)
    }

    fn send_chat_message(&self, text: &str) -> Result<ChatReply, GatewayError> {
        let url = self.endpoint("api/chat/message")?;
        let mut payload = json!({ "message": text });
        if let Some(assistant_url) = self.assistant_url.as_deref() {
            payload["ollama_url"] = json!(assistant_url);
        }
        let body = self.send("POST", &url, RequestBody::Json(payload))?;
        let exchange: ChatMessageWire = parse_json(&body)?;
        exchange.reply()
    }

    fn fetch_profile(&self) -> Result<ViewerProfile, GatewayError> {
        let url = self.endpoint("api/users/me")?;
        let profile: ViewerProfile = self.get(&url)?;
        self.remember_region(profile.state.clone(), profile.district.clone());
        Ok(profile)
    }

    fn update_notifications(&self, enabled: bool) -> Result<ViewerProfile, GatewayError> {
        let url = self.endpoint("api/users/me")?;
        let body = self.send(
            "PUT",
            &url,
            RequestBody::Json(json!({ "notifications": enabled })),
        )?;
        parse_json(&body)
    }
}
