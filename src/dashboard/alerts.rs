use super::jobs::Loaded;
use super::*;
use crate::model::Alert;

impl DashboardController {
    /// Fetch the active alerts. At most one alert fetch is outstanding.
    pub fn fetch_alerts(&mut self) -> FetchTicket {
        if let Some(token) = self.alert_request {
            return FetchTicket::Coalesced(token);
        }
        let token = self.begin_request();
        self.alert_request = Some(token);
        self.last_alert_fetch = Some(Instant::now());
        let backend = Arc::clone(&self.backend);
        self.jobs.begin(move || {
            JobMessage::AlertsLoaded(Loaded {
                token,
                result: backend.fetch_alerts(),
            })
        });
        FetchTicket::Issued(token)
    }

    /// Hide the alert banner. The alerts themselves are kept.
    pub fn dismiss_alerts(&mut self) {
        self.alerts.dismiss();
    }

    pub(super) fn apply_alerts(&mut self, message: Loaded<Vec<Alert>>) {
        let Loaded { token, result } = message;
        if self.alert_request != Some(token) {
            self.settle(token, Resolution::Discarded(StaleReason::Superseded));
            return;
        }
        self.alert_request = None;
        let resolution = match result {
            Ok(alerts) => {
                tracing::debug!("Received {} alerts", alerts.len());
                self.alerts.replace(alerts);
                Resolution::Applied
            }
            Err(err) => {
                self.notify_failure("Failed to load alerts", &err);
                Resolution::Failed(err)
            }
        };
        self.settle(token, resolution);
    }
}
