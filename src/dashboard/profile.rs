use super::jobs::Loaded;
use super::*;

impl DashboardController {
    pub(super) fn fetch_profile(&mut self) -> FetchTicket {
        if let Some(token) = self.profile_request {
            return FetchTicket::Coalesced(token);
        }
        let token = self.begin_request();
        self.profile_request = Some(token);
        let backend = Arc::clone(&self.backend);
        self.jobs.begin(move || {
            JobMessage::ProfileLoaded(Loaded {
                token,
                result: backend.fetch_profile(),
            })
        });
        FetchTicket::Issued(token)
    }

    /// Flip the viewer's notification preference.
    ///
    /// Ignored until the profile is loaded and while a previous toggle is
    /// outstanding.
    pub fn toggle_notifications(&mut self) -> Option<RequestToken> {
        if self.notification_toggle.is_some() {
            return None;
        }
        let enabled = !self.profile.as_ref()?.notifications;
        let token = self.begin_request();
        self.notification_toggle = Some(token);
        let backend = Arc::clone(&self.backend);
        self.jobs.begin(move || {
            JobMessage::NotificationsUpdated(Loaded {
                token,
                result: backend.update_notifications(enabled),
            })
        });
        Some(token)
    }

    pub(super) fn apply_profile(&mut self, message: Loaded<ViewerProfile>) {
        let Loaded { token, result } = message;
        self.profile_request = None;
        let resolution = match result {
            Ok(profile) => {
                tracing::info!(
                    "Signed in as {} ({}, {})",
                    profile.username,
                    profile.district,
                    profile.state
                );
                self.profile = Some(profile);
                Resolution::Applied
            }
            Err(err) => {
                self.notify_failure("Failed to load profile", &err);
                Resolution::Failed(err)
            }
        };
        self.settle(token, resolution);
    }

    pub(super) fn apply_notification_toggle(&mut self, message: Loaded<ViewerProfile>) {
        let Loaded { token, result } = message;
        self.notification_toggle = None;
        let resolution = match result {
            Ok(profile) => {
                let text = if profile.notifications {
                    "Notifications enabled"
                } else {
                    "Notifications disabled"
                };
                self.profile = Some(profile);
                self.notify(Tone::Info, text);
                Resolution::Applied
            }
            Err(err) => {
                self.notify_failure("Failed to update notification settings", &err);
                Resolution::Failed(err)
            }
        };
        self.settle(token, resolution);
    }
}
