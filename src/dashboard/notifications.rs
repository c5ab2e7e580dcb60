//! Transient operator notifications.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_NOTIFICATIONS: usize = 20;

/// Visual weight of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub tone: Tone,
    pub text: String,
    pub raised_at: Instant,
}

/// Rolling notification log; entries expire after a fixed time to live.
#[derive(Clone, Debug)]
pub struct Notifications {
    entries: VecDeque<Notification>,
    ttl: Duration,
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            ttl,
        }
    }

    pub fn push(&mut self, tone: Tone, text: impl Into<String>, now: Instant) {
        let text = text.into();
        match tone {
            Tone::Info => tracing::info!("{text}"),
            Tone::Warning | Tone::Error => tracing::warn!("{text}"),
        }
        self.entries.push_back(Notification {
            tone,
            text,
            raised_at: now,
        });
        while self.entries.len() > MAX_NOTIFICATIONS {
            self.entries.pop_front();
        }
    }

    /// Drop notifications older than the time to live.
    pub fn expire(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|entry| now.saturating_duration_since(entry.raised_at) < ttl);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire_after_ttl() {
        let start = Instant::now();
        let mut notifications = Notifications::new(Duration::from_secs(5));
        notifications.push(Tone::Error, "first", start);
        notifications.push(Tone::Info, "second", start + Duration::from_secs(3));
        notifications.expire(start + Duration::from_secs(6));
        let texts: Vec<_> = notifications.iter().map(|entry| entry.text.as_str()).collect();
        assert_eq!(texts, ["second"]);
    }

    #[test]
    fn log_is_bounded() {
        let now = Instant::now();
        let mut notifications = Notifications::new(Duration::from_secs(5));
        for idx in 0..30 {
            notifications.push(Tone::Info, format!("n{idx}"), now);
        }
        assert_eq!(notifications.len(), MAX_NOTIFICATIONS);
        assert_eq!(notifications.latest().unwrap().text, "n29");
    }
}
