use std::sync::Arc;

use healthwatch::config::DashboardSettings;
use healthwatch::dashboard::DashboardController;
use healthwatch::gateway::InMemoryBackend;
use healthwatch::gateway::memory::fields;
use healthwatch::jobs::ManualSpawner;
use healthwatch::model::{FeedId, ViewerProfile};

pub const HOME_STATE: &str = "Kerala";
pub const HOME_DISTRICT: &str = "Ernakulam";

pub fn profile() -> ViewerProfile {
    ViewerProfile {
        username: "district_officer".to_string(),
        full_name: "District Officer".to_string(),
        state: HOME_STATE.to_string(),
        district: HOME_DISTRICT.to_string(),
        notifications: true,
    }
}

pub fn backend() -> Arc<InMemoryBackend> {
    Arc::new(InMemoryBackend::new(profile()))
}

pub fn seed(backend: &InMemoryBackend, feed: FeedId, local: usize, elsewhere: usize) {
    for _ in 0..local {
        backend.insert_record(
            feed,
            fields(&[("state", HOME_STATE), ("district", HOME_DISTRICT)]),
        );
    }
    for _ in 0..elsewhere {
        backend.insert_record(feed, fields(&[("state", "Goa"), ("district", "North Goa")]));
    }
}

pub struct DashboardHarness {
    pub backend: Arc<InMemoryBackend>,
    pub spawner: Arc<ManualSpawner>,
    pub controller: DashboardController,
}

impl DashboardHarness {
    pub fn new(backend: Arc<InMemoryBackend>, settings: DashboardSettings) -> Self {
        let spawner = ManualSpawner::new();
        let controller = DashboardController::new(backend.clone(), spawner.clone(), settings);
        Self {
            backend,
            spawner,
            controller,
        }
    }

    pub fn mounted(backend: Arc<InMemoryBackend>) -> Self {
        let mut harness = Self::new(backend, DashboardSettings::default());
        harness.controller.mount();
        harness.settle();
        harness
    }

    /// Run jobs and apply results until nothing is outstanding.
    pub fn settle(&mut self) {
        loop {
            let ran = self.spawner.run_all();
            let handled = self.controller.poll_background_jobs();
            if ran == 0 && handled == 0 {
                break;
            }
        }
    }

    pub fn ids(&self, feed: FeedId) -> Vec<u64> {
        self.controller
            .visible_items(feed)
            .iter()
            .map(|record| record.id.0)
            .collect()
    }
}
