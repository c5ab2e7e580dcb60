use super::*;
use crate::gateway::InMemoryBackend;
use crate::gateway::memory::fields;
use crate::jobs::ManualSpawner;

pub(super) const HOME_STATE: &str = "Kerala";
pub(super) const HOME_DISTRICT: &str = "Ernakulam";

pub(super) fn home_profile() -> ViewerProfile {
    ViewerProfile {
        username: "asha".to_string(),
        full_name: "Asha Menon".to_string(),
        state: HOME_STATE.to_string(),
        district: HOME_DISTRICT.to_string(),
        notifications: false,
    }
}

pub(super) fn backend() -> Arc<InMemoryBackend> {
    Arc::new(InMemoryBackend::new(home_profile()))
}

/// Add `count` records in the viewer's home district.
pub(super) fn seed_local(backend: &InMemoryBackend, feed: FeedId, count: usize) {
    for _ in 0..count {
        backend.insert_record(
            feed,
            fields(&[("state", HOME_STATE), ("district", HOME_DISTRICT)]),
        );
    }
}

/// Add `count` records outside the viewer's region.
pub(super) fn seed_elsewhere(backend: &InMemoryBackend, feed: FeedId, count: usize) {
    for _ in 0..count {
        backend.insert_record(feed, fields(&[("state", "Goa"), ("district", "North Goa")]));
    }
}

pub(super) fn controller(
    backend: &Arc<InMemoryBackend>,
) -> (DashboardController, Arc<ManualSpawner>) {
    let spawner = ManualSpawner::new();
    let controller = DashboardController::new(
        backend.clone(),
        spawner.clone(),
        DashboardSettings::default(),
    );
    (controller, spawner)
}

/// Mounted controller with every initial fetch applied.
pub(super) fn mounted(backend: &Arc<InMemoryBackend>) -> (DashboardController, Arc<ManualSpawner>) {
    let (mut controller, spawner) = controller(backend);
    controller.mount();
    settle(&mut controller, &spawner);
    (controller, spawner)
}

/// Run jobs and apply their results until nothing is left to do.
pub(super) fn settle(controller: &mut DashboardController, spawner: &ManualSpawner) {
    loop {
        let ran = spawner.run_all();
        let handled = controller.poll_background_jobs();
        if ran == 0 && handled == 0 {
            break;
        }
    }
}

/// Run one job (oldest first) and apply whatever completed.
pub(super) fn step(controller: &mut DashboardController, spawner: &ManualSpawner) {
    spawner.run_next();
    controller.poll_background_jobs();
}

pub(super) fn ids(records: &[Record]) -> Vec<u64> {
    records.iter().map(|record| record.id.0).collect()
}
