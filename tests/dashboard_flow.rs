mod support;

use std::time::{Duration, Instant};

use healthwatch::config::{self, AppConfig};
use healthwatch::dashboard::{FetchTicket, Resolution, StaleReason, Tone, ViewMode};
use healthwatch::gateway::memory::fields;
use healthwatch::gateway::{GatewayError, Operation};
use healthwatch::model::{Alert, AlertKind, FeedId, ImportFile, RecordId, Severity};
use support::env::HealthwatchEnvGuard;
use support::fixtures::{DashboardHarness, HOME_DISTRICT, backend, seed};

#[test]
fn saved_settings_start_the_dashboard_filtered() {
    let temp = tempfile::tempdir().expect("create tempdir");
    let _env = HealthwatchEnvGuard::set_config_home(temp.path().to_path_buf());
    let mut cfg = AppConfig::default();
    cfg.dashboard.filter_by_location = true;
    cfg.dashboard.alert_refresh_secs = 5;
    config::save(&cfg).expect("save config");

    let loaded = config::load_or_default().expect("load config");
    assert!(loaded.dashboard.filter_by_location);
    assert_eq!(loaded.dashboard.alert_refresh_secs, 30);

    let backend = backend();
    seed(&backend, FeedId::Outbreak, 2, 7);
    let mut harness = DashboardHarness::new(backend, loaded.dashboard);
    harness.controller.mount();
    harness.settle();

    assert!(harness.controller.filter_enabled());
    assert_eq!(harness.ids(FeedId::Outbreak), [2, 1]);
    assert_eq!(
        harness.controller.feed_heading(FeedId::Vaccination),
        "Vaccination Campaigns in Ernakulam, Kerala"
    );

    harness
        .controller
        .tick(Instant::now() + Duration::from_secs(31));
    harness.settle();
    assert_eq!(harness.backend.calls(Operation::FetchAlerts), 2);
}

#[test]
fn operator_pages_through_feed_and_back() {
    let backend = backend();
    seed(&backend, FeedId::Outbreak, 23, 0);
    let mut harness = DashboardHarness::mounted(backend);

    harness.controller.set_mode(FeedId::Outbreak, ViewMode::Full);
    harness.settle();
    assert_eq!(harness.controller.page_range(FeedId::Outbreak), Some((1, 10, 23)));

    harness.controller.next_page(FeedId::Outbreak);
    harness.controller.next_page(FeedId::Outbreak);
    harness.settle();
    assert_eq!(harness.controller.page_range(FeedId::Outbreak), Some((21, 23, 23)));
    assert_eq!(harness.ids(FeedId::Outbreak), [3, 2, 1]);

    assert_eq!(
        harness.controller.next_page(FeedId::Outbreak),
        FetchTicket::Rejected
    );
    assert_eq!(
        harness.controller.set_page(FeedId::Outbreak, 4),
        FetchTicket::Rejected
    );
    assert_eq!(harness.controller.page_range(FeedId::Outbreak), Some((21, 23, 23)));

    harness.controller.set_mode(FeedId::Outbreak, ViewMode::Summary);
    assert_eq!(harness.ids(FeedId::Outbreak), [23, 22, 21, 20, 19]);
}

#[test]
fn region_toggle_rescopes_both_feeds_together() {
    let backend = backend();
    seed(&backend, FeedId::Outbreak, 4, 20);
    seed(&backend, FeedId::Vaccination, 3, 3);
    let mut harness = DashboardHarness::mounted(backend);
    harness.controller.set_mode(FeedId::Outbreak, ViewMode::Full);
    harness.settle();
    harness.controller.set_page(FeedId::Outbreak, 3);
    harness.settle();

    harness.controller.toggle_location_filter();
    for feed in FeedId::ALL {
        assert!(harness.controller.cache(feed).is_summary_stale());
        assert!(harness.controller.cache(feed).summary_items().is_empty());
    }
    harness.settle();

    for feed in FeedId::ALL {
        assert!(
            harness
                .controller
                .cache(feed)
                .summary_items()
                .iter()
                .all(|record| record.text("district") == Some(HOME_DISTRICT))
        );
    }
    assert_eq!(harness.controller.page_range(FeedId::Outbreak), Some((1, 4, 4)));
    assert_eq!(harness.controller.cache(FeedId::Vaccination).summary_items().len(), 3);

    harness.controller.toggle_location_filter();
    harness.settle();
    assert_eq!(harness.controller.page_range(FeedId::Outbreak), Some((1, 10, 24)));
}

#[test]
fn bulk_import_of_twelve_vaccinations() {
    let backend = backend();
    seed(&backend, FeedId::Vaccination, 6, 0);
    let mut harness = DashboardHarness::mounted(backend);
    harness.controller.set_mode(FeedId::Vaccination, ViewMode::Full);
    harness.settle();
    let before = harness
        .controller
        .cache(FeedId::Vaccination)
        .page_state()
        .expect("page loaded")
        .total_items;

    let mut csv = String::from("id,vaccine_name,state,district,status\n");
    for id in 1..=3 {
        csv.push_str(&format!("{id},Polio,Kerala,Ernakulam,completed\n"));
    }
    for _ in 0..9 {
        csv.push_str(",Measles,Kerala,Ernakulam,planned\n");
    }
    let token = harness
        .controller
        .bulk_import(FeedId::Vaccination, ImportFile::new("vaccinations.csv", csv))
        .expect("import accepted");
    harness.settle();

    assert_eq!(harness.controller.resolution(token), Some(&Resolution::Applied));
    let after = harness
        .controller
        .cache(FeedId::Vaccination)
        .page_state()
        .expect("page loaded")
        .total_items;
    assert_eq!(after, before + 9);
    assert!(after - before <= 12);
    assert_eq!(harness.controller.visible_items(FeedId::Vaccination).len(), 10);
    let latest = harness.controller.notifications().latest().expect("notice");
    assert_eq!(latest.text, "Imported 12 vaccinations");
}

#[test]
fn delete_then_server_count_wins() {
    let backend = backend();
    seed(&backend, FeedId::Outbreak, 11, 0);
    let mut harness = DashboardHarness::mounted(backend);
    harness.controller.set_mode(FeedId::Outbreak, ViewMode::Full);
    harness.settle();

    // Another operator removed two records since the page was fetched.
    harness.backend.truncate_newest(FeedId::Outbreak, 2);
    harness.controller.delete(FeedId::Outbreak, RecordId(7));
    harness.spawner.run_next();
    harness.controller.poll_background_jobs();
    assert!(!harness.ids(FeedId::Outbreak).contains(&7));
    assert_eq!(
        harness
            .controller
            .cache(FeedId::Outbreak)
            .page_state()
            .map(|state| state.total_items),
        Some(11)
    );

    harness.settle();
    let state = harness
        .controller
        .cache(FeedId::Outbreak)
        .page_state()
        .expect("page loaded");
    assert_eq!((state.total_items, state.total_pages), (8, 1));
    assert_eq!(harness.ids(FeedId::Outbreak), [9, 8, 6, 5, 4, 3, 2, 1]);
}

#[test]
fn stale_ids_surface_as_not_found() {
    let backend = backend();
    seed(&backend, FeedId::Outbreak, 3, 0);
    let mut harness = DashboardHarness::mounted(backend);
    harness.controller.set_mode(FeedId::Outbreak, ViewMode::Full);
    harness.settle();
    harness.backend.truncate_newest(FeedId::Outbreak, 1);

    let token = harness
        .controller
        .update(FeedId::Outbreak, RecordId(3), fields(&[("severity", "low")]))
        .expect("update accepted");
    harness.settle();

    assert!(matches!(
        harness.controller.resolution(token),
        Some(Resolution::Failed(GatewayError::NotFound(_)))
    ));
    assert_eq!(harness.ids(FeedId::Outbreak), [3, 2, 1]);
    let latest = harness.controller.notifications().latest().expect("notice");
    assert_eq!(latest.tone, Tone::Error);
}

#[test]
fn late_page_from_superseded_request_is_dropped() {
    let backend = backend();
    seed(&backend, FeedId::Vaccination, 30, 0);
    let mut harness = DashboardHarness::mounted(backend);
    harness.controller.set_mode(FeedId::Vaccination, ViewMode::Full);
    harness.settle();

    let slow = harness
        .controller
        .set_page(FeedId::Vaccination, 2)
        .token()
        .expect("issued");
    harness.controller.set_page(FeedId::Vaccination, 3);
    harness.spawner.run_latest();
    harness.controller.poll_background_jobs();
    harness.settle();

    assert_eq!(
        harness.controller.resolution(slow),
        Some(&Resolution::Discarded(StaleReason::Superseded))
    );
    assert_eq!(harness.controller.page_range(FeedId::Vaccination), Some((21, 30, 30)));
}

#[test]
fn alert_banner_follows_fetch_and_dismissal() {
    let backend = backend();
    backend.set_alerts(vec![Alert {
        kind: AlertKind::Vaccination,
        severity: Severity::Info,
        title: "Upcoming Vaccination Drive".to_string(),
        message: "Measles vaccination drive in Ernakulam, Kerala.".to_string(),
    }]);
    let mut harness = DashboardHarness::mounted(backend);
    assert!(harness.controller.alerts().visible());

    harness.controller.dismiss_alerts();
    harness
        .controller
        .tick(Instant::now() + Duration::from_secs(300));
    harness.settle();
    assert!(harness.controller.alerts().visible());
    assert_eq!(harness.backend.calls(Operation::FetchAlerts), 2);

    harness.controller.dismiss_alerts();
    harness.backend.set_alerts(Vec::new());
    harness.controller.fetch_alerts();
    harness.settle();
    assert!(!harness.controller.alerts().visible());
}
