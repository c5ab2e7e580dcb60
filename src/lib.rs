//! Library exports for the dashboard binary and integration tests.
/// Application directory resolution.
pub mod app_dirs;
/// Conversation sequencer for the assistant chat.
pub mod chat;
/// Persisted settings.
pub mod config;
/// Feed caches, pagination, location filter, admin mutations and alerts.
pub mod dashboard;
/// Backing-store interfaces and implementations.
pub mod gateway;
pub(crate) mod http_client;
/// Background job plumbing shared by the dashboard and chat.
pub mod jobs;
/// Tracing subscriber setup.
pub mod logging;
/// Shared data model.
pub mod model;
