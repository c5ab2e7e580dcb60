//! Consumed backing-store interfaces, their HTTP implementation and an
//! in-memory store.

mod backend;
mod wire;

pub mod api;
pub mod memory;

pub use api::HttpGateway;
pub use backend::{GatewayError, HealthBackend};
pub use memory::{InMemoryBackend, Operation};
