pub mod connection;
pub mod factory;
pub mod latency;
pub mod migrations;
pub mod repositories;
pub mod slot;

pub use connection::{connect_with_settings, DbPool};
pub use factory::{open_store, OpenStoreError};
pub use latency::{SimulatedLatency, StoreOperation};
pub use repositories::CustomerStore;
