//! Services module for fleet-service.

pub mod files;
pub mod memory;
pub mod metrics;
pub mod password;
pub mod postgres;
pub mod store;

pub use files::{FileStorage, LocalFileStorage};
pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use postgres::PgStore;
pub use store::Store;
