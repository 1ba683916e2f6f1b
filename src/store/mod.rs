// Dual-tier location storage: hot TTL cache + durable geospatial history

mod history;
mod hot;

pub use history::{HistoryEntry, LocationHistoryStore, RoutePoint};
pub use hot::{HotLocationRecord, HotLocationStore, WriteOutcome};
