// Great-circle geometry
pub mod geo;

// Position update model and validation
pub mod update;

// Dual-tier location storage (hot TTL cache + durable history)
pub mod store;

// Order-topic subscriptions and fan-out
pub mod subscription;

// Travel-time estimation with fallback
pub mod eta;

// Proximity search over the hot store
pub mod nearby;

// Update orchestration
pub mod coordinator;

// HTTP and WebSocket APIs
pub mod api;

// Configuration
pub mod config;
