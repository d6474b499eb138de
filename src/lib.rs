pub mod config;
pub mod forwarder;
pub mod handlers;
pub mod ingest;
pub mod model;
pub mod scheduler;
pub mod store;
