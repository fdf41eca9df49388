pub mod config;
pub mod engine;
pub mod feed;
pub mod telemetry;
