//! # botwatch
//!
//! Detects AI crawlers visiting registered websites, records each visit and
//! serves analytics over the recorded traffic.

pub mod analytics;
pub mod classifier;
pub mod cli;
pub mod client_ip;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ingestion;
pub mod models;
pub mod pixel;
pub mod repositories;
pub mod server;
pub mod signatures;
pub mod snippet;
pub mod telemetry;
pub mod trap;
pub use migration;
