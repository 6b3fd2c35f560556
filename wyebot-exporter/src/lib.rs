//! Prometheus exporter for the Wyebot sensor fleet.
//!
//! A single collection task walks every location and sensor of the
//! organization on a fixed interval, flattens each resource into labelled
//! rows and upserts them into a shared registry. The HTTP server renders
//! that registry on every scrape.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Wyebot API    │────>│  Cycle runner   │────>│    Registry     │
//! │ (external_api)  │     │   (flatten)     │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! wyebot-exporter --config config.json5
//! ```
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod config;
pub mod cycle;
pub mod families;
pub mod flatten;
pub mod http;
pub mod registry;
pub mod scheduler;

pub use config::ExporterConfig;
pub use cycle::{CycleError, CycleOutcome, CycleRunner, CycleSummary};
pub use http::HttpServer;
pub use registry::{MetricRegistry, Recorded, SharedRegistry};
pub use scheduler::Scheduler;
