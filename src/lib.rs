//! Core pipeline for the stratus balloon tracker: hourly snapshot
//! ingestion, shape-tolerant record normalization, track assembly, drift
//! geometry and per-balloon weather enrichment. The binary in `main.rs`
//! is a thin terminal consumer of this library.

pub mod api;
pub mod app;
pub mod config;
pub mod events;
pub mod geo;
pub mod history;
pub mod logging;
pub mod models;
pub mod ui;
pub mod weather;
