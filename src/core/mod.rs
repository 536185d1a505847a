// LogSift - core/mod.rs
//
// Core business logic layer.
// Dependencies: standard library plus data crates (chrono, regex, serde, csv).
// Must NOT depend on: platform or app.

pub mod anomaly;
pub mod discovery;
pub mod export;
pub mod filter;
pub mod model;
pub mod parser;
pub mod stats;
