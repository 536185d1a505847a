// LogSift - app/mod.rs
//
// Application layer: log store, query facade, boundary normalisation,
// snapshot persistence, chart artifacts.
// Dependencies: core, platform, util.

pub mod charts;
pub mod params;
pub mod query;
pub mod snapshot;
pub mod store;
