// LogSift - lib.rs
//
// Library entry point. The binary in `main.rs` is a thin CLI adapter over
// `app::query::Analyzer`; everything else is usable programmatically and
// from integration tests.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
