// THEORY:
// This file is the main entry point for the `regression_vision` library crate.
// The primary export is the `pipeline` module (`compare`, `DiffPipeline`,
// `ComparisonResult`) as the clean, high-level interface for the whole diff engine.
// The individual stages live in `core_modules` and stay usable on their own for
// hosts that only need one of them (e.g. region extraction on a ready-made mask).
//
// Hosts that keep state between comparisons use `session::Session`; hosts that
// must not block use `parallel_pipeline::ComparisonWorkerPool`.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod session;

pub use config::ComparisonConfig;
pub use core_modules::change_region::ChangeRegion;
pub use core_modules::frame::RgbFrame;
pub use core_modules::severity::Verdict;
pub use error::{DiffError, Result};
pub use pipeline::{ComparisonResult, DiffPipeline, compare};
