//! Pipeline orchestration for itemsync.
//!
//! This crate ties together source acquisition, row classification, the
//! existing item index, item page scraping, and the category writer into a
//! single run ([`pipeline::run_pipeline`]).

pub mod buckets;
pub mod pipeline;

pub use buckets::CategoryBuckets;
pub use pipeline::{
    ProgressReporter, Resolution, RunConfig, RunSummary, SilentProgress, run_pipeline,
};
