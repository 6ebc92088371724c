//! Core engine: the fetch → stats → rank → allocate run.

pub mod pipeline;

pub use pipeline::{Pipeline, PipelineConfig};
