//! # Pipelines Module
//!
//! High-level workflow orchestration.

pub mod imputation;

pub use imputation::ImputationPipeline;
