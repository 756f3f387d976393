//! # Kinphase Library
//!
//! Pedigree-driven genotype phasing and imputation.
//!
//! For each nuclear family in which one parent is heterozygous at a
//! variant and the other homozygous, the engine reconstructs the
//! haplotype each progeny inherited from the heterozygous parent,
//! respecting recombination frequencies from the genetic map, and writes
//! the table back with genotypes phased and missing calls filled.
//!
//! ## Modules
//! - `config`: CLI argument parsing and validation
//! - `data`: variant records, family views, pedigree, genetic map
//! - `error`: error types and result alias
//! - `io`: VCF reading/writing
//! - `model`: segregation classification, bias test, MST, reconstruction
//! - `pipelines`: per-chromosome driver

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod pipelines;

// Re-export commonly used types
pub use config::Config;
pub use data::family::{FamilyRecord, FamilySamples, FamilyVcf};
pub use data::genetic_map::{ChromMap, GeneticMap};
pub use data::pedigree::{Family, Pedigree};
pub use data::record::{Samples, VariantRecord};
pub use error::{KinphaseError, Result};
pub use io::{VcfReader, VcfWriter};
pub use model::bias::BiasTable;
pub use model::segregation::SegregationType;
pub use pipelines::ImputationPipeline;
