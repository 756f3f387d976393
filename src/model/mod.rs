//! # Model Module
//!
//! The statistical core of the imputation engine.
//!
//! ## Sub-modules
//! - `segregation`: Mendelian segregation classification
//! - `bias`: segregation bias probability table
//! - `distance`: inherited-allele distance with strand inversion
//! - `mst`: deterministic Kruskal minimum spanning tree
//! - `haplotype`: haplotype reconstruction over the MST

pub mod bias;
pub mod distance;
pub mod haplotype;
pub mod mst;
pub mod segregation;
