//! # I/O Module
//!
//! File reading and writing.

pub mod vcf;

pub use vcf::{VcfReader, VcfWriter};
