//! # Configuration Logic
//!
//! CLI argument parsing and validation using clap derive.

use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{KinphaseError, Result};

/// kinphase: pedigree-driven genotype phasing and imputation
#[derive(Parser, Debug, Clone)]
#[command(name = "kinphase")]
#[command(version = "0.1.0")]
#[command(about = "Pedigree-driven genotype phasing and imputation", long_about = None)]
pub struct Config {
    // ============ Data Parameters ============
    /// Input VCF file with GT FORMAT field (required)
    #[arg(long, value_name = "FILE")]
    pub vcf: PathBuf,

    /// Pedigree file with sample, maternal and paternal columns (required)
    #[arg(long, value_name = "FILE")]
    pub ped: PathBuf,

    /// Genetic map file with chrom, bp and cM columns
    #[arg(long, value_name = "FILE")]
    pub map: Option<PathBuf>,

    /// Output VCF file (required)
    #[arg(long, short, value_name = "FILE")]
    pub out: PathBuf,

    // ============ Family Parameters ============
    /// Families with fewer progenies than this are not treated as large
    #[arg(long = "lower-progs", default_value = "10")]
    pub lower_progs: usize,

    /// Restrict to a named subset of families (mat,pat pairs joined by '/')
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub families: Option<Vec<String>>,

    /// Skip the small-family and isolated-sample stages
    #[arg(long = "only-large-families", default_value = "false")]
    pub only_large_families: bool,

    // ============ General Parameters ============
    /// Restrict processing to named chromosomes
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub chroms: Option<Vec<String>>,

    /// Number of worker threads (default: all available cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Significance level for the segregation bias test
    #[arg(long, default_value = "0.01")]
    pub significance: f64,

    /// Keep variants whose segregation ratio fails the bias test
    #[arg(long = "skip-bias-filter", default_value = "false")]
    pub skip_bias_filter: bool,
}

impl Config {
    /// Parse command line arguments and validate
    pub fn parse_and_validate() -> Result<Self> {
        use clap::error::ErrorKind;

        let config = match Self::try_parse() {
            Ok(config) => config,
            Err(err)
                if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
            {
                let _ = err.print();
                std::process::exit(0);
            }
            Err(err) => return Err(KinphaseError::config(err.to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.vcf.exists() {
            return Err(KinphaseError::FileNotFound {
                path: self.vcf.clone(),
            });
        }

        if !self.ped.exists() {
            return Err(KinphaseError::FileNotFound {
                path: self.ped.clone(),
            });
        }

        if let Some(ref map_path) = self.map {
            if !map_path.exists() {
                return Err(KinphaseError::FileNotFound {
                    path: map_path.clone(),
                });
            }
        }

        if self.lower_progs == 0 {
            return Err(KinphaseError::config(
                "The 'lower-progs' parameter must be at least 1",
            ));
        }

        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(KinphaseError::config(
                "The 'significance' parameter must be in (0, 1)",
            ));
        }

        if self.out.is_dir() {
            return Err(KinphaseError::config(format!(
                "'out' parameter cannot be a directory: {:?}",
                self.out
            )));
        }

        Ok(())
    }

    /// Get the number of threads to use
    pub fn threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// The family subset as a lookup set, if one was requested.
    ///
    /// Families are named `MAT/PAT` on the command line.
    pub fn family_subset(&self) -> Option<HashSet<(String, String)>> {
        self.families.as_ref().map(|names| {
            names
                .iter()
                .filter_map(|name| {
                    name.split_once('/')
                        .map(|(m, p)| (m.to_string(), p.to_string()))
                })
                .collect()
        })
    }

    /// The chromosome subset as a lookup set, if one was requested.
    pub fn chrom_subset(&self) -> Option<HashSet<String>> {
        self.chroms
            .as_ref()
            .map(|names| names.iter().cloned().collect())
    }
}
