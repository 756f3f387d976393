//! # Genetic Map Interpolation
//!
//! Convert physical positions (base pairs) to genetic distances
//! (centiMorgans) with a piecewise-linear map per chromosome. An empty map
//! falls back to a constant rate of 1 cM per Mbp.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::{KinphaseError, Result};

/// Constant fallback rate: 1 Mbp = 1 cM
const DEFAULT_CM_PER_BP: f64 = 1e-6;

/// Genetic map of one chromosome: sorted `(bp, cM)` points
#[derive(Clone, Debug)]
pub struct ChromMap {
    chrom: String,
    points: Vec<(u32, f64)>,
}

impl ChromMap {
    /// Create from sorted points; positions must be strictly increasing.
    pub fn new(chrom: String, points: Vec<(u32, f64)>) -> Result<Self> {
        for w in points.windows(2) {
            if w[1].0 <= w[0].0 {
                return Err(KinphaseError::map(format!(
                    "non-monotone bp position {} on {}",
                    w[1].0, chrom
                )));
            }
        }
        Ok(Self { chrom, points })
    }

    /// Map with no points; `bp_to_cm` uses the default rate.
    pub fn default_rate(chrom: String) -> Self {
        Self {
            chrom,
            points: Vec::new(),
        }
    }

    /// Chromosome this map covers
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// Whether this map is the constant-rate fallback
    pub fn is_default(&self) -> bool {
        self.points.is_empty()
    }

    /// Interpolate the genetic position of a physical position.
    ///
    /// Between points the map is linear; before the first point it is
    /// anchored at (0 bp, 0 cM); past the last point the final segment's
    /// slope is extended.
    pub fn bp_to_cm(&self, bp: u32) -> f64 {
        if self.points.is_empty() {
            return bp as f64 * DEFAULT_CM_PER_BP;
        }

        let idx = self.points.partition_point(|&(p, _)| p <= bp);
        if idx == 0 {
            let (p0, c0) = self.points[0];
            if p0 == 0 {
                return c0;
            }
            return c0 * bp as f64 / p0 as f64;
        }
        if idx == self.points.len() {
            let (p1, c1) = self.points[idx - 1];
            let slope = if self.points.len() >= 2 {
                let (p0, c0) = self.points[idx - 2];
                (c1 - c0) / (p1 - p0) as f64
            } else {
                DEFAULT_CM_PER_BP
            };
            return c1 + (bp - p1) as f64 * slope;
        }

        let (p0, c0) = self.points[idx - 1];
        let (p1, c1) = self.points[idx];
        c0 + (c1 - c0) * (bp - p0) as f64 / (p1 - p0) as f64
    }

    /// Genetic length covered by the map points
    pub fn total_cm(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(&(_, first)), Some(&(_, last))) => last - first,
            _ => 0.0,
        }
    }
}

/// Genetic map for a whole genome: one [`ChromMap`] per chromosome
#[derive(Clone, Debug, Default)]
pub struct GeneticMap {
    chroms: Vec<Arc<ChromMap>>,
    by_name: HashMap<String, usize>,
}

impl GeneticMap {
    /// Empty map: every chromosome uses the default rate.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read a map file with `chrom  bp  cM` rows. `None` yields the empty
    /// map. Rows of one chromosome must be contiguous and ascending in bp.
    pub fn read(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => return Ok(Self::empty()),
        };

        let reader = BufReader::new(File::open(path)?);
        let mut chroms: Vec<(String, Vec<(u32, f64)>)> = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let (chrom, bp, cm) = match (fields.next(), fields.next(), fields.next()) {
                (Some(chrom), Some(bp), Some(cm)) => (chrom, bp, cm),
                _ => {
                    return Err(KinphaseError::parse(
                        line_num + 1,
                        "expected chrom, bp and cM columns",
                    ))
                }
            };
            let bp: u32 = bp
                .parse()
                .map_err(|_| KinphaseError::parse(line_num + 1, "invalid bp position"))?;
            let cm: f64 = cm
                .parse()
                .map_err(|_| KinphaseError::parse(line_num + 1, "invalid cM position"))?;

            match chroms.last_mut() {
                Some((name, points)) if name == chrom => points.push((bp, cm)),
                _ => {
                    if chroms.iter().any(|(name, _)| name == chrom) {
                        return Err(KinphaseError::map(format!(
                            "chromosome {} appears in non-contiguous blocks",
                            chrom
                        )));
                    }
                    chroms.push((chrom.to_string(), vec![(bp, cm)]));
                }
            }
        }

        let mut map = Self::default();
        for (chrom, points) in chroms {
            let idx = map.chroms.len();
            map.by_name.insert(chrom.clone(), idx);
            map.chroms.push(Arc::new(ChromMap::new(chrom, points)?));
        }
        Ok(map)
    }

    /// Whether no map file was loaded
    pub fn is_empty(&self) -> bool {
        self.chroms.is_empty()
    }

    /// The map slice for one chromosome. Falls back to the constant-rate
    /// map when the chromosome is absent.
    pub fn chrom_map(&self, chrom: &str) -> Arc<ChromMap> {
        match self.by_name.get(chrom) {
            Some(&idx) => Arc::clone(&self.chroms[idx]),
            None => Arc::new(ChromMap::default_rate(chrom.to_string())),
        }
    }

    /// All per-chromosome slices in file order
    pub fn chrom_maps(&self) -> &[Arc<ChromMap>] {
        &self.chroms
    }

    /// Genetic length summed over chromosomes
    pub fn total_cm(&self) -> f64 {
        self.chroms.iter().map(|m| m.total_cm()).sum()
    }

    /// Log what map is in effect, once at startup.
    pub fn log_info(&self) {
        if self.is_empty() {
            info!("genetic map: default (1 Mbp = 1 cM)");
        } else {
            info!(
                "genetic map loaded: {} chromosomes, {:.1} cM",
                self.chroms.len(),
                self.total_cm()
            );
        }
    }
}
