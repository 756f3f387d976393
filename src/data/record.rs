//! # Variant Record Definitions
//!
//! A variant record is one row of the genotype table. All fixed columns are
//! kept as the strings they were read as, so an untouched record serializes
//! back to its original bytes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{KinphaseError, Result};

/// Integer genotype of a missing or uncallable diploid call
pub const MISSING_GT: i32 = -1;

/// Ordered sample list shared by every record of one VCF
#[derive(Clone, Debug, Default)]
pub struct Samples {
    ids: Vec<Arc<str>>,
    index: HashMap<Arc<str>, usize>,
}

impl Samples {
    /// Create from an ordered list of sample IDs
    pub fn from_ids(ids: Vec<String>) -> Self {
        let ids: Vec<Arc<str>> = ids.into_iter().map(Arc::from).collect();
        let index = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (Arc::clone(id), i))
            .collect();
        Self { ids, index }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Sample IDs in column order
    pub fn ids(&self) -> &[Arc<str>] {
        &self.ids
    }

    /// Column index of a sample, if present
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Whether the sample appears in this VCF
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }
}

/// A single row of the genotype table.
///
/// Immutable after construction except for the genotype cells, which the
/// chromosome driver overwrites once the engine has phased them.
#[derive(Clone, Debug)]
pub struct VariantRecord {
    chrom: Arc<str>,
    pos: u32,
    id: String,
    ref_allele: String,
    alt_alleles: String,
    qual: String,
    filter: String,
    info: String,
    format: String,
    genotypes: Vec<String>,
}

impl VariantRecord {
    /// Parse one data line of a VCF. `n_samples` is the column count
    /// promised by the header line.
    pub fn parse(line: &str, n_samples: usize, line_num: usize) -> Result<Self> {
        let mut fields = line.split('\t');

        let chrom = fields
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| KinphaseError::parse(line_num, "Missing CHROM field"))?;

        let pos: u32 = fields
            .next()
            .and_then(|s| s.parse().ok())
            .filter(|&p| p > 0)
            .ok_or_else(|| KinphaseError::parse(line_num, "Invalid POS field"))?;

        let mut fixed = || {
            fields
                .next()
                .map(str::to_string)
                .ok_or_else(|| KinphaseError::parse(line_num, "Truncated record"))
        };
        let id = fixed()?;
        let ref_allele = fixed()?;
        let alt_alleles = fixed()?;
        let qual = fixed()?;
        let filter = fixed()?;
        let info = fixed()?;
        let format = fixed()?;

        let genotypes: Vec<String> = fields.map(str::to_string).collect();
        if genotypes.len() != n_samples {
            return Err(KinphaseError::parse(
                line_num,
                format!(
                    "Expected {} genotype columns, got {}",
                    n_samples,
                    genotypes.len()
                ),
            ));
        }

        Ok(Self {
            chrom: chrom.into(),
            pos,
            id,
            ref_allele,
            alt_alleles,
            qual,
            filter,
            info,
            format,
            genotypes,
        })
    }

    /// Chromosome identifier
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// Shared chromosome identifier
    pub fn chrom_arc(&self) -> Arc<str> {
        Arc::clone(&self.chrom)
    }

    /// 1-based genomic position
    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// Raw genotype cell of sample column `i`
    pub fn gt_cell(&self, i: usize) -> &str {
        &self.genotypes[i]
    }

    /// All genotype cells in column order
    pub fn gt_cells(&self) -> &[String] {
        &self.genotypes
    }

    /// Integer genotype (allele dosage sum) of sample column `i`
    pub fn int_gt(&self, i: usize) -> i32 {
        parse_int_gt(&self.genotypes[i])
    }

    /// Replace the GT subfield of sample column `i`, keeping any trailing
    /// FORMAT subfields.
    pub fn set_gt(&mut self, i: usize, gt: &str) {
        let cell = &mut self.genotypes[i];
        match cell.find(':') {
            Some(colon) => *cell = format!("{}{}", gt, &cell[colon..]),
            None => *cell = gt.to_string(),
        }
    }

    /// Serialize back to a tab-separated VCF line (no trailing newline)
    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(64 + self.genotypes.len() * 8);
        line.push_str(&self.chrom);
        for field in [
            &self.pos.to_string(),
            &self.id,
            &self.ref_allele,
            &self.alt_alleles,
            &self.qual,
            &self.filter,
            &self.info,
            &self.format,
        ] {
            line.push('\t');
            line.push_str(field);
        }
        for cell in &self.genotypes {
            line.push('\t');
            line.push_str(cell);
        }
        line
    }
}

/// Integer genotype of one genotype cell: the sum of the two allele
/// dosages, or [`MISSING_GT`] when either allele is missing or malformed.
///
/// Accepts both phased (`|`) and unphased (`/`) separators and ignores any
/// FORMAT subfields after the first `:`.
pub fn parse_int_gt(cell: &str) -> i32 {
    let gt = match cell.find(':') {
        Some(colon) => &cell[..colon],
        None => cell,
    };
    let (a, b) = match gt.split_once(['|', '/']) {
        Some(pair) => pair,
        None => return MISSING_GT,
    };
    match (a.parse::<i32>(), b.parse::<i32>()) {
        (Ok(a), Ok(b)) if a >= 0 && b >= 0 => a + b,
        _ => MISSING_GT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cells: &[&str]) -> VariantRecord {
        let line = format!(
            "chr1\t100\t.\tA\tT\t.\tPASS\t.\tGT\t{}",
            cells.join("\t")
        );
        VariantRecord::parse(&line, cells.len(), 1).unwrap()
    }

    #[test]
    fn test_parse_int_gt() {
        assert_eq!(parse_int_gt("0/0"), 0);
        assert_eq!(parse_int_gt("0|1"), 1);
        assert_eq!(parse_int_gt("1|1:20:3"), 2);
        assert_eq!(parse_int_gt("./."), MISSING_GT);
        assert_eq!(parse_int_gt(".|1"), MISSING_GT);
        assert_eq!(parse_int_gt("."), MISSING_GT);
        assert_eq!(parse_int_gt(""), MISSING_GT);
    }

    #[test]
    fn test_record_accessors() {
        let rec = record(&["0/1", "1|1", "./."]);
        assert_eq!(rec.chrom(), "chr1");
        assert_eq!(rec.pos(), 100);
        assert_eq!(rec.int_gt(0), 1);
        assert_eq!(rec.int_gt(1), 2);
        assert_eq!(rec.int_gt(2), MISSING_GT);
    }

    #[test]
    fn test_set_gt_keeps_subfields() {
        let mut rec = record(&["0/1:35:7"]);
        rec.set_gt(0, "0|1");
        assert_eq!(rec.gt_cell(0), "0|1:35:7");
        rec.set_gt(0, "1|0");
        assert_eq!(rec.gt_cell(0), "1|0:35:7");
    }

    #[test]
    fn test_line_round_trip() {
        let line = "chr2\t1234\trs42\tG\tC,T\t99.1\tPASS\tAC=3\tGT:DP\t0/1:12\t./.:0";
        let rec = VariantRecord::parse(line, 2, 1).unwrap();
        assert_eq!(rec.to_line(), line);
    }

    #[test]
    fn test_parse_rejects_bad_pos() {
        let line = "chr1\t0\t.\tA\tT\t.\t.\t.\tGT\t0/0";
        assert!(VariantRecord::parse(line, 1, 3).is_err());
    }

    #[test]
    fn test_samples_lookup() {
        let samples = Samples::from_ids(vec!["mat".into(), "pat".into(), "p1".into()]);
        assert_eq!(samples.position("pat"), Some(1));
        assert_eq!(samples.position("nope"), None);
        assert!(samples.contains("p1"));
    }
}
