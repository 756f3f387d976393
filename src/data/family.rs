//! # Family Views
//!
//! A family view re-presents one variant record against a nuclear family's
//! sample order: maternal sample first, paternal second, progenies after.
//! Views own their genotype copies; writing to a view never touches the
//! source record.

use std::sync::Arc;

use crate::data::genetic_map::{ChromMap, GeneticMap};
use crate::data::pedigree::Family;
use crate::data::record::{parse_int_gt, Samples, VariantRecord};
use crate::error::{KinphaseError, Result};

/// A family's samples resolved against the VCF column order.
///
/// `columns[0]` is the maternal column, `columns[1]` the paternal column,
/// the rest are progeny columns.
#[derive(Clone, Debug)]
pub struct FamilySamples {
    pub mat: String,
    pub pat: String,
    pub progenies: Vec<String>,
    columns: Vec<usize>,
}

impl FamilySamples {
    /// Resolve a pedigree family against the VCF sample list. Progenies
    /// absent from the VCF are skipped; returns `None` unless both parents
    /// and at least one progeny are present.
    pub fn resolve(family: &Family, samples: &Samples) -> Option<Arc<Self>> {
        let mat_col = samples.position(&family.mat)?;
        let pat_col = samples.position(&family.pat)?;

        let mut progenies = Vec::new();
        let mut columns = vec![mat_col, pat_col];
        for progeny in &family.progenies {
            if let Some(col) = samples.position(progeny) {
                progenies.push(progeny.clone());
                columns.push(col);
            }
        }
        if progenies.is_empty() {
            return None;
        }

        Some(Arc::new(Self {
            mat: family.mat.clone(),
            pat: family.pat.clone(),
            progenies,
            columns,
        }))
    }

    /// Family size including both parents
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn num_progenies(&self) -> usize {
        self.columns.len() - 2
    }

    /// VCF column of family slot `i` (0 = mat, 1 = pat, 2.. = progenies)
    pub fn column(&self, i: usize) -> usize {
        self.columns[i]
    }

    /// All VCF columns in family order
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }
}

/// One variant record projected onto a family.
///
/// Keeps the (chrom, pos) identity of the source record and its index in
/// the per-chromosome record vector, so phased genotypes can be written
/// back in order.
#[derive(Clone, Debug)]
pub struct FamilyRecord {
    index: usize,
    chrom: Arc<str>,
    pos: u32,
    gts: Vec<String>,
}

impl FamilyRecord {
    /// Project a record onto a family. `index` is the record's position in
    /// its chromosome's record vector.
    pub fn project(record: &VariantRecord, index: usize, samples: &FamilySamples) -> Self {
        let gts = samples
            .columns()
            .iter()
            .map(|&col| record.gt_cell(col).to_string())
            .collect();
        Self {
            index,
            chrom: record.chrom_arc(),
            pos: record.pos(),
            gts,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// Integer genotype of family slot `i`
    pub fn int_gt(&self, i: usize) -> i32 {
        parse_int_gt(&self.gts[i])
    }

    pub fn mat_int_gt(&self) -> i32 {
        self.int_gt(0)
    }

    pub fn pat_int_gt(&self) -> i32 {
        self.int_gt(1)
    }

    pub fn num_progenies(&self) -> usize {
        self.gts.len() - 2
    }

    /// Integer genotypes of the progenies, in family order
    pub fn progeny_int_gts(&self) -> Vec<i32> {
        (2..self.gts.len()).map(|i| self.int_gt(i)).collect()
    }

    /// Raw genotype cell of family slot `i`
    pub fn gt(&self, i: usize) -> &str {
        &self.gts[i]
    }

    /// Overwrite the GT subfields of this view from a phased GT row.
    pub fn set_gts(&mut self, gts: &[String]) {
        for (cell, gt) in self.gts.iter_mut().zip(gts) {
            match cell.find(':') {
                Some(colon) => *cell = format!("{}{}", gt, &cell[colon..]),
                None => *cell = gt.clone(),
            }
        }
    }
}

/// An ordered sequence of family views for one (family, hetero-role)
/// bucket, together with the genetic map.
#[derive(Clone, Debug)]
pub struct FamilyVcf {
    pub samples: Arc<FamilySamples>,
    /// True when the maternal parent is the heterozygous one
    pub mat_hetero: bool,
    pub records: Vec<FamilyRecord>,
    pub genetic_map: Arc<GeneticMap>,
}

impl FamilyVcf {
    pub fn new(
        samples: Arc<FamilySamples>,
        mat_hetero: bool,
        records: Vec<FamilyRecord>,
        genetic_map: Arc<GeneticMap>,
    ) -> Self {
        Self {
            samples,
            mat_hetero,
            records,
            genetic_map,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Genetic position of record `i`
    pub fn cm_at(&self, i: usize) -> f64 {
        let record = &self.records[i];
        self.genetic_map
            .chrom_map(record.chrom())
            .bp_to_cm(record.pos())
    }

    /// Map slice for this bucket's chromosome (first record's chromosome)
    pub fn chrom_map(&self) -> Option<Arc<ChromMap>> {
        self.records
            .first()
            .map(|r| self.genetic_map.chrom_map(r.chrom()))
    }

    /// Split a multi-chromosome bucket into per-chromosome buckets, each
    /// paired with its chromosome's map slice. Records are copied; the
    /// input remains usable.
    pub fn divide_into_chromosomes(&self) -> Vec<FamilyVcf> {
        let mut vcfs: Vec<FamilyVcf> = Vec::new();
        let mut prev_chrom: Option<&str> = None;

        for record in &self.records {
            let same = prev_chrom == Some(record.chrom());
            if !same {
                prev_chrom = Some(record.chrom());
                vcfs.push(FamilyVcf::new(
                    Arc::clone(&self.samples),
                    self.mat_hetero,
                    Vec::new(),
                    Arc::clone(&self.genetic_map),
                ));
            }
            vcfs.last_mut()
                .expect("chromosome slice exists after push")
                .records
                .push(record.clone());
        }
        vcfs
    }

    /// Overwrite every record's GT subfields from the engine's GT table.
    /// Row `i` of the table corresponds to record `i`.
    pub fn update_genotypes(&mut self, gt_table: &[Vec<String>]) -> Result<()> {
        if gt_table.len() != self.records.len() {
            return Err(KinphaseError::internal(format!(
                "GT table has {} rows for {} records",
                gt_table.len(),
                self.records.len()
            )));
        }
        for (record, gts) in self.records.iter_mut().zip(gt_table) {
            record.set_gts(gts);
        }
        Ok(())
    }
}
