//! # Imputation Pipeline
//!
//! Orchestrates the whole run:
//! 1. Load the pedigree and genetic map, resolve large families
//! 2. Materialize one chromosome of records at a time
//! 3. Build hetero-homo family buckets and run the engine per bucket
//! 4. Write phased records, chromosomes in input order
//!
//! Chromosomes are imputed on the rayon pool; a reorder buffer in front of
//! the writer keeps the output order equal to the input order regardless
//! of task completion order. Everything within one chromosome runs
//! sequentially, so record order is deterministic.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex};

use tracing::{info, warn};

use crate::config::Config;
use crate::data::family::{FamilyRecord, FamilySamples, FamilyVcf};
use crate::data::genetic_map::GeneticMap;
use crate::data::pedigree::Pedigree;
use crate::data::record::VariantRecord;
use crate::error::Result;
use crate::io::vcf::{VcfReader, VcfWriter};
use crate::model::bias::BiasTable;
use crate::model::haplotype;

/// Reorder buffer shared between imputation tasks and the writer
type Slots = (Mutex<BTreeMap<usize, Result<Vec<VariantRecord>>>>, Condvar);

/// Imputation pipeline
pub struct ImputationPipeline {
    config: Config,
}

impl ImputationPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the pipeline end to end
    pub fn run(&self) -> Result<()> {
        let mut reader = VcfReader::open(&self.config.vcf)?;
        let samples = reader.samples_arc();
        info!(samples = samples.len(), "loaded VCF header");

        let pedigree = Pedigree::read(&self.config.ped, &samples)?;
        let genetic_map = Arc::new(GeneticMap::read(self.config.map.as_deref())?);
        genetic_map.log_info();

        let bias_table = BiasTable::global(self.config.significance);

        // resolve the families the engine will work on
        let subset = self.config.family_subset();
        let mut families: Vec<Arc<FamilySamples>> = Vec::new();
        for family in pedigree.families() {
            if let Some(ref subset) = subset {
                if !subset.contains(&(family.mat.clone(), family.pat.clone())) {
                    continue;
                }
            }
            let resolved = match FamilySamples::resolve(&family, &samples) {
                Some(resolved) => resolved,
                None => continue,
            };
            if resolved.num_progenies() < self.config.lower_progs {
                continue;
            }
            families.push(resolved);
        }
        info!(families = families.len(), "large families resolved");
        if !self.config.only_large_families {
            warn!(
                "small-family and isolated-sample stages are handled by external tooling; \
                 genotypes outside large families pass through unchanged"
            );
        }

        let chrom_subset = self.config.chrom_subset();
        let skip_bias_filter = self.config.skip_bias_filter;

        let mut writer = VcfWriter::create(&self.config.out)?;
        writer.write_header(reader.header_text())?;

        let slots: Arc<Slots> = Arc::new((Mutex::new(BTreeMap::new()), Condvar::new()));
        let mut next_write = 0usize;

        let families = &families;
        let genetic_map = &genetic_map;
        rayon::scope(|scope| -> Result<()> {
            let mut n_tasks = 0usize;
            while let Some(records) = reader.next_chromosome()? {
                if let Some(ref subset) = chrom_subset {
                    if !subset.contains(records[0].chrom()) {
                        continue;
                    }
                }

                let index = n_tasks;
                n_tasks += 1;
                let task_slots = Arc::clone(&slots);
                let task_map = Arc::clone(genetic_map);
                scope.spawn(move |_| {
                    let result = impute_chromosome(
                        records,
                        families,
                        &task_map,
                        bias_table,
                        skip_bias_filter,
                    );
                    let (lock, ready) = &*task_slots;
                    lock.lock().expect("reorder buffer poisoned").insert(index, result);
                    ready.notify_all();
                });

                // drain whatever is already finished, in order
                drain_ready(&slots, &mut next_write, &mut writer, false)?;
            }

            while next_write < n_tasks {
                drain_ready(&slots, &mut next_write, &mut writer, true)?;
            }
            Ok(())
        })?;

        writer.finish()?;
        info!("done");
        Ok(())
    }
}

/// Write finished chromosomes in input order. When `block` is set, waits
/// for the next expected chromosome to finish.
fn drain_ready(
    slots: &Arc<Slots>,
    next_write: &mut usize,
    writer: &mut VcfWriter,
    block: bool,
) -> Result<()> {
    loop {
        let (lock, ready) = &**slots;
        let mut guard = lock.lock().expect("reorder buffer poisoned");
        if block {
            while !guard.contains_key(next_write) {
                guard = ready.wait(guard).expect("reorder buffer poisoned");
            }
        }
        let result = match guard.remove(next_write) {
            Some(result) => result,
            None => return Ok(()),
        };
        drop(guard);

        let records = result?;
        for record in &records {
            writer.write_record(record)?;
        }
        *next_write += 1;
        if block {
            return Ok(());
        }
    }
}

/// Impute one chromosome: bucket construction, engine, write-back.
pub fn impute_chromosome(
    mut records: Vec<VariantRecord>,
    families: &[Arc<FamilySamples>],
    genetic_map: &Arc<GeneticMap>,
    bias_table: &BiasTable,
    skip_bias_filter: bool,
) -> Result<Vec<VariantRecord>> {
    let chrom = match records.first() {
        Some(record) => record.chrom_arc(),
        None => return Ok(records),
    };
    info!(chrom = chrom.as_ref(), records = records.len(), "imputing chromosome");

    let chrom_map = genetic_map.chrom_map(&chrom);
    let buckets = collect_family_records(&records, families);

    for ((family_idx, mat_hetero), mut views) in buckets {
        if !skip_bias_filter {
            views.retain(|view| {
                view.is_valid_segregation(mat_hetero, chrom_map.bp_to_cm(view.pos()), bias_table)
            });
        }
        if views.is_empty() {
            continue;
        }

        let mut family_vcf = FamilyVcf::new(
            Arc::clone(&families[family_idx]),
            mat_hetero,
            views,
            Arc::clone(genetic_map),
        );
        let gt_table = haplotype::impute(&family_vcf)?;
        family_vcf.update_genotypes(&gt_table)?;

        let columns = families[family_idx].columns();
        for (view, row) in family_vcf.records.iter().zip(&gt_table) {
            let record = &mut records[view.index()];
            for (&column, gt) in columns.iter().zip(row) {
                record.set_gt(column, gt);
            }
        }
    }

    Ok(records)
}

/// Project each record onto each family and route hetero-homo variants
/// into their (family, role) buckets in stream order.
pub fn collect_family_records(
    records: &[VariantRecord],
    families: &[Arc<FamilySamples>],
) -> BTreeMap<(usize, bool), Vec<FamilyRecord>> {
    let mut buckets: BTreeMap<(usize, bool), Vec<FamilyRecord>> = BTreeMap::new();

    for (index, record) in records.iter().enumerate() {
        for (family_idx, family) in families.iter().enumerate() {
            let view = FamilyRecord::project(record, index, family);
            // the roles are independent; a variant may satisfy either
            match (view.is_hetero_homo(true), view.is_hetero_homo(false)) {
                (true, true) => {
                    buckets
                        .entry((family_idx, true))
                        .or_default()
                        .push(view.clone());
                    buckets.entry((family_idx, false)).or_default().push(view);
                }
                (true, false) => buckets.entry((family_idx, true)).or_default().push(view),
                (false, true) => buckets.entry((family_idx, false)).or_default().push(view),
                (false, false) => {}
            }
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::pedigree::Family;
    use crate::data::record::Samples;

    fn family_samples(n_prog: usize) -> (Samples, Vec<Arc<FamilySamples>>) {
        let mut ids = vec!["mat".to_string(), "pat".to_string()];
        ids.extend((0..n_prog).map(|i| format!("c{}", i)));
        let samples = Samples::from_ids(ids);
        let family = Family {
            mat: "mat".into(),
            pat: "pat".into(),
            progenies: (0..n_prog).map(|i| format!("c{}", i)).collect(),
        };
        let resolved = FamilySamples::resolve(&family, &samples).unwrap();
        (samples, vec![resolved])
    }

    fn record(pos: u32, cells: &[String]) -> VariantRecord {
        let line = format!(
            "chr1\t{}\t.\tA\tT\t.\tPASS\t.\tGT\t{}",
            pos,
            cells.join("\t")
        );
        VariantRecord::parse(&line, cells.len(), 1).unwrap()
    }

    /// mat het / pat hom-ref record with an even progeny split
    fn hetero_homo_record(pos: u32, n_prog: usize) -> VariantRecord {
        let mut cells = vec!["0/1".to_string(), "0/0".to_string()];
        cells.extend((0..n_prog).map(|i| {
            if i % 2 == 0 {
                "0/0".to_string()
            } else {
                "0/1".to_string()
            }
        }));
        record(pos, &cells)
    }

    #[test]
    fn test_bucket_routing() {
        let (_, families) = family_samples(10);
        let records = vec![
            hetero_homo_record(100_000, 10),
            // both parents het: no bucket
            record(
                200_000,
                &std::iter::once("0/1".to_string())
                    .chain(std::iter::once("0/1".to_string()))
                    .chain((0..10).map(|i| match i % 4 {
                        0 => "0/0".to_string(),
                        1 | 2 => "0/1".to_string(),
                        _ => "1/1".to_string(),
                    }))
                    .collect::<Vec<_>>(),
            ),
            hetero_homo_record(300_000, 10),
        ];
        let buckets = collect_family_records(&records, &families);
        assert_eq!(buckets.len(), 1);
        let mat_bucket = &buckets[&(0, true)];
        assert_eq!(mat_bucket.len(), 2);
        // stream order preserved
        assert_eq!(mat_bucket[0].pos(), 100_000);
        assert_eq!(mat_bucket[1].pos(), 300_000);
    }

    #[test]
    fn test_impute_chromosome_phases_family() {
        let (_, families) = family_samples(10);
        let map = Arc::new(GeneticMap::empty());
        let bias = BiasTable::new(0.01);
        let records: Vec<VariantRecord> =
            (1..=5).map(|i| hetero_homo_record(i * 100_000, 10)).collect();

        let out = impute_chromosome(records, &families, &map, &bias, false).unwrap();
        assert_eq!(out.len(), 5);
        for record in &out {
            for col in 0..12 {
                let cell = record.gt_cell(col);
                assert!(cell.contains('|'), "cell {} is not phased", cell);
            }
        }
    }

    #[test]
    fn test_untouched_records_pass_through() {
        let (_, families) = family_samples(10);
        let map = Arc::new(GeneticMap::empty());
        let bias = BiasTable::new(0.01);
        // no hetero-homo variant: both parents missing
        let mut cells = vec!["./.".to_string(), "./.".to_string()];
        cells.extend((0..10).map(|_| "0/1".to_string()));
        let records = vec![record(100_000, &cells)];

        let out = impute_chromosome(records, &families, &map, &bias, false).unwrap();
        assert_eq!(out[0].gt_cell(0), "./.");
        assert_eq!(out[0].gt_cell(2), "0/1");
    }
}
