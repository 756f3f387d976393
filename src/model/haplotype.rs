//! # Haplotype Reconstruction
//!
//! Reconstructs, for one hetero-homo family bucket, which of the
//! heterozygous parent's two haplotypes each progeny inherited at each
//! variant, then emits fully phased genotypes with missing calls filled.
//!
//! Nearby records are compared through their inherited-allele vectors; a
//! minimum spanning tree over the comparison graph fixes a consistent
//! haplotype labeling, tolerating the 0/1 relabeling that occurs between
//! records (strand inversion).

use std::collections::HashMap;

use crate::data::family::FamilyVcf;
use crate::data::record::MISSING_GT;
use crate::error::{KinphaseError, Result};
use crate::model::distance::distance;
use crate::model::mst::{minimum_spanning_tree, Graph};

/// Records farther apart than this are never compared directly
const MAX_WINDOW_CM: f64 = 10.0;

/// Phased GT strings per record, in family slot order (mat, pat, progenies)
pub type GtTable = Vec<Vec<String>>;

/// Impute a whole bucket: split per chromosome, reconstruct each slice,
/// and concatenate the GT tables in record order.
pub fn impute(vcf: &FamilyVcf) -> Result<GtTable> {
    let mut table = GtTable::with_capacity(vcf.len());
    for slice in vcf.divide_into_chromosomes() {
        table.extend(impute_chromosome_slice(&slice)?);
    }
    if table.len() != vcf.len() {
        return Err(KinphaseError::internal(format!(
            "engine produced {} GT rows for {} records",
            table.len(),
            vcf.len()
        )));
    }
    Ok(table)
}

/// Reconstruct one single-chromosome slice.
fn impute_chromosome_slice(vcf: &FamilyVcf) -> Result<GtTable> {
    let n_records = vcf.len();
    if n_records == 0 {
        return Ok(GtTable::new());
    }
    let n_prog = vcf.samples.num_progenies();

    let chrom_map = vcf
        .chrom_map()
        .ok_or_else(|| KinphaseError::internal("chromosome slice without records"))?;
    let cms: Vec<f64> = vcf
        .records
        .iter()
        .map(|r| chrom_map.bp_to_cm(r.pos()))
        .collect();

    let alleles: Vec<Vec<i32>> = vcf
        .records
        .iter()
        .map(|r| r.hetero_parent_alleles(vcf.mat_hetero))
        .collect();

    let (graph, inversions) = make_graph(&alleles, &cms, n_prog);
    let mst = minimum_spanning_tree(&graph);
    let orientations = orient_records(n_records, &mst, &inversions);

    // progeny haplotype labels: observed allele XOR record orientation
    let mut labels = vec![vec![MISSING_GT; n_records]; n_prog];
    for (i, record_alleles) in alleles.iter().enumerate() {
        for (p, &a) in record_alleles.iter().enumerate() {
            if a != MISSING_GT {
                labels[p][i] = a ^ i32::from(orientations[i]);
            }
        }
    }
    for progeny_labels in &mut labels {
        fill_missing_labels(progeny_labels, &cms);
    }

    let mut table = GtTable::with_capacity(n_records);
    for (i, record) in vcf.records.iter().enumerate() {
        let homo_gt = if vcf.mat_hetero {
            record.pat_int_gt()
        } else {
            record.mat_int_gt()
        };
        let homo_allele = homo_gt / 2;
        let o = i32::from(orientations[i]);

        let mut row = Vec::with_capacity(2 + n_prog);
        let hetero_gt = format!("{}|{}", o, 1 - o);
        let homo_cell = format!("{}|{}", homo_allele, homo_allele);
        if vcf.mat_hetero {
            row.push(hetero_gt);
            row.push(homo_cell);
        } else {
            row.push(homo_cell);
            row.push(hetero_gt);
        }

        for progeny_labels in &labels {
            let allele = progeny_labels[i] ^ o;
            let cell = if vcf.mat_hetero {
                format!("{}|{}", allele, homo_allele)
            } else {
                format!("{}|{}", homo_allele, allele)
            };
            row.push(cell);
        }
        table.push(row);
    }
    Ok(table)
}

/// Comparison graph over record indices. Records within [`MAX_WINDOW_CM`]
/// are compared; an edge survives when the distance stays within the
/// recombination allowance for the cM gap.
fn make_graph(
    alleles: &[Vec<i32>],
    cms: &[f64],
    n_prog: usize,
) -> (Graph, HashMap<(usize, usize), bool>) {
    let mut graph = Graph::new();
    let mut inversions = HashMap::new();

    for i in 0..alleles.len() {
        graph.entry(i).or_default();
        for j in (i + 1)..alleles.len() {
            let gap_cm = cms[j] - cms[i];
            if gap_cm > MAX_WINDOW_CM {
                break;
            }
            let max_dist = max_distance(n_prog, gap_cm);
            let (d, inverted) = distance(&alleles[i], &alleles[j], max_dist);
            if d <= max_dist {
                graph.entry(i).or_default().push((j, d));
                graph.entry(j).or_default().push((i, d));
                inversions.insert((i, j), inverted);
            }
        }
    }
    (graph, inversions)
}

/// Tolerated mismatch count between two records `gap_cm` apart: one
/// genotyping error plus the expected recombinant count for the gap.
fn max_distance(n_prog: usize, gap_cm: f64) -> usize {
    (n_prog as f64 * gap_cm / 100.0).ceil() as usize + 1
}

/// Walk each MST component from its lowest-index record, flipping a
/// record's orientation when the connecting edge was inverted.
fn orient_records(
    n_records: usize,
    mst: &Graph,
    inversions: &HashMap<(usize, usize), bool>,
) -> Vec<bool> {
    let mut orientations = vec![false; n_records];
    let mut visited = vec![false; n_records];

    for start in 0..n_records {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut queue = std::collections::VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let Some(neighbors) = mst.get(&current) else {
                continue;
            };
            for &(next, _) in neighbors {
                if visited[next] {
                    continue;
                }
                visited[next] = true;
                let key = (current.min(next), current.max(next));
                let inverted = inversions.get(&key).copied().unwrap_or(false);
                orientations[next] = orientations[current] ^ inverted;
                queue.push_back(next);
            }
        }
    }
    orientations
}

/// Replace missing haplotype labels with the nearest non-missing label in
/// cM; ties prefer the earlier record. A progeny with no observed label
/// at all defaults to haplotype 0.
fn fill_missing_labels(labels: &mut [i32], cms: &[f64]) {
    let known: Vec<usize> = (0..labels.len())
        .filter(|&i| labels[i] != MISSING_GT)
        .collect();

    for i in 0..labels.len() {
        if labels[i] != MISSING_GT {
            continue;
        }
        if known.is_empty() {
            labels[i] = 0;
            continue;
        }
        let after = known.partition_point(|&k| cms[k] < cms[i]);
        let next = known.get(after).copied();
        let prev = after.checked_sub(1).map(|p| known[p]);
        let source = match (prev, next) {
            (Some(p), Some(n)) => {
                if cms[i] - cms[p] <= cms[n] - cms[i] {
                    p
                } else {
                    n
                }
            }
            (Some(p), None) => p,
            (None, Some(n)) => n,
            (None, None) => unreachable!("known is non-empty"),
        };
        labels[i] = labels[source];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::family::{FamilyRecord, FamilySamples};
    use crate::data::genetic_map::GeneticMap;
    use crate::data::pedigree::Family;
    use crate::data::record::{Samples, VariantRecord};
    use std::sync::Arc;

    /// Bucket with mat heterozygous, pat hom-ref, four progenies.
    /// `rows[i]` holds progeny genotype cells for record `i`.
    fn bucket(rows: &[(u32, [&str; 4])]) -> FamilyVcf {
        let mut ids = vec!["mat".to_string(), "pat".to_string()];
        ids.extend((0..4).map(|i| format!("c{}", i)));
        let samples = Samples::from_ids(ids);
        let family = Family {
            mat: "mat".into(),
            pat: "pat".into(),
            progenies: (0..4).map(|i| format!("c{}", i)).collect(),
        };
        let fam: Arc<FamilySamples> = FamilySamples::resolve(&family, &samples).unwrap();

        let records = rows
            .iter()
            .enumerate()
            .map(|(i, (pos, prog))| {
                let mut cells = vec!["0/1".to_string(), "0/0".to_string()];
                cells.extend(prog.iter().map(|s| s.to_string()));
                let line = format!(
                    "chr1\t{}\t.\tA\tT\t.\tPASS\t.\tGT\t{}",
                    pos,
                    cells.join("\t")
                );
                let record = VariantRecord::parse(&line, cells.len(), 1).unwrap();
                FamilyRecord::project(&record, i, &fam)
            })
            .collect();

        FamilyVcf::new(fam, true, records, Arc::new(GeneticMap::empty()))
    }

    #[test]
    fn test_consistent_records_phase_identically() {
        // progenies c0,c1 inherit allele 0, c2,c3 inherit allele 1 at all records
        let vcf = bucket(&[
            (100_000, ["0/0", "0/0", "1/0", "1/0"]),
            (200_000, ["0/0", "0/0", "0/1", "1/0"]),
            (300_000, ["0/0", "0/0", "1/0", "0/1"]),
        ]);
        let table = impute(&vcf).unwrap();
        assert_eq!(table.len(), 3);
        for row in &table {
            assert_eq!(row[0], "0|1"); // mat keeps one orientation throughout
            assert_eq!(row[1], "0|0");
            assert_eq!(&row[2..], &["0|0", "0|0", "1|0", "1|0"]);
        }
    }

    #[test]
    fn test_inverted_record_is_reoriented() {
        // the middle record reports flipped alleles for every progeny
        let vcf = bucket(&[
            (100_000, ["0/0", "0/0", "1/0", "1/0"]),
            (200_000, ["0/1", "1/0", "0/0", "0/0"]),
            (300_000, ["0/0", "0/0", "0/1", "0/1"]),
        ]);
        let table = impute(&vcf).unwrap();
        // the flipped record swaps the parent's haplotype order instead of
        // rewriting the progeny alleles
        assert_eq!(table[0][0], "0|1");
        assert_eq!(table[1][0], "1|0");
        assert_eq!(table[2][0], "0|1");
        // each progeny keeps its observed allele from the hetero parent
        assert_eq!(&table[1][2..], &["1|0", "1|0", "0|0", "0|0"]);
    }

    #[test]
    fn test_missing_progeny_call_is_filled() {
        let vcf = bucket(&[
            (100_000, ["0/0", "0/0", "1/0", "1/0"]),
            (200_000, ["./.", "0/0", "1/0", "1/0"]),
            (300_000, ["0/0", "0/0", "1/0", "1/0"]),
        ]);
        let table = impute(&vcf).unwrap();
        // c0's missing call at the middle record takes the neighboring label
        assert_eq!(table[1][2], "0|0");
        // every cell is phased with called alleles
        for row in &table {
            for cell in row {
                assert!(cell.contains('|'));
                assert!(!cell.contains('.'));
            }
        }
    }

    #[test]
    fn test_recombination_is_preserved() {
        // c0 switches haplotype between pos 200k and 300k; the switch must
        // survive reconstruction rather than being smoothed away
        let vcf = bucket(&[
            (100_000, ["0/0", "0/0", "1/0", "1/0"]),
            (200_000, ["0/0", "0/0", "1/0", "1/0"]),
            (300_000, ["1/0", "0/0", "1/0", "1/0"]),
            (400_000, ["1/0", "0/0", "1/0", "1/0"]),
        ]);
        let table = impute(&vcf).unwrap();
        assert_eq!(table[1][2], "0|0");
        assert_eq!(table[2][2], "1|0");
    }

    #[test]
    fn test_pat_hetero_role_orders_alleles() {
        let vcf = {
            let mut ids = vec!["mat".to_string(), "pat".to_string()];
            ids.extend((0..4).map(|i| format!("c{}", i)));
            let samples = Samples::from_ids(ids);
            let family = Family {
                mat: "mat".into(),
                pat: "pat".into(),
                progenies: (0..4).map(|i| format!("c{}", i)).collect(),
            };
            let fam = FamilySamples::resolve(&family, &samples).unwrap();
            let line = "chr1\t100000\t.\tA\tT\t.\tPASS\t.\tGT\t1/1\t0/1\t1/0\t1/1\t1/0\t1/1";
            let record = VariantRecord::parse(line, 6, 1).unwrap();
            FamilyVcf::new(
                Arc::clone(&fam),
                false,
                vec![FamilyRecord::project(&record, 0, &fam)],
                Arc::new(GeneticMap::empty()),
            )
        };
        let table = impute(&vcf).unwrap();
        // mat is hom-alt: every progeny cell is "1|a"
        assert_eq!(table[0][0], "1|1");
        assert_eq!(table[0][1], "0|1");
        assert_eq!(&table[0][2..], &["1|0", "1|1", "1|0", "1|1"]);
    }
}
