//! # Segregation Classification
//!
//! Decides which Mendelian segregation pattern best explains a family
//! view's progeny genotype counts, and whether the variant qualifies for
//! the hetero-homo engine.

use crate::data::family::FamilyRecord;
use crate::data::record::MISSING_GT;
use crate::model::bias::BiasTable;

/// Smoothing mass added to every emission probability
const SMOOTHING: f64 = 0.01;

/// Mendelian segregation pattern of one variant in one family
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegregationType {
    /// One parent hom-ref, the other heterozygous
    HomoHet,
    /// Both parents heterozygous
    HetHet,
    /// One parent heterozygous, the other hom-alt
    HetHomo,
    /// All probability mass on a single progeny genotype; indeterminate
    None,
}

/// Emission matrix `P[s][g]`: probability of progeny genotype `g` under
/// segregation hypothesis `s`, smoothed by `(P + e) / (1 + 3e)`.
fn emission_probs() -> [[f64; 3]; 3] {
    let raw = [
        [0.5, 0.5, 0.0],
        [0.25, 0.5, 0.25],
        [0.0, 0.5, 0.5],
    ];
    let mut smoothed = [[0.0; 3]; 3];
    for s in 0..3 {
        for g in 0..3 {
            smoothed[s][g] = (raw[s][g] + SMOOTHING) / (1.0 + 3.0 * SMOOTHING);
        }
    }
    smoothed
}

impl FamilyRecord {
    /// Progeny counts by integer genotype; missing calls are excluded.
    pub fn progeny_counts(&self) -> [usize; 3] {
        let mut counts = [0usize; 3];
        for gt in self.progeny_int_gts() {
            if (0..=2).contains(&gt) {
                counts[gt as usize] += 1;
            }
        }
        counts
    }

    /// The hypothesis with the highest log-likelihood given the progeny
    /// counts. Ties keep the earliest hypothesis in the scan order
    /// HomoHet, HetHet, HetHomo.
    pub fn segregation_type(&self) -> SegregationType {
        let ns = self.progeny_counts();
        if ns[0] + ns[1] == 0 || ns[0] + ns[2] == 0 || ns[1] + ns[2] == 0 {
            return SegregationType::None;
        }

        let pss = emission_probs();
        let mut lls = [0.0f64; 3];
        for s in 0..3 {
            for g in 0..3 {
                lls[s] += ns[g] as f64 * pss[s][g].ln();
            }
        }

        let mut best = 0;
        for s in 1..3 {
            if lls[s] > lls[best] {
                best = s;
            }
        }
        match best {
            0 => SegregationType::HomoHet,
            1 => SegregationType::HetHet,
            _ => SegregationType::HetHomo,
        }
    }

    /// Whether both parental genotypes are called and consistent with the
    /// classified segregation pattern.
    pub fn is_mendelian_segregation(&self) -> bool {
        let seg_type = self.segregation_type();
        if seg_type == SegregationType::None {
            return false;
        }

        let gt_m = self.mat_int_gt();
        let gt_p = self.pat_int_gt();
        if gt_m == MISSING_GT || gt_p == MISSING_GT {
            return false;
        }

        match seg_type {
            SegregationType::HomoHet => gt_m + gt_p == 1,
            SegregationType::HetHet => gt_m == 1 && gt_p == 1,
            SegregationType::HetHomo => gt_m + gt_p == 3,
            SegregationType::None => false,
        }
    }

    /// Whether the requested parent is heterozygous and the other parent
    /// homozygous, on a Mendelian-valid variant.
    pub fn is_hetero_homo(&self, is_mat: bool) -> bool {
        if !self.is_mendelian_segregation() {
            return false;
        }

        let gt_m = self.mat_int_gt();
        let gt_p = self.pat_int_gt();
        if is_mat {
            gt_m == 1 && (gt_p == 0 || gt_p == 2)
        } else {
            (gt_m == 0 || gt_m == 2) && gt_p == 1
        }
    }

    /// The allele family slot `i` inherited from the heterozygous parent,
    /// given the homozygous parent's dosage. Anything outside {0, 1} is
    /// missing.
    pub fn inherited_allele(&self, i: usize, homo_gt: i32) -> i32 {
        let gt = self.int_gt(i);
        if gt == MISSING_GT {
            return MISSING_GT;
        }
        let allele = gt - homo_gt / 2;
        if allele == 0 || allele == 1 {
            allele
        } else {
            MISSING_GT
        }
    }

    /// Per-progeny alleles inherited from the heterozygous parent
    pub fn hetero_parent_alleles(&self, is_mat: bool) -> Vec<i32> {
        let homo_gt = if is_mat {
            self.pat_int_gt()
        } else {
            self.mat_int_gt()
        };
        (2..2 + self.num_progenies())
            .map(|i| self.inherited_allele(i, homo_gt))
            .collect()
    }

    /// Reject variants whose progeny allele split is too skewed to come
    /// from a single heterozygous parent at this map position.
    pub fn is_valid_segregation(&self, is_mat: bool, cm: f64, table: &BiasTable) -> bool {
        let alleles = self.hetero_parent_alleles(is_mat);
        let n = alleles.iter().filter(|&&a| a != MISSING_GT).count();
        let n0 = alleles.iter().filter(|&&a| a == 0).count();
        let bias = n0.min(n - n0);
        bias >= table.max_bias(n, cm)
    }
}
