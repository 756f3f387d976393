//! # Segregation Bias Table
//!
//! For `N` progenies inheriting from one heterozygous parent the minority
//! allele count is binomial(N, 1/2). The table stores, per N, the largest
//! count `b` such that observing `min(n0, N - n0) < b` is implausible at
//! the configured significance. Genetic distance widens the tolerance:
//! markers far along the chromosome may drift from 1:1 through linkage.

use std::f64::consts::LN_2;
use std::sync::OnceLock;

/// Progeny counts covered by the precomputed table; larger families are
/// computed directly.
const TABLE_SIZE: usize = 1024;

static GLOBAL: OnceLock<BiasTable> = OnceLock::new();

/// Read-only lookup from (progeny count, cM) to the maximum tolerable
/// count imbalance.
#[derive(Debug)]
pub struct BiasTable {
    significance: f64,
    thresholds: Vec<usize>,
}

impl BiasTable {
    /// Build the table for a significance level in (0, 1).
    pub fn new(significance: f64) -> Self {
        let thresholds = (0..=TABLE_SIZE)
            .map(|n| base_threshold(n, significance))
            .collect();
        Self {
            significance,
            thresholds,
        }
    }

    /// The process-wide table, built on first access. Later calls reuse
    /// the first significance level.
    pub fn global(significance: f64) -> &'static BiasTable {
        GLOBAL.get_or_init(|| BiasTable::new(significance))
    }

    pub fn significance(&self) -> f64 {
        self.significance
    }

    /// Largest `b` such that a minority count below `b` is implausible for
    /// `n` progenies at genetic position `cm`.
    pub fn max_bias(&self, n: usize, cm: f64) -> usize {
        let base = match self.thresholds.get(n) {
            Some(&b) => b,
            None => base_threshold(n, self.significance),
        };
        let allowance = ((n as f64 * cm.max(0.0) / 100.0).floor() as usize).min(n / 2);
        base.saturating_sub(allowance)
    }
}

/// Largest `b` with `P(min(X, N - X) < b) <= significance` for
/// `X ~ binomial(N, 1/2)`, accumulating both tails exactly in log space.
fn base_threshold(n: usize, significance: f64) -> usize {
    if n == 0 {
        return 0;
    }

    let ln_total = n as f64 * LN_2;
    let mut ln_binom = 0.0f64; // ln C(n, 0)
    let mut mass = 0.0f64;

    for k in 0..=(n / 2) {
        let p = (ln_binom - ln_total).exp();
        let step = if 2 * k == n { p } else { 2.0 * p };
        if mass + step > significance {
            return k;
        }
        mass += step;
        ln_binom += ((n - k) as f64).ln() - ((k + 1) as f64).ln();
    }
    n / 2
}
