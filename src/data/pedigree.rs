//! # Pedigree Table
//!
//! Loads the sample → (maternal, paternal) table and derives the nuclear
//! families the imputation engine works on.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::data::record::Samples;
use crate::error::{KinphaseError, Result};

/// Marker for an unknown parent in the pedigree file
fn is_missing_parent(field: &str) -> bool {
    field.is_empty() || field == "0"
}

/// A nuclear family: two parents and their progenies in file order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Family {
    pub mat: String,
    pub pat: String,
    pub progenies: Vec<String>,
}

impl Family {
    /// Display name used by `--families`
    pub fn name(&self) -> String {
        format!("{}/{}", self.mat, self.pat)
    }

    pub fn num_progenies(&self) -> usize {
        self.progenies.len()
    }

    /// Whether the family is large enough for the hetero-homo engine
    pub fn is_large(&self, lower_progs: usize) -> bool {
        self.progenies.len() >= lower_progs
    }
}

/// Parsed pedigree: ordered trio rows plus a parent lookup
#[derive(Clone, Debug, Default)]
pub struct Pedigree {
    rows: Vec<(String, String, String)>,
    parents: HashMap<String, (String, String)>,
}

impl Pedigree {
    /// Read a pedigree file with `sample  mat  pat` columns (extra columns
    /// ignored). Rows naming samples absent from the VCF are dropped with
    /// a warning. Ancestry cycles are a fatal pedigree error.
    pub fn read(path: &Path, samples: &Samples) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut pedigree = Self::default();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let (sample, mat, pat) = match (fields.next(), fields.next(), fields.next()) {
                (Some(sample), Some(mat), Some(pat)) => (sample, mat, pat),
                _ => {
                    return Err(KinphaseError::parse(
                        line_num + 1,
                        "expected sample, mat and pat columns",
                    ))
                }
            };

            let known = |id: &str| is_missing_parent(id) || samples.contains(id);
            if !samples.contains(sample) || !known(mat) || !known(pat) {
                warn!(
                    line = line_num + 1,
                    sample, "pedigree row names a sample absent from the VCF; dropped"
                );
                continue;
            }

            pedigree
                .parents
                .insert(sample.to_string(), (mat.to_string(), pat.to_string()));
            pedigree
                .rows
                .push((sample.to_string(), mat.to_string(), pat.to_string()));
        }

        pedigree.check_acyclic()?;
        Ok(pedigree)
    }

    /// Parents of a sample, if a pedigree row names them
    pub fn parents_of(&self, sample: &str) -> Option<&(String, String)> {
        self.parents.get(sample)
    }

    /// Number of retained pedigree rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Group progenies by (mat, pat). Only rows where both parents are
    /// known produce families; order follows first appearance in the file.
    pub fn families(&self) -> Vec<Family> {
        let mut order: Vec<(String, String)> = Vec::new();
        let mut progenies: HashMap<(String, String), Vec<String>> = HashMap::new();

        for (sample, mat, pat) in &self.rows {
            if is_missing_parent(mat) || is_missing_parent(pat) {
                continue;
            }
            let key = (mat.clone(), pat.clone());
            let entry = progenies.entry(key.clone()).or_default();
            if entry.is_empty() {
                order.push(key);
            }
            entry.push(sample.clone());
        }

        order
            .into_iter()
            .map(|key| {
                let progenies = progenies.remove(&key).unwrap_or_default();
                Family {
                    mat: key.0,
                    pat: key.1,
                    progenies,
                }
            })
            .collect()
    }

    /// Depth-first walk over child → parent edges; a parent that is still
    /// on the current path means the pedigree contains a cycle. Samples
    /// reached through both parents of a cross (diamonds) are fine.
    fn check_acyclic(&self) -> Result<()> {
        const ON_PATH: u8 = 1;
        const DONE: u8 = 2;
        let mut state: HashMap<&str, u8> = HashMap::new();

        for (sample, _, _) in &self.rows {
            if state.contains_key(sample.as_str()) {
                continue;
            }
            // (node, exiting): each node is revisited once to leave the path
            let mut stack: Vec<(&str, bool)> = vec![(sample, false)];
            while let Some((node, exiting)) = stack.pop() {
                if exiting {
                    state.insert(node, DONE);
                    continue;
                }
                if state.get(node).copied().unwrap_or(0) != 0 {
                    continue;
                }
                state.insert(node, ON_PATH);
                stack.push((node, true));
                if let Some((mat, pat)) = self.parents.get(node) {
                    for parent in [mat.as_str(), pat.as_str()] {
                        if is_missing_parent(parent) {
                            continue;
                        }
                        match state.get(parent).copied().unwrap_or(0) {
                            ON_PATH => {
                                return Err(KinphaseError::pedigree(format!(
                                    "ancestry cycle involving sample {}",
                                    parent
                                )))
                            }
                            DONE => {}
                            _ => stack.push((parent, false)),
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(ids: &[&str]) -> Samples {
        Samples::from_ids(ids.iter().map(|s| s.to_string()).collect())
    }

    fn pedigree_from(rows: &[(&str, &str, &str)], samples: &Samples) -> Pedigree {
        let mut pedigree = Pedigree::default();
        for (sample, mat, pat) in rows {
            if !samples.contains(sample) {
                continue;
            }
            pedigree
                .parents
                .insert(sample.to_string(), (mat.to_string(), pat.to_string()));
            pedigree
                .rows
                .push((sample.to_string(), mat.to_string(), pat.to_string()));
        }
        pedigree
    }

    #[test]
    fn test_families_grouping() {
        let samples = samples(&["m", "p", "c1", "c2", "c3"]);
        let pedigree = pedigree_from(
            &[
                ("c1", "m", "p"),
                ("c2", "m", "p"),
                ("c3", "m", "0"),
                ("m", "0", "0"),
            ],
            &samples,
        );
        let families = pedigree.families();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].mat, "m");
        assert_eq!(families[0].pat, "p");
        assert_eq!(families[0].progenies, vec!["c1", "c2"]);
        assert_eq!(families[0].name(), "m/p");
    }

    #[test]
    fn test_is_large() {
        let family = Family {
            mat: "m".into(),
            pat: "p".into(),
            progenies: (0..9).map(|i| format!("c{}", i)).collect(),
        };
        assert!(!family.is_large(10));
        assert!(family.is_large(9));
    }

    #[test]
    fn test_cycle_detected() {
        let samples = samples(&["a", "b"]);
        let pedigree = pedigree_from(&[("a", "b", "0"), ("b", "a", "0")], &samples);
        assert!(matches!(
            pedigree.check_acyclic(),
            Err(KinphaseError::Pedigree { .. })
        ));
    }

    #[test]
    fn test_acyclic_passes() {
        let samples = samples(&["gm", "m", "c1"]);
        let pedigree =
            pedigree_from(&[("c1", "m", "0"), ("m", "gm", "0"), ("gm", "0", "0")], &samples);
        assert!(pedigree.check_acyclic().is_ok());
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        // both parents trace back to the same grandparent
        let samples = samples(&["g", "m", "p", "c"]);
        let pedigree = pedigree_from(
            &[("c", "m", "p"), ("m", "g", "0"), ("p", "g", "0"), ("g", "0", "0")],
            &samples,
        );
        assert!(pedigree.check_acyclic().is_ok());
    }
}
