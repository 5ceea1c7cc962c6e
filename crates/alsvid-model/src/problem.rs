//! Sparse quadratic problem representation and the QUBO ↔ Ising duality.
//!
//! # Canonical form
//!
//! A [`Problem`] is canonical when every entry has `i <= j`, no two entries
//! share an `(i, j)` pair, and entries are sorted by `i` then `j`.
//! [`Problem::canonicalize`] produces this form; it is idempotent and the
//! result does not depend on the input ordering (duplicates merge by
//! summation, which is commutative).

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// A single coefficient of a quadratic objective.
///
/// If `i == j` the entry is a linear (field) term on variable `i`; otherwise
/// it is a quadratic (coupling) term between `i` and `j`. Couplings are
/// undirected: `(i, j, v)` and `(j, i, v)` denote the same term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProblemEntry {
    /// First variable index.
    pub i: usize,
    /// Second variable index.
    pub j: usize,
    /// Coefficient value.
    pub value: f64,
}

impl ProblemEntry {
    /// Create a new coefficient entry.
    pub fn new(i: usize, j: usize, value: f64) -> Self {
        Self { i, j, value }
    }

    /// Whether this entry is a linear (diagonal) term.
    pub fn is_linear(&self) -> bool {
        self.i == self.j
    }

    /// The same entry with `i <= j`.
    fn oriented(self) -> Self {
        if self.i > self.j {
            Self {
                i: self.j,
                j: self.i,
                value: self.value,
            }
        } else {
            self
        }
    }
}

/// An ordered collection of [`ProblemEntry`] coefficients.
///
/// A `Problem` may represent either a QUBO or an Ising objective; which one
/// is a property of the call site, not of the data. The same type also
/// doubles as an adjacency list (unit-valued couplers) when describing
/// hardware topologies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Problem {
    entries: Vec<ProblemEntry>,
}

impl Problem {
    /// Create an empty problem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty problem with room for `cap` entries.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            entries: Vec::with_capacity(cap),
        }
    }

    /// Append a coefficient.
    pub fn push(&mut self, entry: ProblemEntry) {
        self.entries.push(entry);
    }

    /// Number of entries (not variables).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the problem has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ProblemEntry> {
        self.entries.iter()
    }

    /// The entries as a slice.
    pub fn entries(&self) -> &[ProblemEntry] {
        &self.entries
    }

    /// Number of distinct variable indices referenced by the problem.
    ///
    /// Used to size solution buffers without a backend round trip.
    pub fn num_variables(&self) -> usize {
        let mut vars = FxHashSet::default();
        for e in &self.entries {
            vars.insert(e.i);
            vars.insert(e.j);
        }
        vars.len()
    }

    /// Largest variable index referenced, or `None` for an empty problem.
    pub fn max_variable(&self) -> Option<usize> {
        self.entries.iter().map(|e| e.i.max(e.j)).max()
    }

    /// Produce the canonical form of this problem.
    ///
    /// Orients every entry so `i <= j`, sorts by `(i, j)`, and merges
    /// duplicate pairs by summing their values. Never mutates `self`;
    /// deterministic regardless of the input ordering. O(n log n).
    pub fn canonicalize(&self) -> Problem {
        let mut oriented: Vec<ProblemEntry> =
            self.entries.iter().map(|e| e.oriented()).collect();
        oriented.sort_by(|a, b| (a.i, a.j).cmp(&(b.i, b.j)));

        let mut merged: Vec<ProblemEntry> = Vec::with_capacity(oriented.len());
        for e in oriented {
            match merged.last_mut() {
                Some(last) if last.i == e.i && last.j == e.j => last.value += e.value,
                _ => merged.push(e),
            }
        }
        Problem { entries: merged }
    }

    /// Sum of coupling values touching each variable.
    fn coupling_sums(&self) -> FxHashMap<usize, f64> {
        let mut sums = FxHashMap::default();
        for e in &self.entries {
            if e.is_linear() {
                continue;
            }
            *sums.entry(e.i).or_insert(0.0) += e.value;
            *sums.entry(e.j).or_insert(0.0) += e.value;
        }
        sums
    }

    /// Energy difference between the QUBO and Ising encodings of this
    /// problem: `Σ linear / 2 + Σ coupling / 4`.
    fn energy_offset(&self) -> f64 {
        let mut linear = 0.0;
        let mut coupling = 0.0;
        for e in &self.entries {
            if e.is_linear() {
                linear += e.value;
            } else {
                coupling += e.value;
            }
        }
        linear / 2.0 + coupling / 4.0
    }

    /// Convert a QUBO problem to the equivalent Ising problem.
    ///
    /// Returns the converted problem (canonical form) and an energy offset
    /// that must be added to every Ising solution energy to recover the QUBO
    /// energy. Total over any finite problem; the empty problem converts to
    /// the empty problem with offset 0.
    pub fn to_ising(&self) -> (Problem, f64) {
        let cp = self.canonicalize();
        let sums = cp.coupling_sums();
        let entries = cp
            .entries
            .iter()
            .map(|e| {
                let value = if e.is_linear() {
                    let s = sums.get(&e.i).copied().unwrap_or(0.0);
                    e.value / 2.0 + s / 4.0
                } else {
                    e.value / 4.0
                };
                ProblemEntry { value, ..*e }
            })
            .collect();
        let offset = cp.energy_offset();
        (Problem { entries }, offset)
    }

    /// Convert an Ising problem to the equivalent QUBO problem.
    ///
    /// Returns the converted problem (canonical form) and an energy offset
    /// that must be added to every QUBO solution energy to recover the Ising
    /// energy. The offset is the additive inverse of the one [`to_ising`]
    /// would report for the converted problem.
    ///
    /// [`to_ising`]: Problem::to_ising
    pub fn to_qubo(&self) -> (Problem, f64) {
        let cp = self.canonicalize();
        let sums = cp.coupling_sums();
        let entries: Vec<ProblemEntry> = cp
            .entries
            .iter()
            .map(|e| {
                let value = if e.is_linear() {
                    let s = sums.get(&e.i).copied().unwrap_or(0.0);
                    e.value * 2.0 - s * 2.0
                } else {
                    e.value * 4.0
                };
                ProblemEntry { value, ..*e }
            })
            .collect();
        let qp = Problem { entries };
        let offset = -qp.energy_offset();
        (qp, offset)
    }

    /// Evaluate the Ising objective for a spin assignment (`±1` per index).
    ///
    /// `spins` is indexed by variable index and must cover every index the
    /// problem references; panics otherwise.
    pub fn ising_energy(&self, spins: &[i8]) -> f64 {
        self.entries
            .iter()
            .map(|e| {
                if e.is_linear() {
                    e.value * f64::from(spins[e.i])
                } else {
                    e.value * f64::from(spins[e.i]) * f64::from(spins[e.j])
                }
            })
            .sum()
    }

    /// Evaluate the QUBO objective for a binary assignment (`0`/`1` per
    /// index). Same indexing contract as [`ising_energy`].
    ///
    /// [`ising_energy`]: Problem::ising_energy
    pub fn qubo_energy(&self, bits: &[i8]) -> f64 {
        self.entries
            .iter()
            .map(|e| {
                if e.is_linear() {
                    e.value * f64::from(bits[e.i])
                } else {
                    e.value * f64::from(bits[e.i]) * f64::from(bits[e.j])
                }
            })
            .sum()
    }
}

impl From<Vec<ProblemEntry>> for Problem {
    fn from(entries: Vec<ProblemEntry>) -> Self {
        Self { entries }
    }
}

impl FromIterator<ProblemEntry> for Problem {
    fn from_iter<T: IntoIterator<Item = ProblemEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Problem {
    type Item = ProblemEntry;
    type IntoIter = std::vec::IntoIter<ProblemEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Problem {
    type Item = &'a ProblemEntry;
    type IntoIter = std::slice::Iter<'a, ProblemEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: usize, j: usize, value: f64) -> ProblemEntry {
        ProblemEntry::new(i, j, value)
    }

    #[test]
    fn canonicalize_orients_sorts_and_merges() {
        let p: Problem = [
            entry(3, 2, 1.0),
            entry(1, 1, 0.5),
            entry(2, 3, 6.0),
            entry(0, 2, -1.0),
        ]
        .into_iter()
        .collect();

        let c = p.canonicalize();
        assert_eq!(
            c.entries(),
            &[entry(0, 2, -1.0), entry(1, 1, 0.5), entry(2, 3, 7.0)]
        );
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let p: Problem = [entry(5, 1, 2.0), entry(1, 5, 2.0), entry(0, 0, -3.0)]
            .into_iter()
            .collect();
        let once = p.canonicalize();
        let twice = once.canonicalize();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_problem_is_total() {
        let p = Problem::new();
        let (ising, off_i) = p.to_ising();
        assert!(ising.is_empty());
        assert_eq!(off_i, 0.0);
        let (qubo, off_q) = p.to_qubo();
        assert!(qubo.is_empty());
        assert_eq!(off_q, 0.0);
    }

    #[test]
    fn ising_to_qubo_worked_example() {
        // h_0 = h_1 = 1, J_01 = -1 converts with offset -3; converting back
        // reproduces the problem with the negated offset.
        let ising: Problem = [entry(0, 0, 1.0), entry(1, 1, 1.0), entry(0, 1, -1.0)]
            .into_iter()
            .collect();

        let (qubo, q_off) = ising.to_qubo();
        assert_eq!(q_off, -3.0);
        assert_eq!(
            qubo.entries(),
            &[entry(0, 0, 4.0), entry(0, 1, -4.0), entry(1, 1, 4.0)]
        );

        let (back, i_off) = qubo.to_ising();
        assert_eq!(i_off, 3.0);
        assert_eq!(back, ising.canonicalize());
    }

    #[test]
    fn isolated_variables_round_trip() {
        let ising: Problem = [entry(0, 0, -0.75), entry(4, 4, 2.0)].into_iter().collect();
        let (qubo, q_off) = ising.to_qubo();
        let (back, i_off) = qubo.to_ising();
        assert_eq!(back, ising.canonicalize());
        assert!((q_off + i_off).abs() < 1e-12);
    }

    #[test]
    fn num_variables_counts_distinct_indices() {
        let p: Problem = [entry(0, 0, 1.0), entry(0, 7, 1.0), entry(7, 3, 1.0)]
            .into_iter()
            .collect();
        assert_eq!(p.num_variables(), 3);
        assert_eq!(p.max_variable(), Some(7));
        assert_eq!(Problem::new().num_variables(), 0);
        assert_eq!(Problem::new().max_variable(), None);
    }

    #[test]
    fn energy_evaluation() {
        // E(s) = s0 + s1 - s0*s1
        let p: Problem = [entry(0, 0, 1.0), entry(1, 1, 1.0), entry(0, 1, -1.0)]
            .into_iter()
            .collect();
        assert_eq!(p.ising_energy(&[1, 1]), 1.0);
        assert_eq!(p.ising_energy(&[-1, -1]), -3.0);
        assert_eq!(p.qubo_energy(&[1, 0]), 1.0);
        assert_eq!(p.qubo_energy(&[1, 1]), 1.0);
    }
}
