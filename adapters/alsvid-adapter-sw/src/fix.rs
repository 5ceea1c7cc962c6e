//! Variable fixing by first-order roof duality.
//!
//! A QUBO variable can be fixed when one of its values can never increase
//! the energy, whatever the other variables do:
//!
//! - `x = 0` when `d + sum(min(0, Q_ij)) >= 0`
//! - `x = 1` when `d + sum(max(0, Q_ij)) <= 0`
//!
//! where `d` is the variable's effective diagonal after substituting
//! already-fixed neighbors. `Optimized` iterates to a fixpoint so each
//! fixed variable can expose further ones; `Standard` makes a single
//! pass.

use rustc_hash::FxHashMap;

use alsvid_hal::{FixVariablesMethod, FixVariablesResult};
use alsvid_model::{Problem, ProblemEntry};

pub fn fix_variables(problem: &Problem, method: FixVariablesMethod) -> FixVariablesResult {
    let problem = problem.canonicalize();

    let mut diagonal: FxHashMap<usize, f64> = FxHashMap::default();
    let mut couplings: FxHashMap<usize, Vec<(usize, f64)>> = FxHashMap::default();
    for e in problem.iter() {
        if e.is_linear() {
            *diagonal.entry(e.i).or_insert(0.0) += e.value;
        } else {
            couplings.entry(e.i).or_default().push((e.j, e.value));
            couplings.entry(e.j).or_default().push((e.i, e.value));
        }
    }
    let mut vars: Vec<usize> = diagonal
        .keys()
        .chain(couplings.keys())
        .copied()
        .collect::<rustc_hash::FxHashSet<_>>()
        .into_iter()
        .collect();
    vars.sort_unstable();

    let mut fixed: FxHashMap<usize, i8> = FxHashMap::default();
    loop {
        let mut changed = false;
        for &v in &vars {
            if fixed.contains_key(&v) {
                continue;
            }
            let mut d = diagonal.get(&v).copied().unwrap_or(0.0);
            let mut lo = 0.0f64;
            let mut hi = 0.0f64;
            for &(n, value) in couplings.get(&v).into_iter().flatten() {
                match fixed.get(&n) {
                    Some(&x) => d += value * f64::from(x),
                    None => {
                        lo += value.min(0.0);
                        hi += value.max(0.0);
                    }
                }
            }
            if d + lo >= 0.0 {
                fixed.insert(v, 0);
                changed = true;
            } else if d + hi <= 0.0 {
                fixed.insert(v, 1);
                changed = true;
            }
        }
        if !changed || method == FixVariablesMethod::Standard {
            break;
        }
    }

    // Substitute the fixed values into the problem.
    let mut offset = 0.0;
    let mut entries: Vec<ProblemEntry> = Vec::new();
    for e in problem.iter() {
        match (fixed.get(&e.i), fixed.get(&e.j)) {
            (Some(&xi), Some(&xj)) => {
                let product = if e.is_linear() { xi } else { xi * xj };
                offset += e.value * f64::from(product);
            }
            (Some(&xi), None) => {
                if xi == 1 {
                    entries.push(ProblemEntry::new(e.j, e.j, e.value));
                }
            }
            (None, Some(&xj)) => {
                if xj == 1 {
                    entries.push(ProblemEntry::new(e.i, e.i, e.value));
                }
            }
            (None, None) => entries.push(*e),
        }
    }

    FixVariablesResult {
        fixed,
        offset,
        reduced: Problem::from(entries).canonicalize(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: usize, j: usize, value: f64) -> ProblemEntry {
        ProblemEntry::new(i, j, value)
    }

    #[test]
    fn detects_an_unnecessary_variable() {
        let problem = Problem::from(vec![
            entry(1, 1, 1.0),
            entry(2, 2, 1.0),
            entry(3, 3, 1.0),
            entry(4, 4, 3.0),
            entry(1, 2, 1.0),
            entry(1, 3, -2.0),
            entry(2, 3, -2.0),
            entry(1, 4, 4.0),
        ]);
        let result = fix_variables(&problem, FixVariablesMethod::Optimized);
        assert_eq!(result.fixed.get(&4), Some(&0));
        assert_eq!(result.fixed.len(), 1);
        assert_eq!(result.offset, 0.0);
        // The reduced problem no longer mentions variable 4.
        assert!(result.reduced.iter().all(|e| e.i != 4 && e.j != 4));
    }

    #[test]
    fn fixing_to_one_accumulates_the_offset() {
        // x0 is always 1 (diagonal -4 dominates), dragging x1's entry onto
        // the diagonal.
        let problem = Problem::from(vec![
            entry(0, 0, -4.0),
            entry(1, 1, 1.0),
            entry(0, 1, 2.0),
        ]);
        let result = fix_variables(&problem, FixVariablesMethod::Optimized);
        assert_eq!(result.fixed.get(&0), Some(&1));
        assert_eq!(result.offset, -4.0);
        // x1 sees 1 + 2 = 3 on its diagonal afterwards, so it fixes to 0.
        assert_eq!(result.fixed.get(&1), Some(&0));
        assert!(result.reduced.is_empty());
    }

    #[test]
    fn standard_makes_a_single_pass() {
        let problem = Problem::from(vec![
            entry(0, 0, -4.0),
            entry(1, 1, 1.0),
            entry(0, 1, 2.0),
        ]);
        let result = fix_variables(&problem, FixVariablesMethod::Standard);
        // The single pass still visits x1 after x0 within the same sweep.
        assert_eq!(result.fixed.get(&0), Some(&1));
        assert_eq!(result.fixed.get(&1), Some(&0));
    }
}
