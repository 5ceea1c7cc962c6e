//! Property tests for canonicalization and the QUBO ↔ Ising duality.

use alsvid_model::{Problem, ProblemEntry};
use proptest::collection::vec;
use proptest::prelude::*;

/// Entries over a small index range so duplicates and couplers are common.
fn entry() -> impl Strategy<Value = ProblemEntry> {
    (0usize..8, 0usize..8, -10.0f64..10.0).prop_map(|(i, j, value)| ProblemEntry::new(i, j, value))
}

fn entries() -> impl Strategy<Value = Vec<ProblemEntry>> {
    vec(entry(), 0..24)
}

/// A problem where every variable in `0..n` carries a linear entry, so the
/// duality transform has a diagonal slot to absorb each coupler's linear
/// contribution.
fn full_diagonal_problem() -> impl Strategy<Value = Problem> {
    (2usize..7).prop_flat_map(|n| {
        let linear = vec(-4.0f64..4.0, n..=n);
        let couplers = vec((0usize..n, 0usize..n, -4.0f64..4.0), 0..12);
        (linear, couplers).prop_map(|(h, js)| {
            let mut p = Problem::new();
            for (i, &v) in h.iter().enumerate() {
                p.push(ProblemEntry::new(i, i, v));
            }
            for (i, j, v) in js {
                if i != j {
                    p.push(ProblemEntry::new(i, j, v));
                }
            }
            p
        })
    })
}

fn assert_problems_close(a: &Problem, b: &Problem, tol: f64) {
    assert_eq!(a.len(), b.len(), "entry counts differ: {a:?} vs {b:?}");
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!((x.i, x.j), (y.i, y.j));
        assert!(
            (x.value - y.value).abs() <= tol,
            "coefficient ({}, {}) differs: {} vs {}",
            x.i,
            x.j,
            x.value,
            y.value
        );
    }
}

proptest! {
    #[test]
    fn canonicalize_is_idempotent(es in entries()) {
        let p: Problem = es.into_iter().collect();
        let once = p.canonicalize();
        prop_assert_eq!(once.canonicalize(), once);
    }

    #[test]
    fn canonicalize_is_order_independent(
        (original, shuffled) in entries()
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let a: Problem = original.into_iter().collect();
        let b: Problem = shuffled.into_iter().collect();
        prop_assert_eq!(a.canonicalize(), b.canonicalize());
    }

    #[test]
    fn duality_round_trips(p in full_diagonal_problem()) {
        let canonical = p.canonicalize();

        let (ising, i_off) = canonical.to_ising();
        let (back, q_off) = ising.to_qubo();
        assert_problems_close(&back.canonicalize(), &canonical, 1e-9);
        prop_assert!((i_off + q_off).abs() < 1e-9, "offsets not inverse: {i_off} vs {q_off}");
    }

    #[test]
    fn energies_agree_across_encodings(
        qubo in full_diagonal_problem(),
        bits in vec(0i8..=1, 7..=7),
    ) {
        let (ising, offset) = qubo.to_ising();
        let spins: Vec<i8> = bits.iter().map(|&x| 2 * x - 1).collect();
        let lhs = ising.ising_energy(&spins) + offset;
        let rhs = qubo.qubo_energy(&bits);
        prop_assert!((lhs - rhs).abs() < 1e-9, "{lhs} != {rhs}");
    }

    #[test]
    fn energies_agree_in_the_reverse_direction(
        ising in full_diagonal_problem(),
        bits in vec(0i8..=1, 7..=7),
    ) {
        let (qubo, offset) = ising.to_qubo();
        let spins: Vec<i8> = bits.iter().map(|&x| 2 * x - 1).collect();
        let lhs = qubo.qubo_energy(&bits) + offset;
        let rhs = ising.ising_energy(&spins);
        prop_assert!((lhs - rhs).abs() < 1e-9, "{lhs} != {rhs}");
    }
}
