//! Hardware topology generators.

use crate::problem::{Problem, ProblemEntry};

/// Build the coupler list of an `m` × `n` Chimera graph of `K_{l,l}` cells.
///
/// Each cell holds `2l` qubits: the first `l` form the "left" shore, the
/// rest the "right" shore. Within a cell every left qubit couples to every
/// right qubit; left qubits couple vertically to the matching left qubit of
/// the cell below, right qubits horizontally to the matching right qubit of
/// the cell to the right. Couplers are emitted with unit value in canonical
/// `i < j` orientation; the result is a graph, not an objective.
///
/// Edge count: `m*n*l*l + l*(m-1)*n + l*m*(n-1)`.
pub fn chimera_adjacency(m: usize, n: usize, l: usize) -> Problem {
    let cell = 2 * l;
    let base = |row: usize, col: usize| (row * n + col) * cell;

    let mut adj = Problem::with_capacity(
        m * n * l * l + l * m.saturating_sub(1) * n + l * m * n.saturating_sub(1),
    );
    for row in 0..m {
        for col in 0..n {
            let q0 = base(row, col);

            // Intra-cell bipartite couplers.
            for left in 0..l {
                for right in 0..l {
                    adj.push(ProblemEntry::new(q0 + left, q0 + l + right, 1.0));
                }
            }

            // Vertical inter-cell couplers on the left shore.
            if row + 1 < m {
                let below = base(row + 1, col);
                for left in 0..l {
                    adj.push(ProblemEntry::new(q0 + left, below + left, 1.0));
                }
            }

            // Horizontal inter-cell couplers on the right shore.
            if col + 1 < n {
                let right_cell = base(row, col + 1);
                for right in 0..l {
                    adj.push(ProblemEntry::new(q0 + l + right, right_cell + l + right, 1.0));
                }
            }
        }
    }
    adj
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chimera_edge_count() {
        const M: usize = 3;
        const N: usize = 4;
        const L: usize = 5;
        let adj = chimera_adjacency(M, N, L);
        let expected = M * N * L * L + L * (M - 1) * N + L * M * (N - 1);
        assert_eq!(adj.len(), expected);
    }

    #[test]
    fn chimera_has_no_duplicate_edges() {
        let adj = chimera_adjacency(2, 2, 4);
        assert!(adj.iter().all(|e| e.i < e.j));
        // Merging duplicates must not shrink the list.
        assert_eq!(adj.canonicalize().len(), adj.len());
    }

    #[test]
    fn chimera_degenerate_dimensions_are_empty() {
        assert!(chimera_adjacency(0, 2, 2).is_empty());
        assert!(chimera_adjacency(2, 0, 2).is_empty());
        assert!(chimera_adjacency(2, 2, 0).is_empty());
    }

    #[test]
    fn chimera_qubit_count() {
        let adj = chimera_adjacency(4, 4, 4);
        assert_eq!(adj.max_variable(), Some(4 * 4 * 8 - 1));
    }
}
