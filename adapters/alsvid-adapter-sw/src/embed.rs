//! In-process embedding: a greedy chain-growing heuristic plus the
//! embed/unembed transformations.
//!
//! The heuristic is far simpler than a production embedder: it places
//! logical variables one at a time, growing a chain through free qubits
//! with breadth-first searches until the chain touches every
//! already-placed neighbor. It handles the small dense problems the
//! software solvers are used for; failure does not prove that no
//! embedding exists.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};

use alsvid_hal::{BrokenChainPolicy, EmbedProblemResult, SolverError, SolverResult, UNUSED_QUBIT};
use alsvid_model::{Embedding, Problem, ProblemEntry, UNUSED};

pub(crate) type Adjacency = FxHashMap<usize, FxHashSet<usize>>;

/// Symmetric adjacency map from a coupler-graph problem.
pub(crate) fn adjacency_map(adjacency: &Problem) -> Adjacency {
    let mut map: Adjacency = FxHashMap::default();
    for e in adjacency.iter().filter(|e| !e.is_linear()) {
        map.entry(e.i).or_default().insert(e.j);
        map.entry(e.j).or_default().insert(e.i);
    }
    map
}

fn logical_edges(problem: &Problem) -> Vec<(usize, usize)> {
    problem
        .canonicalize()
        .iter()
        .filter(|e| !e.is_linear())
        .map(|e| (e.i, e.j))
        .collect()
}

fn logical_neighbors(edges: &[(usize, usize)]) -> FxHashMap<usize, Vec<usize>> {
    let mut map: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    for &(a, b) in edges {
        map.entry(a).or_default().push(b);
        map.entry(b).or_default().push(a);
    }
    map
}

/// Grow `chain` through free qubits until it is adjacent to `target`.
fn connect_chain(
    chain: &mut Vec<usize>,
    target: &[usize],
    adj: &Adjacency,
    used: &FxHashSet<usize>,
) -> bool {
    let target_set: FxHashSet<usize> = target.iter().copied().collect();
    let touches_target = |q: usize| {
        adj.get(&q)
            .is_some_and(|ns| ns.iter().any(|n| target_set.contains(n)))
    };
    if chain.iter().any(|&q| touches_target(q)) {
        return true;
    }

    // BFS from the whole chain through free qubits.
    let mut parents: FxHashMap<usize, usize> = FxHashMap::default();
    let mut queue: std::collections::VecDeque<usize> = chain.iter().copied().collect();
    let mut seen: FxHashSet<usize> = chain.iter().copied().collect();
    while let Some(q) = queue.pop_front() {
        let Some(ns) = adj.get(&q) else { continue };
        for &n in ns {
            if seen.contains(&n) || used.contains(&n) {
                continue;
            }
            seen.insert(n);
            parents.insert(n, q);
            if touches_target(n) {
                // Walk back to the chain, adding the path.
                let mut cur = n;
                let chain_set: FxHashSet<usize> = chain.iter().copied().collect();
                while !chain_set.contains(&cur) {
                    chain.push(cur);
                    match parents.get(&cur) {
                        Some(&p) => cur = p,
                        None => break,
                    }
                }
                return true;
            }
            queue.push_back(n);
        }
    }
    false
}

fn try_embed(
    order: &[usize],
    neighbors: &FxHashMap<usize, Vec<usize>>,
    adj: &Adjacency,
    rng: &mut StdRng,
) -> Option<FxHashMap<usize, Vec<usize>>> {
    let mut chains: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    let mut used: FxHashSet<usize> = FxHashSet::default();

    let mut qubits: Vec<usize> = adj.keys().copied().collect();
    qubits.sort_unstable();

    for &v in order {
        let placed: Vec<usize> = neighbors
            .get(&v)
            .map(|ns| ns.iter().copied().filter(|n| chains.contains_key(n)).collect())
            .unwrap_or_default();

        let mut chain: Vec<usize> = Vec::new();
        if placed.is_empty() {
            let start = rng.gen_range(0..qubits.len());
            let root = qubits
                .iter()
                .cycle()
                .skip(start)
                .take(qubits.len())
                .copied()
                .find(|q| !used.contains(q))?;
            chain.push(root);
        } else {
            // Seed next to the first placed neighbor, then connect to the
            // rest.
            let first = &chains[&placed[0]];
            let root = first
                .iter()
                .flat_map(|q| adj.get(q).into_iter().flatten())
                .copied()
                .find(|q| !used.contains(q))?;
            chain.push(root);
            for other in &placed[1..] {
                if !connect_chain(&mut chain, &chains[other], adj, &used) {
                    return None;
                }
            }
        }

        used.extend(chain.iter().copied());
        chains.insert(v, chain);
    }
    Some(chains)
}

/// Search for an embedding of `problem` into `adjacency`.
pub fn find_embedding(
    problem: &Problem,
    adjacency: &Problem,
    tries: usize,
    seed: Option<u64>,
) -> SolverResult<Embedding> {
    let adj = adjacency_map(adjacency);
    if adj.is_empty() {
        return Err(SolverError::InvalidParameter(
            "adjacency graph has no couplers".into(),
        ));
    }
    let edges = logical_edges(problem);
    let neighbors = logical_neighbors(&edges);
    let mut vars: Vec<usize> = problem
        .canonicalize()
        .iter()
        .flat_map(|e| [e.i, e.j])
        .collect::<FxHashSet<_>>()
        .into_iter()
        .collect();
    vars.sort_unstable();

    let num_physical = adj.keys().copied().max().unwrap_or(0) + 1;
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    for _ in 0..tries.max(1) {
        let mut order = vars.clone();
        order.shuffle(&mut rng);
        if let Some(chains) = try_embed(&order, &neighbors, &adj, &mut rng) {
            let mut elements = vec![UNUSED; num_physical];
            for (&v, chain) in &chains {
                for &q in chain {
                    elements[q] = v as i64;
                }
            }
            let embedding = Embedding::from(elements);
            if verify_embedding(problem, &embedding, &adj) {
                return Ok(embedding);
            }
        }
    }
    Err(SolverError::SolveFailed(
        "no embedding found within the try budget".into(),
    ))
}

/// Check that every logical edge has a physical edge between its chains.
pub(crate) fn verify_embedding(problem: &Problem, embedding: &Embedding, adj: &Adjacency) -> bool {
    let chains = embedding.chains();
    logical_edges(problem).iter().all(|&(a, b)| {
        let (Some(ca), Some(cb)) = (chains.get(&a), chains.get(&b)) else {
            return false;
        };
        cross_edges(ca, cb, adj).next().is_some()
    })
}

fn cross_edges<'a>(
    ca: &'a [usize],
    cb: &'a [usize],
    adj: &'a Adjacency,
) -> impl Iterator<Item = (usize, usize)> + 'a {
    ca.iter().flat_map(move |&qa| {
        cb.iter().filter_map(move |&qb| {
            adj.get(&qa)
                .is_some_and(|ns| ns.contains(&qb))
                .then_some((qa, qb))
        })
    })
}

/// Map a logical problem onto physical qubits through an embedding.
///
/// Linear terms are split evenly across the chain; coupling terms are
/// split evenly across every physical edge joining the two chains. With
/// `clean`, chain qubits that neither carry a cross-chain edge nor hold
/// the chain together are dropped first. Smearing is not performed; the
/// software solvers place no range limits on coefficients.
pub fn embed_problem(
    problem: &Problem,
    embedding: &Embedding,
    adjacency: &Problem,
    clean: bool,
) -> SolverResult<EmbedProblemResult> {
    let adj = adjacency_map(adjacency);
    let problem = problem.canonicalize();
    let mut chains = embedding.chains();

    if clean {
        trim_chains(&problem, &mut chains, &adj);
    }

    let mut entries: Vec<ProblemEntry> = Vec::new();
    for e in problem.iter() {
        if e.is_linear() {
            let chain = chains
                .get(&e.i)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| embedding_gap(e.i))?;
            let share = e.value / chain.len() as f64;
            entries.extend(chain.iter().map(|&q| ProblemEntry::new(q, q, share)));
        } else {
            let ca = chains.get(&e.i).ok_or_else(|| embedding_gap(e.i))?;
            let cb = chains.get(&e.j).ok_or_else(|| embedding_gap(e.j))?;
            let edges: Vec<(usize, usize)> = cross_edges(ca, cb, &adj).collect();
            if edges.is_empty() {
                return Err(SolverError::SolveFailed(format!(
                    "no physical edge joins the chains of variables {} and {}",
                    e.i, e.j
                )));
            }
            let share = e.value / edges.len() as f64;
            entries.extend(
                edges
                    .into_iter()
                    .map(|(qa, qb)| ProblemEntry::new(qa, qb, share)),
            );
        }
    }

    // Intra-chain couplers; the caller picks the chain strength.
    let mut chain_entries: Vec<ProblemEntry> = Vec::new();
    for chain in chains.values() {
        let members: FxHashSet<usize> = chain.iter().copied().collect();
        for &q in chain {
            for &n in adj.get(&q).into_iter().flatten() {
                if n > q && members.contains(&n) {
                    chain_entries.push(ProblemEntry::new(q, n, -1.0));
                }
            }
        }
    }

    let num_physical = embedding.len();
    let mut elements = vec![UNUSED; num_physical];
    for (&v, chain) in &chains {
        for &q in chain {
            elements[q] = v as i64;
        }
    }

    Ok(EmbedProblemResult {
        problem: Problem::from(entries).canonicalize(),
        chain_couplers: Problem::from(chain_entries).canonicalize(),
        embedding: Embedding::from(elements),
    })
}

fn embedding_gap(var: usize) -> SolverError {
    SolverError::InvalidParameter(format!("variable {var} is not covered by the embedding"))
}

/// Drop chain leaves that carry no cross-chain contact.
fn trim_chains(problem: &Problem, chains: &mut FxHashMap<usize, Vec<usize>>, adj: &Adjacency) {
    let edges = logical_edges(problem);
    let neighbors = logical_neighbors(&edges);

    let snapshot = chains.clone();
    for (&v, chain) in chains.iter_mut() {
        let foreign: FxHashSet<usize> = neighbors
            .get(&v)
            .into_iter()
            .flatten()
            .filter_map(|n| snapshot.get(n))
            .flatten()
            .copied()
            .collect();

        loop {
            let members: FxHashSet<usize> = chain.iter().copied().collect();
            let removable = chain.iter().copied().find(|&q| {
                let in_chain = adj
                    .get(&q)
                    .map_or(0, |ns| ns.iter().filter(|n| members.contains(n)).count());
                let has_contact = adj
                    .get(&q)
                    .is_some_and(|ns| ns.iter().any(|n| foreign.contains(n)));
                chain.len() > 1 && in_chain <= 1 && !has_contact
            });
            match removable {
                Some(q) => chain.retain(|&c| c != q),
                None => break,
            }
        }
    }
}

/// Map physical solutions back onto logical variables.
pub fn unembed_answer(
    solutions: &[Vec<i8>],
    embedding: &Embedding,
    policy: BrokenChainPolicy,
    problem: &Problem,
) -> SolverResult<Vec<Vec<i8>>> {
    let chains = embedding.chains();
    let logical_len = chains.keys().copied().max().map_or(0, |m| m + 1);

    // The energy refinement below evaluates the problem over the logical
    // vector, so every problem variable needs a chain.
    if policy == BrokenChainPolicy::MinimizeEnergy {
        if let Some(v) = problem
            .iter()
            .flat_map(|e| [e.i, e.j])
            .find(|v| !chains.contains_key(v))
        {
            return Err(embedding_gap(v));
        }
    }

    let mut out = Vec::with_capacity(solutions.len());

    let mut rng = StdRng::from_entropy();
    'solutions: for row in solutions {
        let mut logical = vec![UNUSED_QUBIT; logical_len];
        let mut broken: Vec<usize> = Vec::new();

        for (&v, chain) in &chains {
            let values: Vec<i8> = chain
                .iter()
                .filter_map(|&q| row.get(q).copied())
                .filter(|&s| s != UNUSED_QUBIT)
                .collect();
            let Some(&first) = values.first() else {
                continue;
            };
            if values.iter().all(|&s| s == first) {
                logical[v] = first;
                continue;
            }

            let ups = values.iter().filter(|&&s| s > 0).count();
            let downs = values.len() - ups;
            match policy {
                BrokenChainPolicy::Discard => continue 'solutions,
                BrokenChainPolicy::Vote => {
                    logical[v] = if ups != downs {
                        if ups > downs { 1 } else { -1 }
                    } else {
                        first
                    };
                }
                BrokenChainPolicy::WeightedRandom => {
                    logical[v] = if rng.gen_range(0..values.len()) < ups {
                        1
                    } else {
                        -1
                    };
                }
                BrokenChainPolicy::MinimizeEnergy => {
                    // Majority first; refined below once every chain has a
                    // value.
                    logical[v] = if ups >= downs { 1 } else { -1 };
                    broken.push(v);
                }
            }
        }

        if policy == BrokenChainPolicy::MinimizeEnergy {
            broken.sort_unstable();
            for v in broken {
                let mut flipped = logical.clone();
                flipped[v] = -logical[v];
                if problem.ising_energy(&flipped) < problem.ising_energy(&logical) {
                    logical = flipped;
                }
            }
        }
        out.push(logical);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unembedding_rejects_problem_variables_without_a_chain() {
        // Variable 0 maps to qubit 0, variable 1 to the broken chain
        // {1, 2}; the problem also references variable 2, which has no
        // chain at all.
        let embedding = Embedding::from(vec![0, 1, 1, UNUSED]);
        let problem = Problem::from(vec![
            ProblemEntry::new(0, 1, -1.0),
            ProblemEntry::new(1, 2, -1.0),
        ]);
        let solutions = vec![vec![1, 1, -1, UNUSED_QUBIT]];

        let err = unembed_answer(
            &solutions,
            &embedding,
            BrokenChainPolicy::MinimizeEnergy,
            &problem,
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::InvalidParameter(_)));
    }

    #[test]
    fn unembedding_votes_broken_chains() {
        let embedding = Embedding::from(vec![0, 0, 0, 1]);
        let solutions = vec![vec![1, 1, -1, -1]];
        let problem = Problem::from(vec![ProblemEntry::new(0, 1, -1.0)]);

        let logical = unembed_answer(&solutions, &embedding, BrokenChainPolicy::Vote, &problem)
            .unwrap();
        assert_eq!(logical, vec![vec![1, -1]]);
    }
}
