//! Embedding of logical problem variables onto physical qubits.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Sentinel marking a physical qubit that carries no logical variable.
pub const UNUSED: i64 = -1;

/// A mapping from physical qubit index to logical variable index.
///
/// `embedding[q]` is the logical variable represented by physical qubit `q`,
/// or [`UNUSED`]. Several physical qubits may map to the same logical
/// variable; such a group is a *chain*. Embeddings are produced by a
/// backend's embedding search, never constructed by this library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(pub Vec<i64>);

impl Embedding {
    /// The logical variable on physical qubit `q`, if any.
    pub fn logical(&self, q: usize) -> Option<usize> {
        match self.0.get(q) {
            Some(&v) if v >= 0 => Some(v as usize),
            _ => None,
        }
    }

    /// Number of physical qubits covered by the embedding.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the embedding covers no qubits.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Group physical qubits by logical variable.
    pub fn chains(&self) -> FxHashMap<usize, Vec<usize>> {
        let mut chains: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for (q, &v) in self.0.iter().enumerate() {
            if v >= 0 {
                chains.entry(v as usize).or_default().push(q);
            }
        }
        chains
    }
}

impl From<Vec<i64>> for Embedding {
    fn from(v: Vec<i64>) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_group_by_logical_variable() {
        let emb = Embedding::from(vec![0, UNUSED, 1, 0]);
        assert_eq!(emb.logical(0), Some(0));
        assert_eq!(emb.logical(1), None);
        assert_eq!(emb.logical(9), None);

        let chains = emb.chains();
        assert_eq!(chains[&0], vec![0, 3]);
        assert_eq!(chains[&1], vec![2]);
    }
}
