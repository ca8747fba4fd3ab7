//! Prefix-trie index.
//!
//! One [`PrefixTree`] per field position, keyed by the distinct non-empty fixed
//! prefixes of the projections at that field. The node for key `k` holds the
//! projections whose prefix is a prefix of `k` (including the empty prefix) or
//! extends past `k`. A lookup takes the longest stored key that prefixes the
//! item's field value; any projection able to match that value has a prefix of
//! the value, which by maximality is either a prefix of `k` or not stored.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::self_optimizing::ResortableProjector;
use super::{addressed_fields, SimpleProjector};
use crate::{Item, PrefixTree, Projection};

#[derive(Debug)]
pub(crate) struct PrefixTrieProjector {
    field: usize,
    tree: PrefixTree<SimpleProjector>,
}

impl PrefixTrieProjector {
    /// One trie for every field some projection gives a non-empty prefix.
    pub(crate) fn build_all(projections: &Arc<[Projection]>) -> Vec<Box<dyn ResortableProjector>> {
        Self::build(projections)
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn ResortableProjector>)
            .collect()
    }

    fn build(projections: &Arc<[Projection]>) -> Vec<Self> {
        let mut subs = Vec::new();

        for field in 0..addressed_fields(projections) {
            let prefixes: Vec<&str> = projections
                .iter()
                .map(|p| p.pattern().known_fixed_prefix(field))
                .collect();
            let keys: BTreeSet<&str> = prefixes.iter().copied().filter(|p| !p.is_empty()).collect();
            if keys.is_empty() {
                continue;
            }

            let mut tree = PrefixTree::new();
            for key in keys {
                let candidates = prefixes
                    .iter()
                    .enumerate()
                    .filter(|&(_, prefix)| key.starts_with(prefix) || prefix.starts_with(key))
                    .map(|(i, _)| i)
                    .collect();
                tree.insert(
                    key,
                    SimpleProjector::with_candidates(Arc::clone(projections), candidates),
                );
            }
            subs.push(Self { field, tree });
        }
        subs
    }
}

impl ResortableProjector for PrefixTrieProjector {
    fn select(&self, item: &Item) -> Option<&SimpleProjector> {
        self.tree.find_longest_prefix(item.value(self.field))
    }

    /// Mean cost over all nodes.
    fn cost(&self, hits: &[f64]) -> f64 {
        let (total, nodes) = self
            .tree
            .values()
            .fold((0.0, 0usize), |(total, nodes), s| (total + s.cost(hits), nodes + 1));
        if nodes == 0 {
            0.0
        } else {
            total / nodes as f64
        }
    }

    fn label(&self) -> String {
        format!("field {} trie ({} prefixes)", self.field, self.tree.len())
    }
}
