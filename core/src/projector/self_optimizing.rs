//! Self-reorganizing projector over a set of indexed candidate lists.
//!
//! Construction partitions the projection list into sub-projectors, each a cheap
//! predicate plus a [`SimpleProjector`] over a superset of the projections that
//! can match when the predicate holds. A call asks the sub-projectors in their
//! current order and scans the candidates of the first one that selects the
//! item; if none does, the full list is scanned.
//!
//! Every `reorganize_interval` calls the sub-projectors are re-sorted by
//! ascending cost (see [`SimpleProjector`]), after which every hit counter is
//! multiplied by the decay factor so old traffic fades.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use super::first_letter::FirstLetterProjector;
use super::prefix_trie::PrefixTrieProjector;
use super::{Projector, ProjectorStrategy, Side, SimpleProjector, DEFAULT_DECAY};
use crate::{Item, Projection};

/// A predicate plus the candidate list to scan when it holds.
pub(crate) trait ResortableProjector: fmt::Debug + Send {
    /// The candidate list for `item`, or `None` if this sub-projector does not apply.
    fn select(&self, item: &Item) -> Option<&SimpleProjector>;

    /// Expected scan cost under the current hit counts.
    fn cost(&self, hits: &[f64]) -> f64;

    /// Short description for diagnostics.
    fn label(&self) -> String;
}

/// Snapshot of a [`SelfOptimizingProjector`]'s adaptive state.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectorStats {
    /// Indexing strategy.
    pub strategy: ProjectorStrategy,
    /// Total `project` calls.
    pub calls: u64,
    /// Reorganizations performed.
    pub reorganizations: u64,
    /// Sub-projector labels, in current evaluation order.
    pub order: Vec<String>,
}

/// Adaptive projector returning exactly what [`SimpleProjector`] returns.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use depmatch::prelude::*;
///
/// let class = Arc::new(ItemType::new("CLASS", ["NAMESPACE", "NAME"]));
/// let mut registry = RegistryBuilder::new().item_type(Arc::clone(&class)).build();
/// let options = ItemPatternOptions::default().type_hint(Arc::clone(&class));
///
/// let projections: Arc<[Projection]> = ["Acme.Billing.**", "Acme.Shipping.**", "Vendor.**"]
///     .into_iter()
///     .map(|ns| {
///         Projection::new(
///             ItemPattern::compile(&mut registry, &format!("{ns}:*"), &options).unwrap(),
///             TargetTemplate::parse(Arc::clone(&class), ns).unwrap(),
///             ProjectionSide::Both,
///         )
///     })
///     .collect();
///
/// let mut projector = SelfOptimizingProjector::prefix_trie(projections, 100);
/// let item = Item::parse(class, "Acme.Shipping.Rates:Table");
/// assert_eq!(projector.project(&item, Side::Left).unwrap().value(0), "Acme.Shipping.**");
/// ```
#[derive(Debug)]
pub struct SelfOptimizingProjector {
    strategy: ProjectorStrategy,
    sub_projectors: Vec<Box<dyn ResortableProjector>>,
    /// Evaluation order: a permutation of `sub_projectors` indices.
    order: Vec<usize>,
    fallback: SimpleProjector,
    hits: Vec<f64>,
    reorganize_interval: u64,
    decay: f64,
    calls: u64,
    reorganizations: u64,
}

impl SelfOptimizingProjector {
    /// Buckets per field and first letter of the projections' fixed prefixes.
    #[must_use]
    pub fn first_letter(projections: Arc<[Projection]>, reorganize_interval: usize) -> Self {
        let subs = FirstLetterProjector::build_all(&projections);
        Self::new(
            ProjectorStrategy::FirstLetter,
            projections,
            subs,
            reorganize_interval,
        )
    }

    /// One radix tree per field, keyed by the projections' fixed prefixes.
    #[must_use]
    pub fn prefix_trie(projections: Arc<[Projection]>, reorganize_interval: usize) -> Self {
        let subs = PrefixTrieProjector::build_all(&projections);
        Self::new(
            ProjectorStrategy::PrefixTrie,
            projections,
            subs,
            reorganize_interval,
        )
    }

    fn new(
        strategy: ProjectorStrategy,
        projections: Arc<[Projection]>,
        sub_projectors: Vec<Box<dyn ResortableProjector>>,
        reorganize_interval: usize,
    ) -> Self {
        debug!(
            %strategy,
            projections = projections.len(),
            sub_projectors = sub_projectors.len(),
            "built self-optimizing projector"
        );
        Self {
            strategy,
            order: (0..sub_projectors.len()).collect(),
            sub_projectors,
            hits: vec![0.0; projections.len()],
            fallback: SimpleProjector::new(projections),
            reorganize_interval: reorganize_interval.max(1) as u64,
            decay: DEFAULT_DECAY,
            calls: 0,
            reorganizations: 0,
        }
    }

    /// Override the decay factor applied after each reorganization.
    ///
    /// Values outside `0.0..=1.0` are clamped.
    #[must_use]
    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay.clamp(0.0, 1.0);
        self
    }

    /// Number of sub-projectors (excluding the fallback).
    #[must_use]
    pub fn sub_projector_count(&self) -> usize {
        self.sub_projectors.len()
    }

    /// Current adaptive state.
    #[must_use]
    pub fn stats(&self) -> ProjectorStats {
        ProjectorStats {
            strategy: self.strategy,
            calls: self.calls,
            reorganizations: self.reorganizations,
            order: self
                .order
                .iter()
                .map(|&i| self.sub_projectors[i].label())
                .collect(),
        }
    }

    /// Re-sort sub-projectors by ascending cost, then decay the hit counters.
    ///
    /// Equal costs keep construction order.
    pub fn reorganize(&mut self) {
        let costs: Vec<f64> = self
            .sub_projectors
            .iter()
            .map(|s| s.cost(&self.hits))
            .collect();
        self.order.sort_by(|&a, &b| costs[a].total_cmp(&costs[b]).then(a.cmp(&b)));
        for hits in &mut self.hits {
            *hits *= self.decay;
        }
        self.reorganizations += 1;
        trace!(
            calls = self.calls,
            reorganizations = self.reorganizations,
            head = ?self.order.first().map(|&i| self.sub_projectors[i].label()),
            "reorganized projector"
        );
    }
}

impl Projector for SelfOptimizingProjector {
    fn project(&mut self, item: &Item, side: Side) -> Option<Item> {
        self.calls += 1;

        let found = self
            .order
            .iter()
            .find_map(|&i| self.sub_projectors[i].select(item))
            .unwrap_or(&self.fallback)
            .find(item, side);
        if let Some((index, _)) = &found {
            self.hits[*index] += 1.0;
        }

        if self.calls % self.reorganize_interval == 0 {
            self.reorganize();
        }
        found.map(|(_, target)| target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{class, projections};

    fn list() -> Arc<[Projection]> {
        projections(&[
            ("Acme.Billing.**:*", "billing"),
            ("Acme.**:*", "acme"),
            ("Beta.**:*", "beta"),
            ("**:*Test", "tests"),
            ("**:*", "rest"),
        ])
    }

    fn project(p: &mut dyn Projector, namespace_and_name: &str) -> Option<String> {
        p.project(&Item::parse(class(), namespace_and_name), Side::Left)
            .map(|item| item.value(0).to_string())
    }

    #[test]
    fn test_agrees_with_simple_scan() {
        let items = [
            "Acme.Billing:Invoice",
            "Acme.Billing.Model:Invoice",
            "Acme.Core:Util",
            "Beta:Thing",
            "Gamma:FooTest",
            "Gamma:Foo",
            ":",
        ];
        let mut simple = SimpleProjector::new(list());
        let mut letter = SelfOptimizingProjector::first_letter(list(), 3);
        let mut trie = SelfOptimizingProjector::prefix_trie(list(), 3);

        for round in 0..5 {
            for item in items {
                let expected = project(&mut simple, item);
                assert_eq!(project(&mut letter, item), expected, "first letter, round {round}, {item}");
                assert_eq!(project(&mut trie, item), expected, "prefix trie, round {round}, {item}");
            }
        }
        assert!(letter.stats().reorganizations > 0);
        assert!(trie.stats().reorganizations > 0);
    }

    #[test]
    fn test_reorganization_happens_every_interval() {
        let mut p = SelfOptimizingProjector::first_letter(list(), 4);
        for _ in 0..10 {
            project(&mut p, "Beta:Thing");
        }
        let stats = p.stats();
        assert_eq!(stats.calls, 10);
        assert_eq!(stats.reorganizations, 2);
        assert_eq!(stats.strategy, ProjectorStrategy::FirstLetter);
    }

    #[test]
    fn test_hot_bucket_moves_to_front() {
        let position = |order: &[String], label: &str| order.iter().position(|l| l == label);

        let mut p = SelfOptimizingProjector::first_letter(list(), 8);
        let before = p.stats().order;
        assert!(position(&before, "field 0 'A'") < position(&before, "field 0 'B'"));

        for _ in 0..8 {
            project(&mut p, "Beta:Thing");
        }
        let after = p.stats().order;
        assert!(position(&after, "field 0 'B'") < position(&after, "field 0 'A'"));
    }

    #[test]
    fn test_hits_decay_after_reorganize() {
        let mut p = SelfOptimizingProjector::prefix_trie(list(), 1000).with_decay(0.5);
        for _ in 0..4 {
            project(&mut p, "Beta:Thing");
        }
        assert!((p.hits[2] - 4.0).abs() < f64::EPSILON);
        p.reorganize();
        assert!((p.hits[2] - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_list() {
        let mut p = SelfOptimizingProjector::prefix_trie(projections(&[]), 10);
        assert_eq!(p.sub_projector_count(), 0);
        assert!(project(&mut p, "Acme:X").is_none());
    }
}
