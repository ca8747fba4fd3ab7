//! Linear-scan projector.

use std::sync::Arc;

use super::{Projector, Side};
use crate::{Item, Projection};

/// Tries projections one by one in declaration order.
///
/// Holds a shared projection list plus the indices it scans, so the adaptive
/// projectors can keep many candidate lists over one list without copying it.
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
/// let projections: Arc<[Projection]> = [("Acme.(*).**:*", r"\1"), ("**:*", "other")]
///     .into_iter()
///     .map(|(pattern, target)| {
///         Projection::new(
///             ItemPattern::compile(&mut registry, pattern, &options).unwrap(),
///             TargetTemplate::parse(Arc::clone(&class), target).unwrap(),
///             ProjectionSide::Both,
///         )
///     })
///     .collect();
///
/// let mut projector = SimpleProjector::new(projections);
/// let item = Item::parse(Arc::clone(&class), "Acme.Billing:Invoice");
/// assert_eq!(projector.project(&item, Side::Left).unwrap().value(0), "Billing");
/// let item = Item::parse(class, "Vendor.Lib:Json");
/// assert_eq!(projector.project(&item, Side::Left).unwrap().value(0), "other");
/// ```
#[derive(Debug, Clone)]
pub struct SimpleProjector {
    projections: Arc<[Projection]>,
    candidates: Vec<usize>,
}

impl SimpleProjector {
    /// Scan every projection.
    #[must_use]
    pub fn new(projections: Arc<[Projection]>) -> Self {
        let candidates = (0..projections.len()).collect();
        Self {
            projections,
            candidates,
        }
    }

    /// Scan only `candidates`, which must be ascending indices into `projections`.
    pub(crate) fn with_candidates(projections: Arc<[Projection]>, candidates: Vec<usize>) -> Self {
        debug_assert!(candidates.windows(2).all(|w| w[0] < w[1]));
        Self {
            projections,
            candidates,
        }
    }

    /// Number of projections scanned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns `true` if nothing is scanned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The scanned projection indices, in declaration order.
    #[must_use]
    pub fn candidates(&self) -> &[usize] {
        &self.candidates
    }

    /// First matching candidate: its index and the projected item.
    pub(crate) fn find(&self, item: &Item, side: Side) -> Option<(usize, Item)> {
        self.candidates.iter().find_map(|&index| {
            self.projections[index]
                .apply(item, side)
                .map(|target| (index, target))
        })
    }

    /// Expected scan cost given per-projection hit counts.
    ///
    /// Σ over ranks r of `(r + 1) / (1 + hits[candidate_r])`: long lists cost more,
    /// and frequently hit candidates near the front cost less.
    pub(crate) fn cost(&self, hits: &[f64]) -> f64 {
        self.candidates
            .iter()
            .enumerate()
            .map(|(rank, &index)| (rank + 1) as f64 / (1.0 + hits[index]))
            .sum()
    }
}

impl Projector for SimpleProjector {
    fn project(&mut self, item: &Item, side: Side) -> Option<Item> {
        self.find(item, side).map(|(_, target)| target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{class, projections};

    #[test]
    fn test_first_match_wins() {
        let list = projections(&[("Acme.**:*", "first"), ("Acme.Billing:*", "second")]);
        let p = SimpleProjector::new(list);
        let (index, target) = p
            .find(&Item::parse(class(), "Acme.Billing:Invoice"), Side::Left)
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(target.value(0), "first");
    }

    #[test]
    fn test_candidates_restrict_the_scan() {
        let list = projections(&[("Acme.**:*", "first"), ("Acme.Billing:*", "second")]);
        let p = SimpleProjector::with_candidates(list, vec![1]);
        let (index, _) = p
            .find(&Item::parse(class(), "Acme.Billing:Invoice"), Side::Left)
            .unwrap();
        assert_eq!(index, 1);
        assert!(p
            .find(&Item::parse(class(), "Acme.Core:Invoice"), Side::Left)
            .is_none());
    }

    #[test]
    fn test_no_match() {
        let mut p = SimpleProjector::new(projections(&[("Acme.**:*", "x")]));
        assert!(p
            .project(&Item::parse(class(), "Other:Invoice"), Side::Right)
            .is_none());
    }

    #[test]
    fn test_cost_prefers_hit_candidates_up_front() {
        let list = projections(&[("A:*", "a"), ("B:*", "b")]);
        let p = SimpleProjector::new(list);
        let cold = p.cost(&[0.0, 0.0]);
        let hot = p.cost(&[9.0, 0.0]);
        assert!((cold - 3.0).abs() < f64::EPSILON);
        assert!(hot < cold);
    }
}
