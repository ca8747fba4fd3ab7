//! First-letter buckets.
//!
//! For each field position, every distinct first letter `L` of the projections'
//! fixed prefixes gets a bucket selected by "field value starts with `L`". It
//! holds the projections whose prefix is empty or starts with `L`. One catch-all
//! bucket per field takes values starting with none of the letters (or empty)
//! and holds the projections with an empty prefix.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::self_optimizing::ResortableProjector;
use super::{addressed_fields, SimpleProjector};
use crate::{Item, Projection};

#[derive(Debug)]
pub(crate) struct FirstLetterProjector {
    field: usize,
    /// `None` for the catch-all bucket.
    letter: Option<char>,
    /// All letters with a bucket on this field; read by the catch-all.
    known: Arc<BTreeSet<char>>,
    candidates: SimpleProjector,
}

impl FirstLetterProjector {
    /// Buckets for every field some projection gives a non-empty prefix.
    pub(crate) fn build_all(projections: &Arc<[Projection]>) -> Vec<Box<dyn ResortableProjector>> {
        Self::build(projections)
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn ResortableProjector>)
            .collect()
    }

    fn build(projections: &Arc<[Projection]>) -> Vec<Self> {
        let mut subs = Vec::new();

        for field in 0..addressed_fields(projections) {
            let first_letters: Vec<Option<char>> = projections
                .iter()
                .map(|p| p.pattern().known_fixed_prefix(field).chars().next())
                .collect();
            let known: Arc<BTreeSet<char>> =
                Arc::new(first_letters.iter().flatten().copied().collect());
            if known.is_empty() {
                continue;
            }

            let bucket = |keep: &dyn Fn(Option<char>) -> bool| {
                let candidates = first_letters
                    .iter()
                    .enumerate()
                    .filter(|&(_, &first)| keep(first))
                    .map(|(i, _)| i)
                    .collect();
                SimpleProjector::with_candidates(Arc::clone(projections), candidates)
            };

            for &letter in known.iter() {
                subs.push(Self {
                    field,
                    letter: Some(letter),
                    known: Arc::clone(&known),
                    candidates: bucket(&|first| first.map_or(true, |c| c == letter)),
                });
            }
            subs.push(Self {
                field,
                letter: None,
                known: Arc::clone(&known),
                candidates: bucket(&|first| first.is_none()),
            });
        }
        subs
    }
}

impl ResortableProjector for FirstLetterProjector {
    fn select(&self, item: &Item) -> Option<&SimpleProjector> {
        let first = item.value(self.field).chars().next();
        let selected = match self.letter {
            Some(letter) => first == Some(letter),
            None => first.map_or(true, |c| !self.known.contains(&c)),
        };
        selected.then_some(&self.candidates)
    }

    fn cost(&self, hits: &[f64]) -> f64 {
        self.candidates.cost(hits)
    }

    fn label(&self) -> String {
        match self.letter {
            Some(letter) => format!("field {} '{letter}'", self.field),
            None => format!("field {} *", self.field),
        }
    }
}
