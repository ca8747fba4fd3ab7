//! Projector family: first-match-wins application of an ordered projection list
//!
//! Every projector answers "which projection, tried in declaration order, is the
//! first to match this item?" and returns its target item.
//!
//! | Projector | Search | State |
//! |---|---|---|
//! | [`SimpleProjector`] | linear scan | none |
//! | [`SelfOptimizingProjector`] (first letter) | bucket per field and first letter | hit counters, bucket order |
//! | [`SelfOptimizingProjector`] (prefix trie) | longest fixed prefix per field | hit counters, trie order |
//!
//! The adaptive variants only choose which candidate list to scan. Every list is
//! a superset of the projections that can match, kept in declaration order, so
//! all variants return the same item for the same input.

mod first_letter;
mod prefix_trie;
mod self_optimizing;
mod simple;

pub use self_optimizing::{ProjectorStats, SelfOptimizingProjector};
pub use simple::SimpleProjector;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::{Item, PatternError, Projection};

/// Default number of `project` calls between reorganizations.
pub const DEFAULT_REORGANIZE_INTERVAL: usize = 1000;

/// Factor applied to every hit counter after a reorganization.
pub const DEFAULT_DECAY: f64 = 0.5;

/// Which side of a dependency an item sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The using item.
    Left,
    /// The used item.
    Right,
}

impl FromStr for Side {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "using" => Ok(Self::Left),
            "right" | "used" => Ok(Self::Right),
            _ => Err(PatternError::InvalidConfig {
                message: format!("unknown side \"{s}\", expected left or right"),
            }),
        }
    }
}

/// Maps items through an ordered projection list, first match wins.
///
/// `project` takes `&mut self` because adaptive projectors update hit counters
/// and reorder their indexes. Share one projector between threads behind a lock,
/// or give each thread its own.
pub trait Projector: fmt::Debug + Send {
    /// Project `item` with the first projection that applies on `side` and matches.
    fn project(&mut self, item: &Item, side: Side) -> Option<Item>;
}

/// How a projector searches its projection list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum ProjectorStrategy {
    /// Linear scan.
    Simple,
    /// Buckets by first letter of each field's fixed prefix.
    FirstLetter,
    /// Radix tree over each field's fixed prefixes.
    #[default]
    PrefixTrie,
}

impl fmt::Display for ProjectorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Simple => "simple",
            Self::FirstLetter => "first_letter",
            Self::PrefixTrie => "prefix_trie",
        })
    }
}

impl FromStr for ProjectorStrategy {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "simple" => Ok(Self::Simple),
            "first_letter" => Ok(Self::FirstLetter),
            "prefix_trie" => Ok(Self::PrefixTrie),
            _ => Err(PatternError::InvalidConfig {
                message: format!(
                    "unknown projector strategy \"{s}\", expected simple, first_letter or prefix_trie"
                ),
            }),
        }
    }
}

/// Build a projector of the given strategy over `projections`.
///
/// `reorganize_interval` is ignored by [`ProjectorStrategy::Simple`].
#[must_use]
pub fn build_projector(
    strategy: ProjectorStrategy,
    projections: Arc<[Projection]>,
    reorganize_interval: usize,
) -> Box<dyn Projector> {
    match strategy {
        ProjectorStrategy::Simple => Box::new(SimpleProjector::new(projections)),
        ProjectorStrategy::FirstLetter => Box::new(SelfOptimizingProjector::first_letter(
            projections,
            reorganize_interval,
        )),
        ProjectorStrategy::PrefixTrie => Box::new(SelfOptimizingProjector::prefix_trie(
            projections,
            reorganize_interval,
        )),
    }
}

/// Number of field positions any projection addresses with a per-field matcher.
fn addressed_fields(projections: &[Projection]) -> usize {
    projections
        .iter()
        .map(|p| p.pattern().field_count())
        .max()
        .unwrap_or(0)
}
