//! depmatch - wildcard pattern matching for architecture conformance checks
//!
//! Compiles user-authored wildcard patterns once and applies them to millions of
//! "X uses Y" facts extracted from compiled code.
//!
//! # Architecture
//!
//! Leaves first:
//!
//! - [`compile_segment`]: one wildcard/regex-hybrid segment → [`ValueMatcher`]
//! - [`ValueMatcher`]: closed matcher family (always, empty, equals, starts-with,
//!   ends-with, contains, regex), each reporting a sound fixed prefix/suffix
//! - [`ItemPattern`]: per-field (or any-field) vector of matchers over an [`Item`]
//! - [`DependencyPattern`]: using/used item patterns plus marker and count filters;
//!   captures of the using item flow into the used pattern as back-references
//! - [`Projector`]: first-match-wins application of an ordered [`Projection`] list,
//!   either by linear scan ([`SimpleProjector`]) or by a self-reorganizing index
//!   ([`SelfOptimizingProjector`]) that always returns what the linear scan returns
//!
//! # Key Design Insights
//!
//! 1. **Compile once**: wildcard expansion depends on neighboring characters, so it is
//!    resolved into an anchored regex at compile time, never per value.
//!
//! 2. **Back-references across items**: a used-item pattern is compiled with a synthetic
//!    block of `N` leading groups. At match time the using item's captures are joined
//!    with `#` in front of the value, so `\1` in the used pattern refers to them.
//!
//! 3. **Sound filters**: [`ValueMatcher::known_fixed_prefix`] is a true prefix of every
//!    accepted value. Projector indexes only use it to pick which candidate list is
//!    scanned; every list is a superset of the projections that could match.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use depmatch::prelude::*;
//!
//! let class = Arc::new(ItemType::new("CLASS", ["NAMESPACE", "NAME"]));
//! let mut registry = RegistryBuilder::new().item_type(Arc::clone(&class)).build();
//!
//! let pattern = ItemPattern::compile(
//!     &mut registry,
//!     "Acme.**:*Service",
//!     &ItemPatternOptions::default().type_hint(Arc::clone(&class)),
//! )
//! .unwrap();
//!
//! let item = Item::new(Arc::clone(&class), ["Acme.Billing", "InvoiceService"]);
//! assert!(pattern.matches(&item, false, &[]).success);
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod dependency;
mod item;
mod item_pattern;
mod memo;
mod pattern;
mod prefix_tree;
mod projection;
mod projector;
mod registry;
mod value_matcher;

#[cfg(feature = "config")]
mod config;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Items
pub use item::{FieldKey, Item, ItemType};

// Matchers
pub use pattern::{compile_segment, SegmentOptions};
pub use value_matcher::{MatchResult, MatcherKind, RegexMatcher, ValueMatcher};

// Item and dependency patterns
pub use dependency::{CountConstraint, CountField, Dependency, DependencyPattern, MarkerPattern};
pub use item_pattern::{ItemPattern, ItemPatternOptions};

// Projections
pub use prefix_tree::PrefixTree;
pub use projection::{Projection, ProjectionSide, TargetTemplate};
pub use projector::{
    build_projector, Projector, ProjectorStats, ProjectorStrategy, SelfOptimizingProjector,
    Side, SimpleProjector, DEFAULT_DECAY, DEFAULT_REORGANIZE_INTERVAL,
};

// Registry
pub use registry::{PatternRegistry, RegistryBuilder};

// Config (feature-gated)
#[cfg(feature = "config")]
pub use config::{ItemTypeConfig, ProjectionConfig, ProjectionSet, ProjectionSetConfig};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use depmatch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Compiler
        compile_segment,
        // Dependencies
        Dependency,
        DependencyPattern,
        // Items
        Item,
        ItemPattern,
        ItemPatternOptions,
        ItemType,
        MarkerPattern,
        MatchResult,
        // Registry
        PatternRegistry,
        // Projections
        Projection,
        ProjectionSide,
        Projector,
        ProjectorStrategy,
        RegistryBuilder,
        Result,
        SegmentOptions,
        SelfOptimizingProjector,
        Side,
        SimpleProjector,
        TargetTemplate,
        ValueMatcher,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Delimiter between the fields of an item pattern or an item's textual form.
pub const FIELD_DELIMITER: char = ':';

/// Delimiter between subfields that share one key inside a positional part.
pub const SUBFIELD_DELIMITER: char = ';';

/// Separator placed between injected back-reference groups and the subject value.
///
/// Values that themselves contain this character give undefined back-reference
/// results.
pub const GROUP_SEPARATOR: char = '#';

/// Maximum length for non-regex segments (equals, starts-with, ends-with, contains).
pub const MAX_PATTERN_LENGTH: usize = 8192;

/// Maximum length for segments that compile to a regex.
///
/// Shorter than [`MAX_PATTERN_LENGTH`] because regex compile cost scales faster
/// than literal matching.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4096;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from pattern compilation and configuration loading.
///
/// All of these surface before the first match. Matching itself never fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// The regex generated for a segment did not compile.
    #[error("invalid pattern \"{pattern}\": {message}")]
    InvalidPattern {
        /// The user-written segment.
        pattern: String,
        /// The underlying regex error message.
        message: String,
    },

    /// Named (`key=value`) and positional parts were mixed in one item pattern.
    #[error("pattern \"{pattern}\" mixes named (key=value) and positional fields")]
    MixedFieldStyles {
        /// The offending item pattern.
        pattern: String,
    },

    /// A named part used a key the item type does not declare.
    #[error("pattern \"{pattern}\" references unknown field \"{key}\" of item type {item_type}")]
    UnknownField {
        /// The offending item pattern.
        pattern: String,
        /// The unknown key.
        key: String,
        /// Name of the item type that was searched.
        item_type: String,
    },

    /// A positional pattern addresses more fields than the item type has.
    #[error("pattern \"{pattern}\" addresses {count} fields, but item type {item_type} has {max}")]
    TooManyFields {
        /// The offending item pattern.
        pattern: String,
        /// Name of the item type.
        item_type: String,
        /// Number of fields addressed.
        count: usize,
        /// Number of fields declared by the item type.
        max: usize,
    },

    /// No type hint was given and the pattern did not name a registered item type.
    #[error("{}", unknown_item_type_message(.name, .available))]
    UnknownItemType {
        /// The name that was looked up (empty when the pattern named no type).
        name: String,
        /// Registered item type names.
        available: Vec<String>,
    },

    /// A segment exceeds the maximum allowed length.
    #[error("pattern length is {len}, but maximum allowed is {max}")]
    PatternTooLong {
        /// Actual length of the segment.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// A marker pattern term is malformed.
    #[error("invalid marker term \"{text}\"")]
    InvalidMarker {
        /// The offending term.
        text: String,
    },

    /// A count constraint is malformed.
    #[error("invalid count constraint \"{text}\", expected e.g. \"bad_ct>0\"")]
    InvalidCount {
        /// The offending constraint text.
        text: String,
    },

    /// A projection target template is malformed.
    #[error("invalid target template \"{template}\": {message}")]
    InvalidTemplate {
        /// The offending template.
        template: String,
        /// What is wrong with it.
        message: String,
    },

    /// Configuration deserialization or construction failed.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// The underlying error message.
        message: String,
    },
}

fn unknown_item_type_message(name: &str, available: &[String]) -> String {
    let mut msg = if name.is_empty() {
        "pattern names no item type and no type hint was given".to_string()
    } else {
        format!("unknown item type \"{name}\"")
    };
    if available.is_empty() {
        msg.push_str("; no item types are registered");
    } else {
        msg.push_str("; registered: ");
        msg.push_str(&available.join(", "));
    }
    msg
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PatternError>;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::{
        ItemPattern, ItemPatternOptions, ItemType, Projection, ProjectionSide, RegistryBuilder,
        TargetTemplate,
    };

    pub(crate) fn class() -> Arc<ItemType> {
        Arc::new(ItemType::new("CLASS", ["NAMESPACE", "NAME"]))
    }

    /// Projections over CLASS items whose target is a CLASS with the template in field 0.
    pub(crate) fn projections(rules: &[(&str, &str)]) -> Arc<[Projection]> {
        let mut registry = RegistryBuilder::new().item_type(class()).build();
        let options = ItemPatternOptions::default().type_hint(class());
        rules
            .iter()
            .map(|(pattern, target)| {
                Projection::new(
                    ItemPattern::compile(&mut registry, pattern, &options).unwrap(),
                    TargetTemplate::parse(class(), target).unwrap(),
                    ProjectionSide::Both,
                )
            })
            .collect()
    }
}
