//! Config types for projection sets.
//!
//! These types are serde-deserializable (JSON or YAML) and load into a ready
//! [`ProjectionSet`] via [`PatternRegistry::load_projection_set`].
//!
//! ```yaml
//! item_types:
//!   - name: CLASS
//!     fields: [NAMESPACE, NAME]
//!   - name: MODULE
//!     fields: [NAME]
//! source_type: CLASS
//! target_type: MODULE
//! strategy: prefix_trie
//! projections:
//!   - pattern: "Acme.(*).**:*"
//!     target: '\1'
//!   - pattern: "**:*"
//!     target: external
//!     side: right
//! ```

use std::sync::Arc;

use serde::Deserialize;

use crate::projector::DEFAULT_REORGANIZE_INTERVAL;
use crate::{
    build_projector, Item, ItemPattern, ItemPatternOptions, ItemType, PatternError,
    PatternRegistry, Projection, ProjectionSide, Projector, ProjectorStrategy, Result, Side,
    TargetTemplate,
};

/// Configuration for an [`ItemType`].
#[derive(Debug, Clone, Deserialize)]
pub struct ItemTypeConfig {
    /// Type name.
    pub name: String,
    /// Field declarations, `KEY` or `KEY.SUBKEY`.
    pub fields: Vec<String>,
}

impl ItemTypeConfig {
    /// Build the item type.
    #[must_use]
    pub fn build(&self) -> Arc<ItemType> {
        Arc::new(ItemType::new(self.name.clone(), &self.fields))
    }
}

/// Configuration for one [`Projection`].
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectionConfig {
    /// Item pattern over the source type.
    pub pattern: String,
    /// Target template, `:`-separated per target field.
    pub target: String,
    /// Sides the projection applies to.
    #[serde(default)]
    pub side: ProjectionSide,
}

/// Configuration for a [`ProjectionSet`].
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectionSetConfig {
    /// Item types to register before compiling.
    #[serde(default)]
    pub item_types: Vec<ItemTypeConfig>,
    /// Type of the items being projected (the type hint for every pattern).
    pub source_type: String,
    /// Type of the projected items.
    pub target_type: String,
    /// Compare case-insensitively.
    #[serde(default)]
    pub ignore_case: bool,
    /// Projector strategy.
    #[serde(default)]
    pub strategy: ProjectorStrategy,
    /// Calls between reorganizations of adaptive projectors.
    #[serde(default = "default_reorganize_interval")]
    pub reorganize_interval: usize,
    /// Projections, first match wins.
    pub projections: Vec<ProjectionConfig>,
}

fn default_reorganize_interval() -> usize {
    DEFAULT_REORGANIZE_INTERVAL
}

/// A compiled projection list with its projector.
#[derive(Debug)]
pub struct ProjectionSet {
    source_type: Arc<ItemType>,
    target_type: Arc<ItemType>,
    strategy: ProjectorStrategy,
    projections: Arc<[Projection]>,
    projector: Box<dyn Projector>,
}

impl ProjectionSet {
    /// Project `item` (first match wins).
    pub fn project(&mut self, item: &Item, side: Side) -> Option<Item> {
        self.projector.project(item, side)
    }

    /// Parse `text` as an item of the source type.
    #[must_use]
    pub fn parse_item(&self, text: &str) -> Item {
        Item::parse(Arc::clone(&self.source_type), text)
    }

    /// The source item type.
    #[must_use]
    pub fn source_type(&self) -> &Arc<ItemType> {
        &self.source_type
    }

    /// The target item type.
    #[must_use]
    pub fn target_type(&self) -> &Arc<ItemType> {
        &self.target_type
    }

    /// The projector strategy in use.
    #[must_use]
    pub fn strategy(&self) -> ProjectorStrategy {
        self.strategy
    }

    /// The compiled projections, in declaration order.
    #[must_use]
    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    /// Number of projections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projections.len()
    }

    /// Returns `true` if there are no projections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projections.is_empty()
    }
}

impl PatternRegistry {
    /// Register the config's item types, compile every projection and build the
    /// requested projector.
    ///
    /// # Errors
    ///
    /// - [`PatternError::UnknownItemType`] if the source or target type is unknown
    /// - any pattern or template error, naming the offending text
    pub fn load_projection_set(&mut self, config: ProjectionSetConfig) -> Result<ProjectionSet> {
        for item_type in &config.item_types {
            self.register_type(item_type.build());
        }

        let source_type = self.resolve(&config.source_type)?;
        let target_type = self.resolve(&config.target_type)?;
        let options = ItemPatternOptions::default()
            .type_hint(Arc::clone(&source_type))
            .ignore_case(config.ignore_case);

        let projections = config
            .projections
            .iter()
            .map(|p| {
                let pattern = ItemPattern::compile(self, &p.pattern, &options)?;
                let target = TargetTemplate::parse(Arc::clone(&target_type), &p.target)?;
                Ok(Projection::new(pattern, target, p.side))
            })
            .collect::<Result<Arc<[Projection]>>>()?;

        tracing::debug!(
            source = source_type.name(),
            target = target_type.name(),
            projections = projections.len(),
            strategy = %config.strategy,
            "loaded projection set"
        );

        Ok(ProjectionSet {
            projector: build_projector(
                config.strategy,
                Arc::clone(&projections),
                config.reorganize_interval,
            ),
            source_type,
            target_type,
            strategy: config.strategy,
            projections,
        })
    }

    fn resolve(&self, name: &str) -> Result<Arc<ItemType>> {
        self.item_type(name)
            .cloned()
            .ok_or_else(|| PatternError::UnknownItemType {
                name: name.to_string(),
                available: self.type_names(),
            })
    }
}
