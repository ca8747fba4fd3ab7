//! Compilation context: registered item types plus a compiled-segment cache.
//!
//! A [`PatternRegistry`] is owned by whoever compiles a rule set or projection
//! list, and is passed by `&mut` to every compile call. Identical segments
//! compiled with identical options share one [`ValueMatcher`] (and its memo).
//! Dropping the registry drops the cache; matchers already handed out stay
//! alive through their `Arc`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use depmatch::{ItemType, RegistryBuilder, SegmentOptions};
//!
//! let mut registry = RegistryBuilder::new()
//!     .item_type(Arc::new(ItemType::new("CLASS", ["NAMESPACE", "NAME"])))
//!     .build();
//!
//! let a = registry.compile_segment("Acme.**", &SegmentOptions::default()).unwrap();
//! let b = registry.compile_segment("Acme.**", &SegmentOptions::default()).unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! assert_eq!(registry.cached_segments(), 1);
//! assert!(registry.item_type("class").is_some());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    pattern, DependencyPattern, ItemPattern, ItemPatternOptions, ItemType, Result, SegmentOptions,
    ValueMatcher,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for [`PatternRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: Vec<Arc<ItemType>>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item type. A later type with the same name replaces an earlier one.
    #[must_use]
    pub fn item_type(mut self, item_type: Arc<ItemType>) -> Self {
        self.types.push(item_type);
        self
    }

    /// Build the registry.
    #[must_use]
    pub fn build(self) -> PatternRegistry {
        let mut registry = PatternRegistry {
            types: Vec::new(),
            segments: HashMap::new(),
        };
        for item_type in self.types {
            registry.register_type(item_type);
        }
        registry
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SegmentKey {
    segment: String,
    external_groups: usize,
    ignore_case: bool,
}

/// Registered item types and the compiled-segment cache of one compilation context.
#[derive(Debug)]
pub struct PatternRegistry {
    types: Vec<Arc<ItemType>>,
    segments: HashMap<SegmentKey, Arc<ValueMatcher>>,
}

impl PatternRegistry {
    /// Look up an item type by name (case-insensitive).
    #[must_use]
    pub fn item_type(&self, name: &str) -> Option<&Arc<ItemType>> {
        let name = name.trim();
        self.types
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// Registered type names, in registration order.
    #[must_use]
    pub fn type_names(&self) -> Vec<String> {
        self.types.iter().map(|t| t.name().to_string()).collect()
    }

    /// Register an item type, returning the one it replaced (same name).
    pub fn register_type(&mut self, item_type: Arc<ItemType>) -> Option<Arc<ItemType>> {
        match self
            .types
            .iter_mut()
            .find(|t| t.name().eq_ignore_ascii_case(item_type.name()))
        {
            Some(slot) => Some(std::mem::replace(slot, item_type)),
            None => {
                self.types.push(item_type);
                None
            }
        }
    }

    /// Compile a segment, or return the cached matcher for the same text and options.
    ///
    /// # Errors
    ///
    /// Whatever [`compile_segment`](crate::compile_segment) returns. Failures are
    /// not cached.
    pub fn compile_segment(
        &mut self,
        segment: &str,
        options: &SegmentOptions,
    ) -> Result<Arc<ValueMatcher>> {
        let key = SegmentKey {
            segment: segment.to_string(),
            external_groups: options.external_groups,
            ignore_case: options.ignore_case,
        };
        if let Some(matcher) = self.segments.get(&key) {
            return Ok(Arc::clone(matcher));
        }
        let matcher = Arc::new(pattern::compile_segment(segment, options)?);
        self.segments.insert(key, Arc::clone(&matcher));
        Ok(matcher)
    }

    /// Compile an item pattern against this registry's types and cache.
    ///
    /// # Errors
    ///
    /// See [`ItemPattern::compile`].
    pub fn compile_item_pattern(
        &mut self,
        text: &str,
        options: &ItemPatternOptions,
    ) -> Result<ItemPattern> {
        ItemPattern::compile(self, text, options)
    }

    /// Compile a dependency pattern.
    ///
    /// # Errors
    ///
    /// See [`DependencyPattern::compile`].
    pub fn compile_dependency_pattern(
        &mut self,
        using: &str,
        used: &str,
        options: &ItemPatternOptions,
    ) -> Result<DependencyPattern> {
        DependencyPattern::compile(self, using, used, options)
    }

    /// Number of distinct compiled segments held.
    #[must_use]
    pub fn cached_segments(&self) -> usize {
        self.segments.len()
    }

    /// Drop all cached segments.
    pub fn clear_cache(&mut self) {
        self.segments.clear();
    }
}
