//! `ItemPattern`: a field vector of matchers over one [`Item`]
//!
//! # Pattern forms
//!
//! ```text
//! [TYPE:]part:part:...          positional; `;` fills fields sharing a key
//! [TYPE:]KEY=seg:KEY.SUB=seg    named
//! token                         any-field: one part without metacharacters
//! ```
//!
//! Positional parts map onto the item type's fields in order. Where the type
//! declares consecutive fields sharing a key, the extra fields are filled from
//! `;`-separated subparts of the same part, or with an always-matcher when the
//! part has no more subparts. Fields nobody addresses accept anything.
//!
//! Captures flow left to right: a field may back-reference (`\k`) the external
//! groups followed by the groups captured by earlier fields of the same pattern.

use std::fmt;
use std::sync::Arc;

use crate::pattern::has_meta;
use crate::value_matcher::GROUP_FILLER;
use crate::{
    Item, ItemType, MatchResult, PatternError, PatternRegistry, Result, SegmentOptions,
    ValueMatcher, FIELD_DELIMITER, SUBFIELD_DELIMITER,
};

/// Separator between key and segment in a named part.
const NAMED_PART_SEPARATOR: char = '=';

/// Options for [`ItemPattern::compile`].
#[derive(Debug, Clone, Default)]
pub struct ItemPatternOptions {
    /// Item type to use when the pattern does not name one.
    pub type_hint: Option<Arc<ItemType>>,
    /// Number of captures from an earlier match available as `\1`..`\N`.
    pub external_groups: usize,
    /// Compare case-insensitively.
    pub ignore_case: bool,
}

impl ItemPatternOptions {
    /// Set the type hint.
    #[must_use]
    pub fn type_hint(mut self, item_type: Arc<ItemType>) -> Self {
        self.type_hint = Some(item_type);
        self
    }

    /// Set the number of external groups.
    #[must_use]
    pub fn external_groups(mut self, external_groups: usize) -> Self {
        self.external_groups = external_groups;
        self
    }

    /// Set case-insensitivity.
    #[must_use]
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }
}

#[derive(Debug, Clone)]
enum FieldVector {
    /// One matcher tried against every field value.
    AnyField(Arc<ValueMatcher>),
    /// One matcher per field of the target type.
    PerField(Vec<Arc<ValueMatcher>>),
}

/// A compiled item pattern.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use depmatch::{Item, ItemPattern, ItemPatternOptions, ItemType, RegistryBuilder};
///
/// let t = Arc::new(ItemType::new("DOTNET", ["NAMESPACE", "CLASS", "ASSEMBLY.NAME", "ASSEMBLY.VERSION"]));
/// let mut registry = RegistryBuilder::new().item_type(Arc::clone(&t)).build();
///
/// let p = ItemPattern::compile(&mut registry, "DOTNET:Acme.**:(*)Controller:Acme.Web", &ItemPatternOptions::default()).unwrap();
/// let r = p.matches(&Item::parse(t, "Acme.Web:OrderController:Acme.Web:2.1"), false, &[]);
/// assert!(r.success);
/// assert_eq!(r.groups, vec!["Order"]);
/// ```
#[derive(Debug, Clone)]
pub struct ItemPattern {
    text: String,
    item_type: Arc<ItemType>,
    fields: FieldVector,
    external_groups: usize,
    group_count: usize,
}

impl ItemPattern {
    /// Compile `text` against the registry's item types.
    ///
    /// # Errors
    ///
    /// - [`PatternError::UnknownItemType`] when no type is named and no hint is given
    /// - [`PatternError::MixedFieldStyles`] when named and positional parts are mixed
    /// - [`PatternError::UnknownField`] when a named part uses an unknown key
    /// - [`PatternError::TooManyFields`] when positional parts outnumber the fields
    /// - any segment compile error
    pub fn compile(
        registry: &mut PatternRegistry,
        text: &str,
        options: &ItemPatternOptions,
    ) -> Result<Self> {
        let mut parts: Vec<&str> = text.trim().split(FIELD_DELIMITER).collect();
        let item_type = resolve_type(registry, &mut parts, options)?;

        let mut builder = VectorBuilder {
            registry,
            options,
            groups: 0,
        };

        let any_field = match parts.as_slice() {
            [single] if !has_meta(single) => Some(*single),
            _ => None,
        };

        let fields = if parts.iter().any(|p| p.contains(NAMED_PART_SEPARATOR)) {
            FieldVector::PerField(builder.named(text, &parts, &item_type)?)
        } else if let Some(single) = any_field {
            FieldVector::AnyField(builder.segment(single)?)
        } else {
            FieldVector::PerField(builder.positional(text, &parts, &item_type)?)
        };

        let group_count = match &fields {
            FieldVector::AnyField(m) => m.group_count(),
            FieldVector::PerField(_) => builder.groups,
        };

        Ok(Self {
            text: text.to_string(),
            item_type,
            fields,
            external_groups: options.external_groups,
            group_count,
        })
    }

    /// Match `item`, with `external_groups` visible to back-references.
    ///
    /// An item whose type is incompatible with the pattern's target type fails
    /// regardless of `invert`. Otherwise `invert` flips `success` and keeps the
    /// groups collected so far.
    #[must_use]
    pub fn matches(&self, item: &Item, invert: bool, external_groups: &[String]) -> MatchResult {
        if !self.item_type.is_compatible(item.item_type()) {
            return MatchResult::miss();
        }

        match &self.fields {
            FieldVector::AnyField(matcher) => {
                let field_count = item.values().len().max(item.item_type().len());
                (0..field_count)
                    .map(|i| matcher.matches(item.value(i), external_groups))
                    .find(|r| r.success)
                    .unwrap_or_default()
                    .inverted(invert)
            }
            FieldVector::PerField(matchers) => {
                // Field i was compiled against exactly `external_groups` slots followed
                // by the groups of fields 0..i, so pad or cut the caller's groups.
                let mut groups: Vec<String> = (0..self.external_groups)
                    .map(|i| {
                        external_groups
                            .get(i)
                            .map_or_else(|| GROUP_FILLER.to_string(), Clone::clone)
                    })
                    .collect();
                for (i, matcher) in matchers.iter().enumerate() {
                    let r = matcher.matches(item.value(i), &groups);
                    if !r.success {
                        groups.drain(..self.external_groups);
                        return MatchResult {
                            success: false,
                            groups,
                        }
                        .inverted(invert);
                    }
                    groups.extend(r.groups);
                }
                groups.drain(..self.external_groups);
                MatchResult::hit(groups).inverted(invert)
            }
        }
    }

    /// Number of groups a successful match reports.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// The item type this pattern targets.
    #[must_use]
    pub fn item_type(&self) -> &Arc<ItemType> {
        &self.item_type
    }

    /// The pattern text as written.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Is this the any-field form?
    #[must_use]
    pub fn is_any_field(&self) -> bool {
        matches!(self.fields, FieldVector::AnyField(_))
    }

    /// Number of per-field matchers (0 for the any-field form).
    #[must_use]
    pub fn field_count(&self) -> usize {
        match &self.fields {
            FieldVector::AnyField(_) => 0,
            FieldVector::PerField(m) => m.len(),
        }
    }

    /// A literal every value accepted at `field` starts with.
    ///
    /// Empty for the any-field form, where any field may be the one that matched.
    #[must_use]
    pub fn known_fixed_prefix(&self, field: usize) -> &str {
        match &self.fields {
            FieldVector::AnyField(_) => "",
            FieldVector::PerField(m) => m.get(field).map_or("", |m| m.known_fixed_prefix()),
        }
    }

    /// Do both patterns target the same type with alike matchers?
    #[must_use]
    pub fn matches_alike(&self, other: &ItemPattern) -> bool {
        if self.item_type != other.item_type {
            return false;
        }
        match (&self.fields, &other.fields) {
            (FieldVector::AnyField(a), FieldVector::AnyField(b)) => a.matches_alike(b),
            (FieldVector::PerField(a), FieldVector::PerField(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches_alike(y))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ItemPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Compilation
// ═══════════════════════════════════════════════════════════════════════════════

/// Consume a leading type-name part and return the target type.
///
/// The leading part names a type only when more parts follow, so a lone token is
/// always a value pattern.
fn resolve_type(
    registry: &PatternRegistry,
    parts: &mut Vec<&str>,
    options: &ItemPatternOptions,
) -> Result<Arc<ItemType>> {
    if parts.len() > 1 {
        let head = parts[0].trim();
        let named = options
            .type_hint
            .as_ref()
            .filter(|hint| hint.name().eq_ignore_ascii_case(head))
            .or_else(|| registry.item_type(head))
            .cloned();
        if let Some(item_type) = named {
            parts.remove(0);
            return Ok(item_type);
        }
    }
    options
        .type_hint
        .clone()
        .ok_or_else(|| PatternError::UnknownItemType {
            name: String::new(),
            available: registry.type_names(),
        })
}

/// Compiles segments left to right, tracking how many groups earlier fields declared.
struct VectorBuilder<'r, 'o> {
    registry: &'r mut PatternRegistry,
    options: &'o ItemPatternOptions,
    groups: usize,
}

impl VectorBuilder<'_, '_> {
    fn segment(&mut self, segment: &str) -> Result<Arc<ValueMatcher>> {
        let options = SegmentOptions {
            external_groups: self.options.external_groups + self.groups,
            ignore_case: self.options.ignore_case,
        };
        let matcher = self.registry.compile_segment(segment, &options)?;
        self.groups += matcher.group_count();
        Ok(matcher)
    }

    fn any(&mut self) -> Result<Arc<ValueMatcher>> {
        self.registry.compile_segment("", &SegmentOptions::default())
    }

    fn named(
        &mut self,
        text: &str,
        parts: &[&str],
        item_type: &ItemType,
    ) -> Result<Vec<Arc<ValueMatcher>>> {
        let mut assigned: Vec<Option<&str>> = vec![None; item_type.len()];
        for part in parts.iter().filter(|p| !p.trim().is_empty()) {
            let Some((key, segment)) = part.split_once(NAMED_PART_SEPARATOR) else {
                return Err(PatternError::MixedFieldStyles {
                    pattern: text.to_string(),
                });
            };
            let index =
                item_type
                    .field_index(key)
                    .ok_or_else(|| PatternError::UnknownField {
                        pattern: text.to_string(),
                        key: key.trim().to_string(),
                        item_type: item_type.name().to_string(),
                    })?;
            assigned[index] = Some(segment);
        }

        assigned
            .into_iter()
            .map(|segment| match segment {
                Some(segment) => self.segment(segment),
                None => self.any(),
            })
            .collect()
    }

    fn positional(
        &mut self,
        text: &str,
        parts: &[&str],
        item_type: &ItemType,
    ) -> Result<Vec<Arc<ValueMatcher>>> {
        let too_many = || PatternError::TooManyFields {
            pattern: text.to_string(),
            item_type: item_type.name().to_string(),
            count: parts
                .iter()
                .map(|p| p.split(SUBFIELD_DELIMITER).count())
                .sum(),
            max: item_type.len(),
        };

        // Subparts map in order onto the fields. After each part, fields sharing
        // the previous field's key are filled without consuming input.
        let mut matchers = Vec::with_capacity(item_type.len());
        for part in parts {
            for sub in part.split(SUBFIELD_DELIMITER) {
                if matchers.len() >= item_type.len() {
                    return Err(too_many());
                }
                matchers.push(self.segment(sub)?);
            }
            while item_type.shares_key_with_previous(matchers.len()) {
                matchers.push(self.any()?);
            }
        }
        while matchers.len() < item_type.len() {
            matchers.push(self.any()?);
        }
        Ok(matchers)
    }
}
