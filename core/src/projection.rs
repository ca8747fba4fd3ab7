//! Projections: an item pattern plus a template that rewrites matching items.
//!
//! A projection abstracts a low-level item into a coarser one, e.g. every class
//! in `Acme.Billing.**` becomes the module `Billing`:
//!
//! ```
//! use std::sync::Arc;
//! use depmatch::{Item, ItemPatternOptions, ItemType, Projection, ProjectionSide, RegistryBuilder, Side, TargetTemplate};
//!
//! let class = Arc::new(ItemType::new("CLASS", ["NAMESPACE", "NAME"]));
//! let module = Arc::new(ItemType::new("MODULE", ["NAME"]));
//! let mut registry = RegistryBuilder::new().item_type(Arc::clone(&class)).build();
//!
//! let pattern = registry
//!     .compile_item_pattern("Acme.(*).**:*", &ItemPatternOptions::default().type_hint(Arc::clone(&class)))
//!     .unwrap();
//! let projection = Projection::new(pattern, TargetTemplate::parse(module, r"\1").unwrap(), ProjectionSide::Both);
//!
//! let item = Item::parse(class, "Acme.Billing.Model:Invoice");
//! assert_eq!(projection.apply(&item, Side::Left).unwrap().to_string(), "Billing");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::{Item, ItemPattern, ItemType, PatternError, Result, Side, FIELD_DELIMITER};

// ═══════════════════════════════════════════════════════════════════════════════
// Target template
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    /// 1-based group reference.
    Group(usize),
}

/// Rewrites captured groups into a target item.
///
/// Each target field is a template where `\1`..`\9` insert a captured group
/// (`""` if the match captured fewer) and `\\` inserts a backslash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTemplate {
    item_type: Arc<ItemType>,
    fields: Vec<Vec<Piece>>,
    text: String,
}

impl TargetTemplate {
    /// Build from one template string per target field.
    ///
    /// Fields beyond the given templates stay empty.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidTemplate`] for more templates than the type has
    /// fields, a dangling `\`, or an escape other than `\1`..`\9` and `\\`.
    pub fn new<I, S>(item_type: Arc<ItemType>, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw: Vec<String> = fields
            .into_iter()
            .map(|f| f.as_ref().to_string())
            .collect();
        let text = raw.join(&FIELD_DELIMITER.to_string());
        if raw.len() > item_type.len() {
            return Err(PatternError::InvalidTemplate {
                template: text,
                message: format!(
                    "{} fields given, but item type {} has {}",
                    raw.len(),
                    item_type.name(),
                    item_type.len()
                ),
            });
        }
        let fields = raw
            .iter()
            .map(|field| parse_field(field))
            .collect::<std::result::Result<Vec<_>, String>>()
            .map_err(|message| PatternError::InvalidTemplate {
                template: text.clone(),
                message,
            })?;
        Ok(Self {
            item_type,
            fields,
            text,
        })
    }

    /// Parse the `a:b:c` form.
    ///
    /// # Errors
    ///
    /// See [`TargetTemplate::new`].
    pub fn parse(item_type: Arc<ItemType>, text: &str) -> Result<Self> {
        Self::new(item_type, text.split(FIELD_DELIMITER))
    }

    /// The target item type.
    #[must_use]
    pub fn item_type(&self) -> &Arc<ItemType> {
        &self.item_type
    }

    /// Build the target item from captured groups.
    #[must_use]
    pub fn instantiate(&self, groups: &[String]) -> Item {
        let values = self.fields.iter().map(|pieces| {
            pieces.iter().fold(String::new(), |mut value, piece| {
                match piece {
                    Piece::Literal(text) => value.push_str(text),
                    Piece::Group(n) => {
                        value.push_str(groups.get(n - 1).map_or("", String::as_str));
                    }
                }
                value
            })
        });
        Item::new(Arc::clone(&self.item_type), values)
    }
}

impl fmt::Display for TargetTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn parse_field(field: &str) -> std::result::Result<Vec<Piece>, String> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = field.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            literal.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => literal.push('\\'),
            Some(d @ '1'..='9') => {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(Piece::Group(d as usize - '0' as usize));
            }
            Some(other) => return Err(format!("unsupported escape \\{other}")),
            None => return Err("dangling \\ at end of field".to_string()),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Projection
// ═══════════════════════════════════════════════════════════════════════════════

/// Which side(s) of a dependency a projection applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum ProjectionSide {
    /// Using items only.
    Left,
    /// Used items only.
    Right,
    /// Both sides.
    #[default]
    Both,
}

impl ProjectionSide {
    /// Does a projection declared for `self` apply on `side`?
    #[must_use]
    pub fn applies_to(self, side: Side) -> bool {
        matches!(
            (self, side),
            (Self::Both, _) | (Self::Left, Side::Left) | (Self::Right, Side::Right)
        )
    }
}

/// A compiled item pattern plus the template producing its target item.
#[derive(Debug, Clone)]
pub struct Projection {
    pattern: ItemPattern,
    target: TargetTemplate,
    side: ProjectionSide,
}

impl Projection {
    /// Create a projection.
    #[must_use]
    pub fn new(pattern: ItemPattern, target: TargetTemplate, side: ProjectionSide) -> Self {
        Self {
            pattern,
            target,
            side,
        }
    }

    /// The source pattern.
    #[must_use]
    pub fn pattern(&self) -> &ItemPattern {
        &self.pattern
    }

    /// The target template.
    #[must_use]
    pub fn target(&self) -> &TargetTemplate {
        &self.target
    }

    /// The sides this projection applies to.
    #[must_use]
    pub fn side(&self) -> ProjectionSide {
        self.side
    }

    /// Project `item` if this projection applies on `side` and its pattern matches.
    #[must_use]
    pub fn apply(&self, item: &Item, side: Side) -> Option<Item> {
        if !self.side.applies_to(side) {
            return None;
        }
        let result = self.pattern.matches(item, false, &[]);
        result
            .success
            .then(|| self.target.instantiate(&result.groups))
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ---> {}", self.pattern, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> Arc<ItemType> {
        Arc::new(ItemType::new("MODULE", ["NAME", "LAYER"]))
    }

    #[test]
    fn test_template_substitution() {
        let t = TargetTemplate::parse(module(), r"\1.\2:core").unwrap();
        let item = t.instantiate(&["Acme".into(), "Billing".into()]);
        assert_eq!(item.to_string(), "Acme.Billing:core");
        assert_eq!(item.item_type().name(), "MODULE");
    }

    #[test]
    fn test_missing_group_is_empty() {
        let t = TargetTemplate::parse(module(), r"x\3y").unwrap();
        assert_eq!(t.instantiate(&["a".into()]).value(0), "xy");
    }

    #[test]
    fn test_escaped_backslash() {
        let t = TargetTemplate::parse(module(), r"a\\b").unwrap();
        assert_eq!(t.instantiate(&[]).value(0), r"a\b");
    }

    #[test]
    fn test_template_errors() {
        for text in [r"\x", "a\\", "a:b:c"] {
            assert!(
                matches!(
                    TargetTemplate::parse(module(), text),
                    Err(PatternError::InvalidTemplate { .. })
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn test_side_applicability() {
        assert!(ProjectionSide::Both.applies_to(Side::Left));
        assert!(ProjectionSide::Both.applies_to(Side::Right));
        assert!(ProjectionSide::Left.applies_to(Side::Left));
        assert!(!ProjectionSide::Left.applies_to(Side::Right));
        assert!(!ProjectionSide::Right.applies_to(Side::Left));
    }
}
