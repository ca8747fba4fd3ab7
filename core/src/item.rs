//! `ItemType` and `Item`: the structured values patterns are matched against
//!
//! An item is an ordered list of string field values tagged with its type. The
//! type names each field by a key and an optional subkey, e.g.
//! `NAMESPACE`, `CLASS`, `ASSEMBLY.NAME`, `ASSEMBLY.VERSION`. Adjacent fields that
//! share a key (`ASSEMBLY.*` above) form one positional part in a pattern.

use crate::FIELD_DELIMITER;
use std::fmt;
use std::sync::Arc;

/// One field declaration of an [`ItemType`]: a key plus optional subkey.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    /// The field key, e.g. `ASSEMBLY`.
    pub key: String,
    /// The optional subkey, e.g. `VERSION`.
    pub subkey: Option<String>,
}

impl FieldKey {
    /// Parse `KEY` or `KEY.SUBKEY`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text.split_once('.') {
            Some((key, subkey)) => Self {
                key: key.trim().to_string(),
                subkey: Some(subkey.trim().to_string()),
            },
            None => Self {
                key: text.trim().to_string(),
                subkey: None,
            },
        }
    }

    /// Does this field answer to `name` (`KEY` or `KEY.SUBKEY`, case-insensitive)?
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        match name.split_once('.') {
            Some((key, subkey)) => {
                self.key.eq_ignore_ascii_case(key.trim())
                    && self
                        .subkey
                        .as_deref()
                        .is_some_and(|s| s.eq_ignore_ascii_case(subkey.trim()))
            }
            None => self.key.eq_ignore_ascii_case(name.trim()),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subkey {
            Some(subkey) => write!(f, "{}.{subkey}", self.key),
            None => f.write_str(&self.key),
        }
    }
}

/// The shape of an [`Item`]: a name and an ordered list of field keys.
///
/// # Example
///
/// ```
/// use depmatch::ItemType;
///
/// let t = ItemType::new("DOTNET", ["NAMESPACE", "CLASS", "ASSEMBLY.NAME", "ASSEMBLY.VERSION"]);
/// assert_eq!(t.field_index("class"), Some(1));
/// assert_eq!(t.field_index("ASSEMBLY.VERSION"), Some(3));
/// assert!(t.shares_key_with_previous(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemType {
    name: String,
    fields: Vec<FieldKey>,
}

impl ItemType {
    /// Create an item type from field declarations (`KEY` or `KEY.SUBKEY`).
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|f| FieldKey::parse(f.as_ref()))
                .collect(),
        }
    }

    /// The type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field declarations, in order.
    #[must_use]
    pub fn fields(&self) -> &[FieldKey] {
        &self.fields
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the type declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolve `KEY` or `KEY.SUBKEY` to a field index.
    ///
    /// A bare `KEY` resolves to the first field carrying that key.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.answers_to(name))
    }

    /// Does field `index` carry the same key as field `index - 1`?
    #[must_use]
    pub fn shares_key_with_previous(&self, index: usize) -> bool {
        index > 0
            && index < self.fields.len()
            && self.fields[index].key == self.fields[index - 1].key
    }

    /// Is an item of type `other` matchable by a pattern targeting `self`?
    ///
    /// True for identical types, and for a supertype/subtype pair where one field
    /// list is a prefix of the other.
    #[must_use]
    pub fn is_compatible(&self, other: &ItemType) -> bool {
        if self == other {
            return true;
        }
        let shared = self.fields.len().min(other.fields.len());
        shared > 0 && self.fields[..shared] == other.fields[..shared]
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "{FIELD_DELIMITER}")?;
            }
            write!(f, "{field}")?;
        }
        f.write_str(")")
    }
}

/// A structured value: an item type plus its field values.
///
/// `values` may be shorter than the type's field list; missing fields read as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    item_type: Arc<ItemType>,
    values: Vec<String>,
}

impl Item {
    /// Create an item from its type and values.
    pub fn new<I, S>(item_type: Arc<ItemType>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            item_type,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the `a:b:c` form of an item.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use depmatch::{Item, ItemType};
    ///
    /// let t = Arc::new(ItemType::new("CLASS", ["NAMESPACE", "NAME"]));
    /// let item = Item::parse(t, "Acme.Billing:Invoice");
    /// assert_eq!(item.value(1), "Invoice");
    /// assert_eq!(item.value(7), "");
    /// ```
    #[must_use]
    pub fn parse(item_type: Arc<ItemType>, text: &str) -> Self {
        Self::new(item_type, text.split(FIELD_DELIMITER))
    }

    /// The item's type.
    #[must_use]
    pub fn item_type(&self) -> &Arc<ItemType> {
        &self.item_type
    }

    /// The stored values (possibly fewer than the type declares).
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The value of field `index`, or `""` past the end.
    #[must_use]
    pub fn value(&self, index: usize) -> &str {
        self.values.get(index).map_or("", String::as_str)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, "{FIELD_DELIMITER}")?;
            }
            f.write_str(value)?;
        }
        Ok(())
    }
}
