//! Dependency patterns: a using/used item pattern pair plus marker and count filters.
//!
//! The used-item pattern is compiled with one synthetic back-reference slot per
//! group of the using-item pattern, so `\1` in the used pattern refers to the
//! first capture of the using item:
//!
//! ```
//! use std::sync::Arc;
//! use depmatch::{Dependency, Item, ItemPatternOptions, ItemType, RegistryBuilder};
//!
//! let t = Arc::new(ItemType::new("CLASS", ["NAMESPACE", "NAME"]));
//! let mut registry = RegistryBuilder::new().item_type(Arc::clone(&t)).build();
//! let options = ItemPatternOptions::default().type_hint(Arc::clone(&t));
//!
//! // Anything in a module may use its own Util namespace.
//! let p = registry.compile_dependency_pattern("(*).**:*", r"\1.Util:*", &options).unwrap();
//!
//! let own = Dependency::new(Item::parse(Arc::clone(&t), "Billing.Core:Invoice"), Item::parse(Arc::clone(&t), "Billing.Util:Money"));
//! let foreign = Dependency::new(Item::parse(Arc::clone(&t), "Billing.Core:Invoice"), Item::parse(Arc::clone(&t), "Shipping.Util:Money"));
//! assert!(p.matches(&own, &[]).success);
//! assert!(!p.matches(&foreign, &[]).success);
//! ```

use std::collections::BTreeSet;
use std::fmt;

use crate::value_matcher::GROUP_FILLER;
use crate::{Item, ItemPattern, ItemPatternOptions, MatchResult, PatternError, PatternRegistry, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// Dependency
// ═══════════════════════════════════════════════════════════════════════════════

/// A "using item uses used item" fact with its markers and counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// The item that has the dependency.
    pub using: Item,
    /// The item depended upon.
    pub used: Item,
    /// Free-form tags attached by the extractor or earlier transforms.
    pub markers: BTreeSet<String>,
    /// Number of underlying usages.
    pub ct: u64,
    /// How many of them were classified questionable.
    pub questionable_ct: u64,
    /// How many of them were classified bad.
    pub bad_ct: u64,
}

impl Dependency {
    /// A single-usage dependency without markers.
    #[must_use]
    pub fn new(using: Item, used: Item) -> Self {
        Self {
            using,
            used,
            markers: BTreeSet::new(),
            ct: 1,
            questionable_ct: 0,
            bad_ct: 0,
        }
    }

    /// Add a marker.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.insert(marker.into());
        self
    }

    /// Set the counters.
    #[must_use]
    pub fn with_counts(mut self, ct: u64, questionable_ct: u64, bad_ct: u64) -> Self {
        self.ct = ct;
        self.questionable_ct = questionable_ct;
        self.bad_ct = bad_ct;
        self
    }

    fn count(&self, field: CountField) -> u64 {
        match field {
            CountField::Ct => self.ct,
            CountField::QuestionableCt => self.questionable_ct,
            CountField::BadCt => self.bad_ct,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.using, self.used)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Markers
// ═══════════════════════════════════════════════════════════════════════════════

/// Required and forbidden markers.
///
/// Parsed from whitespace- or comma-separated terms: `+name` or `name` must be
/// present, `-name` must be absent.
///
/// ```
/// use std::collections::BTreeSet;
/// use depmatch::MarkerPattern;
///
/// let p = MarkerPattern::parse("+inherits, -test").unwrap();
/// let markers: BTreeSet<String> = ["inherits".to_string()].into();
/// assert!(p.matches(&markers));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerPattern {
    present: Vec<String>,
    absent: Vec<String>,
}

impl MarkerPattern {
    /// Parse marker terms.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidMarker`] for a term without a name.
    pub fn parse(text: &str) -> Result<Self> {
        let mut pattern = Self::default();
        for term in text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let (required, name) = match term.as_bytes()[0] {
                b'+' => (true, &term[1..]),
                b'-' => (false, &term[1..]),
                _ => (true, term),
            };
            if name.is_empty() || name.starts_with(['+', '-']) {
                return Err(PatternError::InvalidMarker {
                    text: term.to_string(),
                });
            }
            if required {
                pattern.present.push(name.to_string());
            } else {
                pattern.absent.push(name.to_string());
            }
        }
        Ok(pattern)
    }

    /// Are all required markers present and all forbidden ones absent?
    #[must_use]
    pub fn matches(&self, markers: &BTreeSet<String>) -> bool {
        self.present.iter().all(|m| markers.contains(m))
            && !self.absent.iter().any(|m| markers.contains(m))
    }

    /// Returns `true` if the pattern constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present.is_empty() && self.absent.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Counts
// ═══════════════════════════════════════════════════════════════════════════════

/// Which counter of a [`Dependency`] a [`CountConstraint`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountField {
    /// `ct`
    Ct,
    /// `questionable_ct`
    QuestionableCt,
    /// `bad_ct`
    BadCt,
}

impl fmt::Display for CountField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ct => "ct",
            Self::QuestionableCt => "questionable_ct",
            Self::BadCt => "bad_ct",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    /// Longest operators first, so `<=` is not read as `<`.
    const ALL: [(&'static str, Comparison); 7] = [
        ("==", Self::Eq),
        ("!=", Self::Ne),
        ("<=", Self::Le),
        (">=", Self::Ge),
        ("=", Self::Eq),
        ("<", Self::Lt),
        (">", Self::Gt),
    ];

    fn holds(self, left: u64, right: u64) -> bool {
        match self {
            Self::Eq => left == right,
            Self::Ne => left != right,
            Self::Lt => left < right,
            Self::Le => left <= right,
            Self::Gt => left > right,
            Self::Ge => left >= right,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A numeric filter on one dependency counter, e.g. `bad_ct>0`.
///
/// ```
/// use depmatch::CountConstraint;
///
/// let c = CountConstraint::parse("bad_ct >= 2").unwrap();
/// assert_eq!(c.to_string(), "bad_ct>=2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountConstraint {
    field: CountField,
    comparison: Comparison,
    value: u64,
}

impl CountConstraint {
    /// Parse `field op value`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidCount`] for an unknown field, a missing
    /// operator or a value that is not an unsigned integer.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || PatternError::InvalidCount {
            text: text.to_string(),
        };
        let trimmed = text.trim();
        let (at, symbol, comparison) = Comparison::ALL
            .iter()
            .filter_map(|&(symbol, comparison)| {
                trimmed.find(symbol).map(|at| (at, symbol, comparison))
            })
            .min_by_key(|&(at, symbol, _)| (at, std::cmp::Reverse(symbol.len())))
            .ok_or_else(invalid)?;

        let field = match trimmed[..at].trim().to_ascii_lowercase().as_str() {
            "ct" => CountField::Ct,
            "questionable_ct" => CountField::QuestionableCt,
            "bad_ct" => CountField::BadCt,
            _ => return Err(invalid()),
        };
        let value = trimmed[at + symbol.len()..]
            .trim()
            .parse()
            .map_err(|_| invalid())?;

        Ok(Self {
            field,
            comparison,
            value,
        })
    }

    /// The counter this constraint reads.
    #[must_use]
    pub fn field(&self) -> CountField {
        self.field
    }

    /// Does `dependency` satisfy the constraint?
    #[must_use]
    pub fn holds(&self, dependency: &Dependency) -> bool {
        self.comparison
            .holds(dependency.count(self.field), self.value)
    }
}

impl fmt::Display for CountConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.comparison.symbol(), self.value)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DependencyPattern
// ═══════════════════════════════════════════════════════════════════════════════

/// A compiled using/used pattern pair with optional marker and count filters.
#[derive(Debug, Clone)]
pub struct DependencyPattern {
    using: ItemPattern,
    used: ItemPattern,
    markers: MarkerPattern,
    counts: Vec<CountConstraint>,
    external_groups: usize,
}

impl DependencyPattern {
    /// Compile both item patterns. The used pattern sees the using pattern's groups
    /// as back-references `\1`..`\N`, after any external groups in `options`.
    ///
    /// # Errors
    ///
    /// Any error from [`ItemPattern::compile`].
    pub fn compile(
        registry: &mut PatternRegistry,
        using: &str,
        used: &str,
        options: &ItemPatternOptions,
    ) -> Result<Self> {
        let using = ItemPattern::compile(registry, using, options)?;
        let used_options = options
            .clone()
            .external_groups(options.external_groups + using.group_count());
        let used = ItemPattern::compile(registry, used, &used_options)?;
        Ok(Self {
            using,
            used,
            markers: MarkerPattern::default(),
            counts: Vec::new(),
            external_groups: options.external_groups,
        })
    }

    /// Require markers.
    #[must_use]
    pub fn with_markers(mut self, markers: MarkerPattern) -> Self {
        self.markers = markers;
        self
    }

    /// Add a count constraint. All constraints must hold.
    #[must_use]
    pub fn with_count(mut self, constraint: CountConstraint) -> Self {
        self.counts.push(constraint);
        self
    }

    /// The using-item pattern.
    #[must_use]
    pub fn using(&self) -> &ItemPattern {
        &self.using
    }

    /// The used-item pattern.
    #[must_use]
    pub fn used(&self) -> &ItemPattern {
        &self.used
    }

    /// Match a dependency.
    ///
    /// Counters and markers are checked first. Both item patterns see
    /// `external_groups` as their leading back-references; the used pattern
    /// additionally sees the using item's captures right after them. On success
    /// the groups are the using item's captures followed by the used item's.
    #[must_use]
    pub fn matches(&self, dependency: &Dependency, external_groups: &[String]) -> MatchResult {
        if !self.counts.iter().all(|c| c.holds(dependency))
            || !self.markers.matches(&dependency.markers)
        {
            return MatchResult::miss();
        }

        let using = self.using.matches(&dependency.using, false, external_groups);
        if !using.success {
            return MatchResult::miss();
        }

        let mut visible: Vec<String> = (0..self.external_groups)
            .map(|i| {
                external_groups
                    .get(i)
                    .map_or_else(|| GROUP_FILLER.to_string(), Clone::clone)
            })
            .collect();
        visible.extend(using.groups.iter().cloned());
        let used = self.used.matches(&dependency.used, false, &visible);
        if !used.success {
            return MatchResult::miss();
        }

        let mut groups = using.groups;
        groups.extend(used.groups);
        MatchResult::hit(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ItemType, RegistryBuilder};
    use std::sync::Arc;

    fn class() -> Arc<ItemType> {
        Arc::new(ItemType::new("CLASS", ["NAMESPACE", "NAME"]))
    }

    fn dep(using: &str, used: &str) -> Dependency {
        Dependency::new(Item::parse(class(), using), Item::parse(class(), used))
    }

    fn compile(using: &str, used: &str) -> DependencyPattern {
        let t = class();
        let mut registry = RegistryBuilder::new().item_type(Arc::clone(&t)).build();
        DependencyPattern::compile(
            &mut registry,
            using,
            used,
            &ItemPatternOptions::default().type_hint(t),
        )
        .unwrap()
    }

    #[test]
    fn test_marker_parse() {
        let p = MarkerPattern::parse("inherits +virtual, -test").unwrap();
        assert_eq!(p.present, vec!["inherits", "virtual"]);
        assert_eq!(p.absent, vec!["test"]);
        assert!(MarkerPattern::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_marker_parse_rejects_bare_sign() {
        assert!(matches!(
            MarkerPattern::parse("+ok -"),
            Err(PatternError::InvalidMarker { ref text }) if text == "-"
        ));
        assert!(MarkerPattern::parse("--x").is_err());
    }

    #[test]
    fn test_marker_matching() {
        let p = MarkerPattern::parse("+a -b").unwrap();
        let set = |items: &[&str]| items.iter().map(ToString::to_string).collect::<BTreeSet<_>>();
        assert!(p.matches(&set(&["a"])));
        assert!(p.matches(&set(&["a", "c"])));
        assert!(!p.matches(&set(&["a", "b"])));
        assert!(!p.matches(&set(&[])));
    }

    #[test]
    fn test_count_parse() {
        let c = CountConstraint::parse("bad_ct>0").unwrap();
        assert_eq!(c.field(), CountField::BadCt);
        assert_eq!(c.to_string(), "bad_ct>0");
        assert_eq!(
            CountConstraint::parse(" questionable_ct <= 3 ").unwrap().to_string(),
            "questionable_ct<=3"
        );
        assert_eq!(CountConstraint::parse("ct==1").unwrap().to_string(), "ct=1");
        assert_eq!(CountConstraint::parse("ct!=1").unwrap().to_string(), "ct!=1");
    }

    #[test]
    fn test_count_parse_errors() {
        for text in ["bad_ct", "size>1", "ct>-1", "ct>x", ">1"] {
            assert!(
                matches!(CountConstraint::parse(text), Err(PatternError::InvalidCount { .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn test_count_holds() {
        let d = dep("A:B", "C:D").with_counts(5, 1, 0);
        assert!(CountConstraint::parse("ct>=5").unwrap().holds(&d));
        assert!(!CountConstraint::parse("ct<5").unwrap().holds(&d));
        assert!(CountConstraint::parse("questionable_ct=1").unwrap().holds(&d));
        assert!(!CountConstraint::parse("bad_ct>0").unwrap().holds(&d));
    }

    #[test]
    fn test_groups_flow_from_using_to_used() {
        let p = compile("(*).**:*", r"\1.Util:*");
        assert_eq!(p.used().group_count(), 0);
        let r = p.matches(&dep("Billing.Core:Invoice", "Billing.Util:Money"), &[]);
        assert!(r.success);
        assert_eq!(r.groups, vec!["Billing"]);
        assert!(!p.matches(&dep("Billing.Core:Invoice", "Shipping.Util:Money"), &[]).success);
    }

    #[test]
    fn test_result_groups_are_using_then_used() {
        let p = compile("(*).**:*", "(*).**:*");
        let r = p.matches(&dep("Billing.Core:Invoice", "Shipping.Api:Rate"), &[]);
        assert_eq!(r.groups, vec!["Billing", "Shipping"]);
    }

    #[test]
    fn test_filters_apply_before_items() {
        let p = compile("**:*", "**:*")
            .with_markers(MarkerPattern::parse("-test").unwrap())
            .with_count(CountConstraint::parse("bad_ct=0").unwrap());

        assert!(p.matches(&dep("A:B", "C:D"), &[]).success);
        assert!(!p.matches(&dep("A:B", "C:D").with_marker("test"), &[]).success);
        assert!(!p.matches(&dep("A:B", "C:D").with_counts(1, 0, 1), &[]).success);
    }

    #[test]
    fn test_external_groups_precede_using_captures() {
        let t = class();
        let mut registry = RegistryBuilder::new().item_type(Arc::clone(&t)).build();
        let p = DependencyPattern::compile(
            &mut registry,
            "(*):*",
            r"\2.**:*",
            &ItemPatternOptions::default().type_hint(t).external_groups(1),
        )
        .unwrap();
        let ext = vec!["Ext".to_string()];

        let r = p.matches(&dep("Acme:X", "Acme.Util:Y"), &ext);
        assert!(r.success);
        assert_eq!(r.groups, vec!["Acme"]);
        assert!(!p.matches(&dep("Acme:X", "Other.Util:Y"), &ext).success);
        // Missing external groups are padded, not shifted into.
        assert!(p.matches(&dep("Acme:X", "Acme.Util:Y"), &[]).success);
    }

    #[test]
    fn test_external_groups_reach_both_items() {
        let t = class();
        let mut registry = RegistryBuilder::new().item_type(Arc::clone(&t)).build();
        let p = DependencyPattern::compile(
            &mut registry,
            r"\1.**:*",
            r"\1.**:*",
            &ItemPatternOptions::default().type_hint(t).external_groups(1),
        )
        .unwrap();
        let ext = vec!["Acme".to_string()];

        assert!(p.matches(&dep("Acme.Core:X", "Acme.Util:Y"), &ext).success);
        assert!(!p.matches(&dep("Acme.Core:X", "Other.Util:Y"), &ext).success);
        assert!(!p.matches(&dep("Other.Core:X", "Acme.Util:Y"), &ext).success);
    }
}
