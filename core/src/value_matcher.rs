//! `ValueMatcher`: the closed family of compiled single-value matchers
//!
//! Every segment of a pattern compiles to one of seven variants. All of them
//! answer the same questions:
//!
//! - does this value match (given captures from an earlier match)?
//! - which literal prefix/suffix does every accepted value carry?
//! - is another matcher structurally the same?
//!
//! # Available Matchers
//!
//! | Variant | Accepts | Groups | Prefix / suffix |
//! |---|---|---|---|
//! | `Always` | any value (optionally no `.`) | N × value | `""` / `""` |
//! | `Empty` | `""` only | N × `""` | `""` / `""` |
//! | `Equals` | the literal | N × value | literal / literal |
//! | `StartsWith` | values with the prefix | N × value | literal / `""` |
//! | `EndsWith` | values with the suffix | N × value | `""` / literal |
//! | `Contains` | values containing the literal | N × value | `""` / `""` |
//! | `Regex` | compiled wildcard/regex | its own groups | extracted head / tail |

use crate::memo::{MemoCache, Outcome};
use crate::{PatternError, Result, GROUP_SEPARATOR};
use std::fmt;
use std::sync::Mutex;
use tracing::warn;

/// Stand-in for a missing external group when building a back-reference subject.
///
/// A control character, so it never equals a real captured identifier.
pub(crate) const GROUP_FILLER: &str = "\u{1}";

/// Result of matching one value, item or dependency.
///
/// `groups` holds the declared captures, in order. A successful match without
/// declared captures has empty `groups`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Whether the match succeeded.
    pub success: bool,
    /// Captured groups, in declaration order.
    pub groups: Vec<String>,
}

impl MatchResult {
    /// A successful match carrying `groups`.
    #[must_use]
    pub fn hit(groups: Vec<String>) -> Self {
        Self {
            success: true,
            groups,
        }
    }

    /// A failed match.
    #[must_use]
    pub fn miss() -> Self {
        Self::default()
    }

    /// Flip `success`, keeping the groups.
    #[must_use]
    pub fn inverted(self, invert: bool) -> Self {
        Self {
            success: self.success != invert,
            groups: self.groups,
        }
    }
}

impl From<Outcome> for MatchResult {
    fn from(outcome: Outcome) -> Self {
        outcome.map_or_else(Self::miss, Self::hit)
    }
}

/// Discriminant of a [`ValueMatcher`], for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatcherKind {
    /// Matches anything.
    Always,
    /// Matches only `""`.
    Empty,
    /// Exact literal.
    Equals,
    /// Literal prefix.
    StartsWith,
    /// Literal suffix.
    EndsWith,
    /// Literal substring.
    Contains,
    /// Compiled regex.
    Regex,
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Always => "always",
            Self::Empty => "empty",
            Self::Equals => "equals",
            Self::StartsWith => "starts-with",
            Self::EndsWith => "ends-with",
            Self::Contains => "contains",
            Self::Regex => "regex",
        })
    }
}

/// A compiled single-value matcher.
///
/// Built by [`compile_segment`](crate::compile_segment); the constructors here are
/// for callers that already know which variant they want.
///
/// # Example
///
/// ```
/// use depmatch::ValueMatcher;
///
/// let m = ValueMatcher::ends_with("Test", false, 0);
/// assert!(m.matches("FooTest", &[]).success);
/// assert!(!m.matches("TestFoo", &[]).success);
/// assert_eq!(m.known_fixed_suffix(), "Test");
/// ```
#[derive(Debug, Clone)]
pub enum ValueMatcher {
    /// Accepts any value; values containing `.` only when `matches_dots`.
    Always { matches_dots: bool, groups: usize },
    /// Accepts only the empty string.
    Empty { groups: usize },
    /// Exact equality.
    Equals {
        value: String,
        ignore_case: bool,
        groups: usize,
    },
    /// Literal prefix.
    StartsWith {
        value: String,
        ignore_case: bool,
        groups: usize,
    },
    /// Literal suffix.
    EndsWith {
        value: String,
        ignore_case: bool,
        groups: usize,
    },
    /// Literal substring. Pre-lowercased when `ignore_case`.
    Contains {
        value: String,
        ignore_case: bool,
        groups: usize,
    },
    /// Anchored regex with optional synthetic back-reference block.
    Regex(Box<RegexMatcher>),
}

impl ValueMatcher {
    /// Create an always-matcher.
    #[must_use]
    pub fn always(matches_dots: bool, groups: usize) -> Self {
        Self::Always {
            matches_dots,
            groups,
        }
    }

    /// Create an empty-matcher.
    #[must_use]
    pub fn empty(groups: usize) -> Self {
        Self::Empty { groups }
    }

    /// Create an exact-literal matcher.
    #[must_use]
    pub fn equals(value: impl Into<String>, ignore_case: bool, groups: usize) -> Self {
        Self::Equals {
            value: value.into(),
            ignore_case,
            groups,
        }
    }

    /// Create a prefix matcher.
    #[must_use]
    pub fn starts_with(value: impl Into<String>, ignore_case: bool, groups: usize) -> Self {
        Self::StartsWith {
            value: value.into(),
            ignore_case,
            groups,
        }
    }

    /// Create a suffix matcher.
    #[must_use]
    pub fn ends_with(value: impl Into<String>, ignore_case: bool, groups: usize) -> Self {
        Self::EndsWith {
            value: value.into(),
            ignore_case,
            groups,
        }
    }

    /// Create a substring matcher.
    ///
    /// When `ignore_case` is true, the literal is lowercased once here instead of
    /// on every match call.
    #[must_use]
    pub fn contains(value: impl Into<String>, ignore_case: bool, groups: usize) -> Self {
        let value = value.into();
        Self::Contains {
            value: if ignore_case {
                value.to_ascii_lowercase()
            } else {
                value
            },
            ignore_case,
            groups,
        }
    }

    /// Which variant this is.
    #[must_use]
    pub fn kind(&self) -> MatcherKind {
        match self {
            Self::Always { .. } => MatcherKind::Always,
            Self::Empty { .. } => MatcherKind::Empty,
            Self::Equals { .. } => MatcherKind::Equals,
            Self::StartsWith { .. } => MatcherKind::StartsWith,
            Self::EndsWith { .. } => MatcherKind::EndsWith,
            Self::Contains { .. } => MatcherKind::Contains,
            Self::Regex(_) => MatcherKind::Regex,
        }
    }

    /// Number of groups a successful match reports.
    #[must_use]
    pub fn group_count(&self) -> usize {
        match self {
            Self::Always { groups, .. }
            | Self::Empty { groups }
            | Self::Equals { groups, .. }
            | Self::StartsWith { groups, .. }
            | Self::EndsWith { groups, .. }
            | Self::Contains { groups, .. } => *groups,
            Self::Regex(re) => re.own_groups,
        }
    }

    /// Match `value`, resolving back-references against `external_groups`.
    ///
    /// Only the regex variant looks at `external_groups`; literal variants cannot
    /// contain back-references.
    #[must_use]
    pub fn matches(&self, value: &str, external_groups: &[String]) -> MatchResult {
        let accepted = match self {
            Self::Always { matches_dots, .. } => *matches_dots || !value.contains('.'),
            Self::Empty { .. } => value.is_empty(),
            Self::Equals {
                value: expected,
                ignore_case,
                ..
            } => {
                if *ignore_case {
                    value.eq_ignore_ascii_case(expected)
                } else {
                    value == expected
                }
            }
            Self::StartsWith {
                value: prefix,
                ignore_case,
                ..
            } => {
                if *ignore_case {
                    value
                        .get(..prefix.len())
                        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
                } else {
                    value.starts_with(prefix.as_str())
                }
            }
            Self::EndsWith {
                value: suffix,
                ignore_case,
                ..
            } => {
                if *ignore_case {
                    value
                        .len()
                        .checked_sub(suffix.len())
                        .and_then(|start| value.get(start..))
                        .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
                } else {
                    value.ends_with(suffix.as_str())
                }
            }
            Self::Contains {
                value: needle,
                ignore_case,
                ..
            } => {
                if *ignore_case {
                    // needle is pre-lowercased at construction time
                    value.to_ascii_lowercase().contains(needle.as_str())
                } else {
                    value.contains(needle.as_str())
                }
            }
            Self::Regex(re) => return re.matches(value, external_groups),
        };

        if accepted {
            MatchResult::hit(vec![value.to_string(); self.group_count()])
        } else {
            MatchResult::miss()
        }
    }

    /// A literal every accepted value starts with.
    ///
    /// Case-insensitive matchers report `""`: the literal's case is not a
    /// guaranteed prefix of their accepted values.
    #[must_use]
    pub fn known_fixed_prefix(&self) -> &str {
        match self {
            Self::Equals {
                value,
                ignore_case: false,
                ..
            }
            | Self::StartsWith {
                value,
                ignore_case: false,
                ..
            } => value,
            Self::Regex(re) => &re.fixed_prefix,
            _ => "",
        }
    }

    /// A literal every accepted value ends with.
    #[must_use]
    pub fn known_fixed_suffix(&self) -> &str {
        match self {
            Self::Equals {
                value,
                ignore_case: false,
                ..
            }
            | Self::EndsWith {
                value,
                ignore_case: false,
                ..
            } => value,
            Self::Regex(re) => &re.fixed_suffix,
            _ => "",
        }
    }

    /// Structural equivalence: same variant, same literal or regex, same groups.
    ///
    /// Used to detect redundant rules. Two alike matchers accept the same values.
    #[must_use]
    pub fn matches_alike(&self, other: &ValueMatcher) -> bool {
        match (self, other) {
            (
                Self::Always {
                    matches_dots: a,
                    groups: ga,
                },
                Self::Always {
                    matches_dots: b,
                    groups: gb,
                },
            ) => a == b && ga == gb,
            (Self::Empty { groups: a }, Self::Empty { groups: b }) => a == b,
            (
                Self::Equals {
                    value: a,
                    ignore_case: ia,
                    groups: ga,
                },
                Self::Equals {
                    value: b,
                    ignore_case: ib,
                    groups: gb,
                },
            )
            | (
                Self::StartsWith {
                    value: a,
                    ignore_case: ia,
                    groups: ga,
                },
                Self::StartsWith {
                    value: b,
                    ignore_case: ib,
                    groups: gb,
                },
            )
            | (
                Self::EndsWith {
                    value: a,
                    ignore_case: ia,
                    groups: ga,
                },
                Self::EndsWith {
                    value: b,
                    ignore_case: ib,
                    groups: gb,
                },
            )
            | (
                Self::Contains {
                    value: a,
                    ignore_case: ia,
                    groups: ga,
                },
                Self::Contains {
                    value: b,
                    ignore_case: ib,
                    groups: gb,
                },
            ) => a == b && ia == ib && ga == gb,
            (Self::Regex(a), Self::Regex(b)) => {
                a.regex.as_str() == b.regex.as_str() && a.external_groups == b.external_groups
            }
            _ => false,
        }
    }

    /// Drop the memoization cache (if any).
    ///
    /// Results are unchanged; only repeated values get slower.
    #[must_use]
    pub fn without_memo(self) -> Self {
        match self {
            Self::Regex(mut re) => {
                re.memo = None;
                Self::Regex(re)
            }
            other => other,
        }
    }

    /// Number of memoized results currently held.
    #[must_use]
    pub fn memo_len(&self) -> usize {
        match self {
            Self::Regex(re) => re
                .memo
                .as_ref()
                .and_then(|m| m.lock().ok().map(|cache| cache.len()))
                .unwrap_or(0),
            _ => 0,
        }
    }
}

impl fmt::Display for ValueMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always { matches_dots, .. } => {
                write!(f, "Always(dots={matches_dots})")
            }
            Self::Empty { .. } => f.write_str("Empty"),
            Self::Equals { value, .. } => write!(f, "Equals(\"{value}\")"),
            Self::StartsWith { value, .. } => write!(f, "StartsWith(\"{value}\")"),
            Self::EndsWith { value, .. } => write!(f, "EndsWith(\"{value}\")"),
            Self::Contains { value, .. } => write!(f, "Contains(\"{value}\")"),
            Self::Regex(re) => write!(f, "Regex(\"{}\")", re.regex.as_str()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Regex variant
// ═══════════════════════════════════════════════════════════════════════════════

/// The regex variant of [`ValueMatcher`].
///
/// The compiled regex starts with `external_groups` synthetic groups of the form
/// `([^#]*)#`. At match time the caller's captures are joined with `#` in front of
/// the value so that `\1`..`\N` in the user's pattern refer to them. Only the
/// groups after the synthetic block are reported.
///
/// Patterns the linear-time engine accepts run on it; back-references and other
/// constructs it rejects fall back to the backtracking engine.
pub struct RegexMatcher {
    source: String,
    regex: Engine,
    external_groups: usize,
    own_groups: usize,
    fixed_prefix: String,
    fixed_suffix: String,
    memo: Option<Mutex<MemoCache>>,
}

impl RegexMatcher {
    /// Compile `regex_text`, which must already contain the synthetic block.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidPattern`] naming `source` if the regex does
    /// not compile.
    pub(crate) fn compile(
        source: &str,
        regex_text: &str,
        external_groups: usize,
        fixed_prefix: String,
        fixed_suffix: String,
    ) -> Result<Self> {
        let regex = Engine::new(regex_text).map_err(|message| PatternError::InvalidPattern {
            pattern: source.to_string(),
            message,
        })?;
        let own_groups = regex
            .captures_len()
            .saturating_sub(1 + external_groups);
        Ok(Self {
            source: source.to_string(),
            regex,
            external_groups,
            own_groups,
            fixed_prefix,
            fixed_suffix,
            memo: Some(Mutex::new(MemoCache::default())),
        })
    }

    /// The user-written segment this matcher was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The generated regex text.
    #[must_use]
    pub fn regex_text(&self) -> &str {
        self.regex.as_str()
    }

    /// Size of the synthetic back-reference block.
    #[must_use]
    pub fn external_groups(&self) -> usize {
        self.external_groups
    }

    fn subject(&self, value: &str, external_groups: &[String]) -> String {
        let mut subject = String::with_capacity(value.len() + self.external_groups * 8);
        for i in 0..self.external_groups {
            subject.push_str(external_groups.get(i).map_or(GROUP_FILLER, String::as_str));
            subject.push(GROUP_SEPARATOR);
        }
        subject.push_str(value);
        subject
    }

    fn matches(&self, value: &str, external_groups: &[String]) -> MatchResult {
        let subject = self.subject(value, external_groups);

        if let Some(memo) = &self.memo {
            if let Ok(cache) = memo.lock() {
                if let Some(outcome) = cache.get(&subject) {
                    return outcome.clone().into();
                }
            }
        }

        let outcome = match self.evaluate(&subject) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(pattern = %self.source, error = %e, "regex evaluation failed, treating as no match");
                return MatchResult::miss();
            }
        };

        if let Some(memo) = &self.memo {
            if let Ok(mut cache) = memo.lock() {
                cache.insert(subject, outcome.clone());
            }
        }
        outcome.into()
    }

    fn evaluate(&self, subject: &str) -> std::result::Result<Outcome, fancy_regex::Error> {
        let own = 1 + self.external_groups..1 + self.external_groups + self.own_groups;
        match &self.regex {
            Engine::Linear(re) => Ok(re.captures(subject).map(|captures| {
                own.map(|i| captures.get(i).map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect()
            })),
            Engine::Backtracking(re) => Ok(re.captures(subject)?.map(|captures| {
                own.map(|i| captures.get(i).map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect()
            })),
        }
    }
}

/// The compiled regex behind a [`RegexMatcher`].
#[derive(Clone)]
enum Engine {
    /// Linear-time, no back-references.
    Linear(regex::Regex),
    /// Backtracking, for `\1` and friends.
    Backtracking(fancy_regex::Regex),
}

impl Engine {
    fn new(text: &str) -> std::result::Result<Self, String> {
        if let Ok(re) = regex::Regex::new(text) {
            return Ok(Self::Linear(re));
        }
        fancy_regex::Regex::new(text)
            .map(Self::Backtracking)
            .map_err(|e| e.to_string())
    }

    fn as_str(&self) -> &str {
        match self {
            Self::Linear(re) => re.as_str(),
            Self::Backtracking(re) => re.as_str(),
        }
    }

    fn captures_len(&self) -> usize {
        match self {
            Self::Linear(re) => re.captures_len(),
            Self::Backtracking(re) => re.captures_len(),
        }
    }
}

impl Clone for RegexMatcher {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            regex: self.regex.clone(),
            external_groups: self.external_groups,
            own_groups: self.own_groups,
            fixed_prefix: self.fixed_prefix.clone(),
            fixed_suffix: self.fixed_suffix.clone(),
            memo: self
                .memo
                .as_ref()
                .map(|_| Mutex::new(MemoCache::default())),
        }
    }
}

impl fmt::Debug for RegexMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexMatcher")
            .field("source", &self.source)
            .field("regex", &self.regex.as_str())
            .field(
                "backtracking",
                &matches!(self.regex, Engine::Backtracking(_)),
            )
            .field("external_groups", &self.external_groups)
            .field("own_groups", &self.own_groups)
            .field("fixed_prefix", &self.fixed_prefix)
            .field("fixed_suffix", &self.fixed_suffix)
            .field("memoized", &self.memo.is_some())
            .finish()
    }
}
