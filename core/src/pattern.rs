//! Segment compiler: wildcard text → [`ValueMatcher`]
//!
//! A segment is the text of one field in a pattern. Compilation tries these
//! rules in order; the first one that applies wins:
//!
//! 1. blank, or only `*` inside optional parens (`*`, `**`, `(**)`) → `Always`
//! 2. only `(`, `)` and `-` → `Empty`
//! 3. starts with `^` → verbatim regex
//! 4. ends with `$` → verbatim regex, unanchored at the start (`.*` prepended)
//! 5. no back-reference block and no metacharacter except `.` → `Equals`
//! 6. `**X**` → `Contains`
//! 7. `X**` → `StartsWith`
//! 8. `**X` → `EndsWith`
//! 9. anything else → `*`/`**` expanded into an anchored regex
//!
//! Parens wrapping a whole segment declare capture groups, one per `(`, each
//! capturing the whole value.
//!
//! # Wildcards
//!
//! With `NON` = one non-separator character and separators `.`, `/`, `\`:
//!
//! | Text | Expansion |
//! |---|---|
//! | `.**` (separator then `**`) | zero or more `separator NON+` groups; the separator becomes optional |
//! | `a**` (glued to an identifier) | anything, including nothing |
//! | `**` (free-standing) | `NON+`, optionally followed by more `separator NON+` groups |
//! | `a*`, `*a` (next to an identifier) | `NON*` |
//! | `*` (free-standing) | `NON+` |
//!
//! A literal `.` becomes `[.]`. Every other regex construct passes through, so
//! segments may use classes, alternation and back-references (`\1`).

use crate::value_matcher::RegexMatcher;
use crate::{PatternError, Result, ValueMatcher, MAX_PATTERN_LENGTH, MAX_REGEX_PATTERN_LENGTH};
use tracing::debug;

/// One character that is not a path separator.
const NON_SEPARATOR: &str = r"[^./\\]";

/// Any path separator.
const SEPARATOR: &str = r"[./\\]";

/// Synthetic group consuming one injected back-reference value.
const BACKREF_GROUP: &str = "([^#]*)#";

/// Characters with regex meaning in a segment. `.` is deliberately absent: it is a
/// literal separator in this grammar.
const META: &[char] = &[
    '\\', '^', '$', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|',
];

/// Options for [`compile_segment`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentOptions {
    /// Number of captures from an earlier match that `\1`..`\N` may refer to.
    ///
    /// Regex matchers get this many synthetic leading groups. A non-zero value also
    /// disables the `Equals` shortcut.
    pub external_groups: usize,
    /// Compare case-insensitively.
    pub ignore_case: bool,
}

impl SegmentOptions {
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

/// Compile one segment into a matcher.
///
/// Compilation is a pure function of `segment` and `options`.
///
/// # Errors
///
/// Returns [`PatternError::PatternTooLong`] for oversized segments and
/// [`PatternError::InvalidPattern`] if the generated regex does not compile.
///
/// # Example
///
/// ```
/// use depmatch::{compile_segment, MatcherKind, SegmentOptions};
///
/// let m = compile_segment("a**b", &SegmentOptions::default()).unwrap();
/// assert_eq!(m.kind(), MatcherKind::Regex);
/// assert!(m.matches("a.x.y.b", &[]).success);
/// assert!(m.matches("ab", &[]).success);
///
/// let m = compile_segment("Test**", &SegmentOptions::default()).unwrap();
/// assert_eq!(m.kind(), MatcherKind::StartsWith);
/// ```
pub fn compile_segment(segment: &str, options: &SegmentOptions) -> Result<ValueMatcher> {
    if segment.len() > MAX_PATTERN_LENGTH {
        return Err(PatternError::PatternTooLong {
            len: segment.len(),
            max: MAX_PATTERN_LENGTH,
        });
    }

    let matcher = classify(segment.trim(), options)?;
    debug!(segment, kind = %matcher.kind(), groups = matcher.group_count(), "compiled segment");
    Ok(matcher)
}

fn classify(segment: &str, options: &SegmentOptions) -> Result<ValueMatcher> {
    let ignore_case = options.ignore_case;

    // 1. Always
    if segment.is_empty() || is_only_asterisks(segment) {
        let matches_dots = segment.is_empty() || segment.matches('*').count() > 1;
        return Ok(ValueMatcher::always(matches_dots, open_parens(segment)));
    }

    // 2. Empty
    if segment.chars().all(|c| matches!(c, '(' | ')' | '-')) {
        return Ok(ValueMatcher::empty(open_parens(segment)));
    }

    // 3. Verbatim regex, anchored by the user
    if let Some(rest) = segment.strip_prefix('^') {
        let text = format!("{}^{}{rest}", flags(ignore_case), block(options));
        return compile_regex(segment, &text, options, String::new(), String::new());
    }

    // 4. Verbatim regex, anchored at the end only
    if segment.ends_with('$') {
        let text = format!("{}^{}.*{segment}", flags(ignore_case), block(options));
        return compile_regex(segment, &text, options, String::new(), String::new());
    }

    if let Some((inner, groups)) = strip_group_parens(segment) {
        // 5. Equals
        if options.external_groups == 0 && !has_meta(inner) {
            return Ok(ValueMatcher::equals(inner, ignore_case, groups));
        }

        // 6. Contains
        if let Some(needle) = inner
            .strip_prefix("**")
            .and_then(|s| s.strip_suffix("**"))
            .filter(|s| is_plain_literal(s))
        {
            return Ok(ValueMatcher::contains(needle, ignore_case, groups));
        }

        // 7. StartsWith. `X.**` also accepts `X` itself, which only the regex form does.
        if let Some(prefix) = inner
            .strip_suffix("**")
            .filter(|s| is_plain_literal(s) && !s.ends_with(is_separator))
        {
            return Ok(ValueMatcher::starts_with(prefix, ignore_case, groups));
        }

        // 8. EndsWith
        if let Some(suffix) = inner.strip_prefix("**").filter(|s| is_plain_literal(s)) {
            return Ok(ValueMatcher::ends_with(suffix, ignore_case, groups));
        }
    }

    // 9. Expanded wildcard regex
    let (prefix, suffix) = if ignore_case {
        (String::new(), String::new())
    } else {
        fixed_literals(segment)
    };
    let text = format!(
        "{}^{}{}$",
        flags(ignore_case),
        block(options),
        expand_asterisks(segment)
    );
    compile_regex(segment, &text, options, prefix, suffix)
}

fn compile_regex(
    segment: &str,
    text: &str,
    options: &SegmentOptions,
    fixed_prefix: String,
    fixed_suffix: String,
) -> Result<ValueMatcher> {
    if segment.len() > MAX_REGEX_PATTERN_LENGTH {
        return Err(PatternError::PatternTooLong {
            len: segment.len(),
            max: MAX_REGEX_PATTERN_LENGTH,
        });
    }
    RegexMatcher::compile(
        segment,
        text,
        options.external_groups,
        fixed_prefix,
        fixed_suffix,
    )
    .map(|re| ValueMatcher::Regex(Box::new(re)))
}

fn flags(ignore_case: bool) -> &'static str {
    if ignore_case {
        "(?i)"
    } else {
        ""
    }
}

fn block(options: &SegmentOptions) -> String {
    BACKREF_GROUP.repeat(options.external_groups)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Classification helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Does `text` contain a regex metacharacter (other than `.`)?
pub(crate) fn has_meta(text: &str) -> bool {
    text.contains(META)
}

fn is_plain_literal(text: &str) -> bool {
    !text.is_empty() && !has_meta(text)
}

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '/' | '\\')
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn open_parens(segment: &str) -> usize {
    segment.matches('(').count()
}

/// `^\(*\*+\)*$`
fn is_only_asterisks(segment: &str) -> bool {
    let inner = segment.trim_start_matches('(').trim_end_matches(')');
    !inner.is_empty() && inner.chars().all(|c| c == '*')
}

/// Strip balanced wrapping parens: `((Foo))` → (`Foo`, 2).
fn strip_group_parens(segment: &str) -> Option<(&str, usize)> {
    let opened = segment.len() - segment.trim_start_matches('(').len();
    let inner = &segment[opened..];
    let closed = inner.len() - inner.trim_end_matches(')').len();
    (opened == closed).then(|| (&inner[..inner.len() - closed], opened))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Asterisk expansion
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq)]
enum Prev {
    /// Start of segment, or after a construct that is neither identifier nor separator.
    Other,
    /// After an identifier character.
    Ident,
    /// After a separator whose regex text starts at this output offset.
    Separator(usize),
}

/// Expand `*`/`**` and escape `.` in a raw segment.
///
/// Escape pairs (`\x`) are copied through unchanged; an escaped backslash counts
/// as a separator.
fn expand_asterisks(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::with_capacity(segment.len() * 2);
    let mut prev = Prev::Other;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                let start = out.len();
                out.push('\\');
                match chars.get(i + 1) {
                    Some(&next) => {
                        out.push(next);
                        prev = if next == '\\' {
                            Prev::Separator(start)
                        } else if is_ident(next) {
                            Prev::Ident
                        } else {
                            Prev::Other
                        };
                        i += 2;
                    }
                    None => {
                        // Trailing lone backslash: leave it for the regex compiler to reject.
                        i += 1;
                    }
                }
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                match prev {
                    Prev::Separator(start) => {
                        let separator = out.split_off(start);
                        out.push_str(&format!("(?:{separator}{NON_SEPARATOR}+)*"));
                    }
                    Prev::Ident => out.push_str(".*"),
                    Prev::Other => out.push_str(&format!(
                        "{NON_SEPARATOR}+(?:{SEPARATOR}{NON_SEPARATOR}+)*"
                    )),
                }
                prev = Prev::Other;
                i += 2;
            }
            '*' => {
                let glued = prev == Prev::Ident || chars.get(i + 1).is_some_and(|&n| is_ident(n));
                out.push_str(NON_SEPARATOR);
                out.push(if glued { '*' } else { '+' });
                prev = Prev::Other;
                i += 1;
            }
            '.' => {
                prev = Prev::Separator(out.len());
                out.push_str("[.]");
                i += 1;
            }
            '/' => {
                prev = Prev::Separator(out.len());
                out.push('/');
                i += 1;
            }
            _ => {
                out.push(c);
                prev = if is_ident(c) { Prev::Ident } else { Prev::Other };
                i += 1;
            }
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// Fixed prefix / suffix extraction
// ═══════════════════════════════════════════════════════════════════════════════

/// A segment character and whether it stands for itself in the expanded regex.
struct Token {
    ch: char,
    literal: bool,
}

fn tokenize(segment: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(segment.len());
    let mut chars = segment.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            tokens.push(Token { ch, literal: false });
            if let Some(escaped) = chars.next() {
                tokens.push(Token {
                    ch: escaped,
                    literal: false,
                });
                // `\x41`, `\u{263A}`: the code point digits are not literal text
                if matches!(escaped, 'x' | 'u' | 'U') {
                    while let Some(&c) = chars.peek() {
                        if !(c.is_ascii_hexdigit() || c == '{' || c == '}') {
                            break;
                        }
                        tokens.push(Token { ch: c, literal: false });
                        chars.next();
                    }
                }
            }
        } else {
            tokens.push(Token {
                ch,
                literal: !META.contains(&ch),
            });
        }
    }
    tokens
}

/// Literal head and tail every value accepted by the expanded regex must carry.
///
/// Over-approximation (returning less) is always safe; returning more than the
/// regex guarantees is a bug.
fn fixed_literals(segment: &str) -> (String, String) {
    // Alternation and inline flags or look-arounds void both ends
    if segment.contains('|') || segment.contains("(?") {
        return (String::new(), String::new());
    }
    let tokens = tokenize(segment);

    let head_len = tokens.iter().take_while(|t| t.literal).count();
    let mut head: Vec<char> = tokens[..head_len].iter().map(|t| t.ch).collect();
    let run = quantifier_run(&tokens[head_len..]);
    if run.contains(&'?') || run.contains(&'{') {
        // Some quantifier in the run may drop the preceding character entirely
        head.pop();
    } else if run.first() == Some(&'*')
        && run.get(1) == Some(&'*')
        && head.last().copied().is_some_and(is_separator)
    {
        // `sep**` makes the separator optional
        head.pop();
    }

    let tail_len = tokens.iter().rev().take_while(|t| t.literal).count();
    let tail: String = tokens[tokens.len() - tail_len..]
        .iter()
        .map(|t| t.ch)
        .collect();

    (head.into_iter().collect(), tail)
}

/// The quantifier characters directly following a literal run, brace bodies included.
fn quantifier_run(tokens: &[Token]) -> Vec<char> {
    let mut run = Vec::new();
    let mut in_braces = false;
    for t in tokens {
        match t.ch {
            '{' if !t.literal => in_braces = true,
            '}' if !t.literal => in_braces = false,
            '*' | '+' | '?' if !t.literal => {}
            _ if in_braces => {}
            _ => break,
        }
        run.push(t.ch);
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatcherKind;

    fn compile(segment: &str) -> ValueMatcher {
        compile_segment(segment, &SegmentOptions::default()).unwrap()
    }

    fn accepts(segment: &str, value: &str) -> bool {
        compile(segment).matches(value, &[]).success
    }

    #[test]
    fn test_always_rules() {
        for segment in ["", "  ", "*", "**", "(*)", "((**))"] {
            assert_eq!(compile(segment).kind(), MatcherKind::Always, "{segment:?}");
        }
        assert!(!accepts("*", "a.b"));
        assert!(accepts("*", "ab"));
        assert!(accepts("**", "a.b"));
        assert!(accepts("", "a.b"));

        let r = compile("(**)").matches("a.b", &[]);
        assert_eq!(r.groups, vec!["a.b"]);
    }

    #[test]
    fn test_empty_rules() {
        let m = compile("-");
        assert_eq!(m.kind(), MatcherKind::Empty);
        assert!(m.matches("", &[]).success);
        assert!(!m.matches("x", &[]).success);
        assert_eq!(compile("(-)").group_count(), 1);
    }

    #[test]
    fn test_literal_rules() {
        assert_eq!(compile("Acme.Core").kind(), MatcherKind::Equals);
        assert_eq!(compile("**Core**").kind(), MatcherKind::Contains);
        assert_eq!(compile("Test**").kind(), MatcherKind::StartsWith);
        assert_eq!(compile("**Test").kind(), MatcherKind::EndsWith);
        assert_eq!(compile("(Acme)").group_count(), 1);
        assert_eq!(compile("(Test**)").kind(), MatcherKind::StartsWith);
    }

    #[test]
    fn test_equals_disabled_with_external_groups() {
        let m = compile_segment("Acme", &SegmentOptions::default().external_groups(1)).unwrap();
        assert_eq!(m.kind(), MatcherKind::Regex);
        assert!(m.matches("Acme", &["x".into()]).success);
        assert!(!m.matches("Acm", &["x".into()]).success);
    }

    #[test]
    fn test_separator_double_star_is_optional() {
        let m = compile("Acme.**");
        assert_eq!(m.kind(), MatcherKind::Regex);
        assert!(m.matches("Acme", &[]).success);
        assert!(m.matches("Acme.Core", &[]).success);
        assert!(m.matches("Acme.Core.Util", &[]).success);
        assert!(!m.matches("AcmeX", &[]).success);
        assert!(!m.matches("Acme.", &[]).success);
        assert_eq!(m.known_fixed_prefix(), "Acme");
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        assert!(accepts("a*b", "aXb"));
        assert!(accepts("a*b", "ab"));
        assert!(!accepts("a*b", "a.b"));
        assert!(!accepts("a*b", "a/b"));
    }

    #[test]
    fn test_free_standing_star_needs_a_character() {
        assert!(accepts("Acme.*", "Acme.Core"));
        assert!(!accepts("Acme.*", "Acme."));
        assert!(!accepts("Acme.*", "Acme.Core.Util"));
    }

    #[test]
    fn test_glued_double_star_crosses_separators() {
        assert!(accepts("a**b", "a.x.y.b"));
        assert!(accepts("a**b", "ab"));
        assert!(!accepts("a**b", "a.x.y.c"));
    }

    #[test]
    fn test_user_regex_constructs_pass_through() {
        assert!(accepts("Acme.[A-Z]*", "Acme.Core"));
        assert!(!accepts("Acme.[A-Z]*", "Acme.core"));
        assert!(accepts("(Core|Util)Lib", "UtilLib"));
    }

    #[test]
    fn test_anchored_regex_rules() {
        let m = compile("^Acme.*");
        assert!(m.matches("Acme", &[]).success);
        assert!(m.matches("AcmeX.Y", &[]).success);
        assert_eq!(m.known_fixed_prefix(), "");

        let m = compile("Test$");
        assert!(m.matches("FooTest", &[]).success);
        assert!(!m.matches("TestFoo", &[]).success);
    }

    #[test]
    fn test_ignore_case() {
        let opts = SegmentOptions::default().ignore_case(true);
        let m = compile_segment("acme.*", &opts).unwrap();
        assert!(m.matches("ACME.Core", &[]).success);
        assert_eq!(m.known_fixed_prefix(), "");

        let m = compile_segment("acme", &opts).unwrap();
        assert!(m.matches("ACME", &[]).success);
    }

    #[test]
    fn test_back_reference_round_trip() {
        let m = compile_segment(r"\1.*", &SegmentOptions::default().external_groups(1)).unwrap();
        assert!(m.matches("Acme.Util", &["Acme".into()]).success);
        assert!(!m.matches("Other.Util", &["Acme".into()]).success);
    }

    #[test]
    fn test_back_reference_without_block_is_rejected() {
        let err = compile_segment(r"\1.*", &SegmentOptions::default()).unwrap_err();
        assert!(matches!(err, PatternError::InvalidPattern { ref pattern, .. } if pattern == r"\1.*"));
    }

    #[test]
    fn test_malformed_regex_is_rejected() {
        assert!(matches!(
            compile_segment("Acme.[Core", &SegmentOptions::default()),
            Err(PatternError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_regex_groups_are_reported() {
        let r = compile("Acme.(*).Impl").matches("Acme.Billing.Impl", &[]);
        assert!(r.success);
        assert_eq!(r.groups, vec!["Billing"]);
    }

    #[test]
    fn test_fixed_literals() {
        assert_eq!(fixed_literals("Acme.*Service"), ("Acme.".into(), "Service".into()));
        assert_eq!(fixed_literals("Acme.**"), ("Acme".into(), String::new()));
        assert_eq!(fixed_literals("Acmes?.x"), ("Acme".into(), ".x".into()));
        assert_eq!(fixed_literals("Ac{2}"), ("A".into(), String::new()));
        assert_eq!(fixed_literals(r"\d+Foo"), (String::new(), "Foo".into()));
        assert_eq!(fixed_literals(r"Foo\d"), ("Foo".into(), String::new()));
        assert_eq!(fixed_literals("a|b"), (String::new(), String::new()));
    }

    #[test]
    fn test_fixed_literals_stacked_quantifiers() {
        assert_eq!(fixed_literals("a+{0}"), (String::new(), String::new()));
        assert_eq!(fixed_literals("ab+?c"), ("a".into(), "c".into()));
        assert_eq!(fixed_literals("ab*{0,1}"), ("a".into(), String::new()));
        assert!(accepts("a+{0}", ""));
        assert_eq!(compile("a+{0}").known_fixed_prefix(), "");
    }

    #[test]
    fn test_fixed_literals_inline_flags() {
        assert_eq!(fixed_literals("(?i)Acme.*Core"), (String::new(), String::new()));
        let m = compile("(?i)Acme.*Core");
        assert!(m.matches("ACME.xCORE", &[]).success);
        assert_eq!(m.known_fixed_suffix(), "");
    }

    #[test]
    fn test_fixed_literals_hex_escape() {
        assert_eq!(fixed_literals(r"a*\x41z"), ("a".into(), "z".into()));
        assert!(accepts(r"a*\x41z", "aaAz"));
        // Trailing hex digits may belong to the escape
        assert_eq!(fixed_literals(r"a*\x41B"), ("a".into(), String::new()));
    }

    #[test]
    fn test_too_long() {
        let long = "a".repeat(MAX_PATTERN_LENGTH + 1);
        assert!(matches!(
            compile_segment(&long, &SegmentOptions::default()),
            Err(PatternError::PatternTooLong { .. })
        ));
    }
}
