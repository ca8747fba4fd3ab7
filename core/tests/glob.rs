//! Glob grammar and item-pattern behavior through the public API.

use std::sync::Arc;

use depmatch::prelude::*;
use depmatch::{MatcherKind, PatternError};

fn accepts(pattern: &str, value: &str) -> bool {
    compile_segment(pattern, &SegmentOptions::default())
        .unwrap()
        .matches(value, &[])
        .success
}

fn kind(pattern: &str) -> MatcherKind {
    compile_segment(pattern, &SegmentOptions::default())
        .unwrap()
        .kind()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Segment grammar
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn single_star_stays_within_one_segment() {
    assert!(accepts("a*b", "aXb"));
    assert!(accepts("a*b", "ab"));
    assert!(!accepts("a*b", "a.b"));
}

#[test]
fn glued_double_star_crosses_segments() {
    assert!(accepts("a**b", "a.x.y.b"));
    assert!(accepts("a**b", "ab"));
}

#[test]
fn ends_with() {
    assert_eq!(kind("**Test"), MatcherKind::EndsWith);
    assert!(accepts("**Test", "FooTest"));
    assert!(!accepts("**Test", "TestFoo"));
}

#[test]
fn starts_with() {
    assert_eq!(kind("Test**"), MatcherKind::StartsWith);
    assert!(accepts("Test**", "TestFoo"));
    assert!(!accepts("Test**", "FooTest"));
}

#[test]
fn contains() {
    assert_eq!(kind("**Core**"), MatcherKind::Contains);
    assert!(accepts("**Core**", "MyCoreLib"));
}

#[test]
fn namespace_subtree() {
    for value in ["Acme", "Acme.Billing", "Acme.Billing.Model"] {
        assert!(accepts("Acme.**", value), "{value}");
    }
    for value in ["AcmeCorp", "Acme.", "Other.Acme"] {
        assert!(!accepts("Acme.**", value), "{value}");
    }
}

#[test]
fn path_separators() {
    assert!(accepts("src/**", "src/core/util"));
    assert!(accepts("src/*.rs", "src/lib.rs"));
    assert!(!accepts("src/*.rs", "src/core/lib.rs"));
    assert!(accepts(r"src\\**", r"src\core"));
}

#[test]
fn free_standing_double_star_needs_a_segment() {
    assert!(accepts("**.Impl", "Acme.Billing.Impl"));
    assert!(!accepts("*.**.Impl", ".Impl"));
}

#[test]
fn back_reference_round_trip() {
    let m = compile_segment(r"\1.*", &SegmentOptions::default().external_groups(1)).unwrap();
    let using = vec!["Acme".to_string()];
    assert!(m.matches("Acme.Util", &using).success);
    assert!(!m.matches("Other.Util", &using).success);
}

#[test]
fn malformed_regex_fails_at_compile_time() {
    let err = compile_segment("Acme.(Core", &SegmentOptions::default()).unwrap_err();
    assert!(err.to_string().contains("Acme.(Core"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Item patterns
// ═══════════════════════════════════════════════════════════════════════════════

fn three_fields() -> (PatternRegistry, Arc<ItemType>) {
    let t = Arc::new(ItemType::new("TRIPLE", ["A", "B", "C"]));
    let registry = RegistryBuilder::new().item_type(Arc::clone(&t)).build();
    (registry, t)
}

#[test]
fn any_field_matches_the_middle_value() {
    let (mut registry, t) = three_fields();
    let p = ItemPattern::compile(
        &mut registry,
        "Foo",
        &ItemPatternOptions::default().type_hint(Arc::clone(&t)),
    )
    .unwrap();
    assert!(p
        .matches(&Item::new(t, ["Bar", "Foo", "Baz"]), false, &[])
        .success);
}

#[test]
fn named_and_positional_parts_do_not_mix() {
    let (mut registry, t) = three_fields();
    let err = ItemPattern::compile(
        &mut registry,
        "A=x:y",
        &ItemPatternOptions::default().type_hint(t),
    )
    .unwrap_err();
    assert!(matches!(err, PatternError::MixedFieldStyles { .. }));
}

#[test]
fn used_item_sees_using_captures() {
    let (mut registry, t) = three_fields();
    let p = registry
        .compile_dependency_pattern(
            "(*):*:*",
            r"\1.**:*:*",
            &ItemPatternOptions::default().type_hint(Arc::clone(&t)),
        )
        .unwrap();

    let dep = |using: &str, used: &str| {
        Dependency::new(
            Item::parse(Arc::clone(&t), using),
            Item::parse(Arc::clone(&t), used),
        )
    };
    let r = p.matches(&dep("Acme:x:y", "Acme.Util:x:y"), &[]);
    assert!(r.success);
    assert_eq!(r.groups, vec!["Acme"]);
    assert!(!p.matches(&dep("Acme:x:y", "Other.Util:x:y"), &[]).success);
}

#[test]
fn registry_shares_compiled_segments() {
    let (mut registry, t) = three_fields();
    let options = ItemPatternOptions::default().type_hint(t);
    for text in ["Acme.**:*:*", "Acme.**:Foo:*", "Beta:*:*"] {
        ItemPattern::compile(&mut registry, text, &options).unwrap();
    }
    // "Acme.**", "*", "Foo", "Beta"
    assert_eq!(registry.cached_segments(), 4);
}
