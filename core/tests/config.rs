//! Loading projection sets from YAML and JSON.

use depmatch::{
    PatternError, ProjectionSetConfig, ProjectorStrategy, RegistryBuilder, Side,
};

fn load_fixture() -> ProjectionSetConfig {
    let text = include_str!("fixtures/projections.yaml");
    serde_yaml::from_str(text).unwrap()
}

#[test]
fn yaml_fixture_loads() {
    let config = load_fixture();
    assert_eq!(config.projections.len(), 4);
    assert_eq!(config.strategy, ProjectorStrategy::PrefixTrie);
    assert_eq!(config.reorganize_interval, 50);

    let mut registry = RegistryBuilder::new().build();
    let set = registry.load_projection_set(config).unwrap();
    assert_eq!(set.source_type().name(), "CLASS");
    assert_eq!(set.target_type().name(), "MODULE");
    assert_eq!(set.len(), 4);
}

#[test]
fn first_match_wins() {
    let mut registry = RegistryBuilder::new().build();
    let mut set = registry.load_projection_set(load_fixture()).unwrap();

    let cases = [
        ("Acme.Billing.Tests.Unit:InvoiceTest", Some("Billing:test")),
        ("Acme.Billing.Model:Invoice", Some("Billing:main")),
        ("Vendor.Json:Parser", Some("vendor.Vendor")),
        ("System.IO:File", Some("vendor.System")),
    ];
    for (text, expected) in cases {
        let item = set.parse_item(text);
        assert_eq!(
            set.project(&item, Side::Left).map(|i| i.to_string()).as_deref(),
            expected,
            "{text}"
        );
    }

    let item = set.parse_item("System.IO:File");
    assert_eq!(
        set.project(&item, Side::Right).map(|i| i.to_string()).as_deref(),
        Some("runtime")
    );
}

#[test]
fn repeated_projection_is_stable_across_reorganizations() {
    let mut registry = RegistryBuilder::new().build();
    let mut set = registry.load_projection_set(load_fixture()).unwrap();
    let item = set.parse_item("Acme.Billing.Model:Invoice");
    for _ in 0..500 {
        assert_eq!(
            set.project(&item, Side::Left).map(|i| i.to_string()).as_deref(),
            Some("Billing:main")
        );
    }
}

#[test]
fn json_config_with_defaults() {
    let config: ProjectionSetConfig = serde_json::from_str(
        r#"{
            "item_types": [{ "name": "FILE", "fields": ["PATH"] }],
            "source_type": "file",
            "target_type": "FILE",
            "ignore_case": true,
            "projections": [{ "pattern": "src/(*)/**", "target": "\\1" }]
        }"#,
    )
    .unwrap();
    assert_eq!(config.strategy, ProjectorStrategy::PrefixTrie);

    let mut registry = RegistryBuilder::new().build();
    let mut set = registry.load_projection_set(config).unwrap();
    let item = set.parse_item("SRC/core/lib");
    assert_eq!(
        set.project(&item, Side::Right).map(|i| i.to_string()).as_deref(),
        Some("core")
    );
}

#[test]
fn unknown_strategy_is_rejected() {
    let result: Result<ProjectionSetConfig, _> = serde_yaml::from_str(
        "source_type: A\ntarget_type: B\nstrategy: fastest\nprojections: []\n",
    );
    assert!(result.is_err());
}

#[test]
fn bad_pattern_names_the_text() {
    let mut config = load_fixture();
    config.projections[0].pattern = "Acme.(Core:*".into();
    let err = RegistryBuilder::new()
        .build()
        .load_projection_set(config)
        .unwrap_err();
    assert!(matches!(err, PatternError::InvalidPattern { ref pattern, .. } if pattern == "Acme.(Core"));
}
