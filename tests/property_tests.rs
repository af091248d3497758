//! Property-based tests for rust_monitor_system using proptest

use proptest::prelude::*;
use rust_monitor_system::prelude::*;
use rust_monitor_system::LevelSpec;
use serde_json::{json, Value};

fn any_level() -> impl Strategy<Value = LogLevel> {
    (0u8..8).prop_map(|ordinal| LogLevel::from_ordinal(ordinal).unwrap())
}

fn mock_manager(level: &str) -> MonitorManager {
    let mut manager = MonitorManager::new("svc");
    manager
        .setup(
            MonitorConfig::default()
                .with_level(level)
                .with_mock(MockConfig::default()),
        )
        .unwrap();
    manager
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Names parse back regardless of case and surrounding whitespace
    #[test]
    fn test_log_level_str_roundtrip(level in any_level(), upper in any::<bool>(), pad in " {0,3}") {
        let name = if upper { level.to_str().to_uppercase() } else { level.to_str().to_string() };
        let parsed: LogLevel = format!("{}{}{}", pad, name, pad).parse().unwrap();
        prop_assert_eq!(level, parsed);
    }

    /// Ordinal order is urgency order
    #[test]
    fn test_log_level_ordering(a in any_level(), b in any_level()) {
        prop_assert_eq!(a < b, a.ordinal() < b.ordinal());
        prop_assert_eq!(a.allows(b), b.ordinal() <= a.ordinal());
    }

    #[test]
    fn test_log_level_invalid_parse(invalid in "[0-9xyz]{1,8}") {
        prop_assert!(invalid.parse::<LogLevel>().is_err());
    }
}

// ============================================================================
// Gating Tests
// ============================================================================

proptest! {
    /// A threshold suppresses exactly the less urgent levels
    #[test]
    fn test_threshold_gating(threshold in any_level(), emitted in any_level()) {
        let manager = mock_manager(threshold.to_str());
        manager.root_monitor().unwrap().emit(emitted, "svc.prop", json!({"x": 1}));

        let captured = manager.messages().len();
        prop_assert_eq!(captured == 1, emitted <= threshold);
    }

    /// With only a root level, every descendant resolves to it; a subtree
    /// override affects that subtree alone
    #[test]
    fn test_hierarchy_resolution(
        root in any_level(),
        sub in any_level(),
        segments in prop::collection::vec("[a-z]{1,6}", 1..4),
    ) {
        let path = format!("root.{}", segments.join("."));
        let uniform: LevelSpec = format!("root:{}", root.to_str()).parse().unwrap();
        prop_assert_eq!(uniform.resolve(&path), root);

        let first = format!("root.{}", segments[0]);
        let levels: LevelSpec = format!("root:{} {}:{}", root.to_str(), first, sub.to_str())
            .parse()
            .unwrap();
        prop_assert_eq!(levels.resolve(&path), sub);
        prop_assert_eq!(levels.resolve("root"), root);
        prop_assert_eq!(levels.resolve(&format!("{}x.other", first)), root);
    }

    /// Override strings without a root entry are rejected
    #[test]
    fn test_rootless_overrides_rejected(level in any_level(), segment in "[a-z]{1,6}") {
        let overrides = format!("root.{}:{}", segment, level.to_str());
        prop_assert!(overrides.parse::<LevelSpec>().is_err());
    }
}

// ============================================================================
// Field Shape Tests
// ============================================================================

proptest! {
    /// Strings and numbers are wrapped as `message`
    #[test]
    fn test_scalar_fields_wrapped(text in ".*", number in any::<i64>()) {
        let manager = mock_manager("debug");
        let monitor = manager.root_monitor().unwrap();
        monitor.info("svc.prop", text.as_str());
        monitor.info("svc.prop", number);

        let messages = manager.messages();
        prop_assert_eq!(messages.len(), 2);
        prop_assert_eq!(messages[0].field("message"), Some(&json!(text)));
        prop_assert_eq!(messages[1].field("message"), Some(&json!(number)));
    }

    /// Invalid shapes never escape as panics and always downgrade to `err`
    #[test]
    fn test_invalid_shapes_downgraded(flag in any::<bool>(), items in prop::collection::vec(any::<u8>(), 0..4)) {
        let manager = mock_manager("debug");
        let monitor = manager.root_monitor().unwrap();
        monitor.debug("svc.prop", flag);
        monitor.debug("svc.prop", Value::Null);
        monitor.debug("svc.prop", json!(items));

        let messages = manager.messages();
        prop_assert_eq!(messages.len(), 3);
        for record in &messages {
            prop_assert_eq!(record.severity, LogLevel::Err);
            prop_assert_eq!(record.type_tag.as_str(), "monitor.loggingError");
            prop_assert_eq!(record.field("origType"), Some(&json!("svc.prop")));
        }
    }

    /// Identical key sets serialize identically whatever their insertion order
    #[test]
    fn test_canonical_json_is_order_independent(keys in prop::collection::btree_set("[a-z]{1,5}", 1..6)) {
        let manager = mock_manager("info");
        let monitor = manager.root_monitor().unwrap();

        let forward: Fields = keys.iter().map(|k| (k.clone(), json!(k.len()))).collect();
        let backward: Fields = keys.iter().rev().map(|k| (k.clone(), json!(k.len()))).collect();
        monitor.info("svc.prop", Value::Object(forward));
        monitor.info("svc.prop", Value::Object(backward));

        let mut messages = manager.messages();
        for record in &mut messages {
            record.timestamp = 0;
        }
        prop_assert_eq!(
            messages[0].to_canonical_json().unwrap(),
            messages[1].to_canonical_json().unwrap()
        );
    }
}

// ============================================================================
// Metric Tests
// ============================================================================

proptest! {
    #[test]
    fn test_numeric_counts_emit_metric(key in "[a-z]{1,10}", val in any::<i32>()) {
        let manager = mock_manager("info");
        manager.root_monitor().unwrap().count(&key, val);

        let messages = manager.messages();
        prop_assert_eq!(messages.len(), 1);
        prop_assert_eq!(messages[0].type_tag.as_str(), "monitor.count");
        prop_assert_eq!(messages[0].field("val"), Some(&json!(val)));
    }

    #[test]
    fn test_non_numeric_measures_report_error(key in "[a-z]{1,10}", val in "[a-z]*") {
        let manager = mock_manager("info");
        manager.root_monitor().unwrap().measure(&key, val.as_str());

        let messages = manager.messages();
        prop_assert_eq!(messages.len(), 1);
        prop_assert_eq!(messages[0].type_tag.as_str(), "monitor.error");
        prop_assert_eq!(messages[0].field("key"), Some(&json!(key)));
    }
}
