//! Property-based tests for applog using proptest

use applog::core::config::{parse_size, DEFAULT_MAX_BYTES};
use applog::prelude::*;
use proptest::prelude::*;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
        Just(LogLevel::Fatal),
        Just(LogLevel::Silent),
    ]
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// An event passes exactly when it is at or above a non-silent threshold
    #[test]
    fn test_level_passes_matches_order(event in any_level(), threshold in any_level()) {
        let expected = event != LogLevel::Silent
            && threshold != LogLevel::Silent
            && (event as u8) >= (threshold as u8);
        prop_assert_eq!(event.passes(threshold), expected);
    }

    /// Config strings parse back to the same level
    #[test]
    fn test_level_config_str_roundtrip(level in any_level()) {
        let parsed: LogLevel = level.as_config_str().parse().unwrap();
        prop_assert_eq!(parsed, level);
        let parsed_upper: LogLevel = level.to_str().parse().unwrap();
        prop_assert_eq!(parsed_upper, level);
    }
}

// ============================================================================
// Size parsing
// ============================================================================

proptest! {
    #[test]
    fn test_parse_size_valid(n in 0u64..1_000_000, unit in prop_oneof![
        Just(('b', 1u64)),
        Just(('k', 1024)),
        Just(('m', 1024 * 1024)),
        Just(('g', 1024 * 1024 * 1024)),
        Just(('K', 1024)),
        Just(('M', 1024 * 1024)),
    ]) {
        let (suffix, multiplier) = unit;
        prop_assert_eq!(parse_size(&format!("{}{}", n, suffix)), n * multiplier);
    }

    /// Strings without a recognized unit never parse to anything but the default
    #[test]
    fn test_parse_size_rejects_unitless(s in "[0-9]{0,8}[acdefhijlnopqrstuvwxyz]?") {
        prop_assert_eq!(parse_size(&s), DEFAULT_MAX_BYTES);
    }

    /// Resolution never fails, whatever the variables contain
    #[test]
    fn test_config_resolution_total(
        level in ".{0,12}",
        size in ".{0,12}",
        files in ".{0,6}",
        env in prop_oneof![Just("development"), Just("staging"), Just("production"), Just("??")],
    ) {
        let vars: HashMap<String, String> = [
            ("APP_ENV", env.to_string()),
            ("LOG_LEVEL", level),
            ("LOG_MAX_SIZE", size),
            ("LOG_MAX_FILES", files),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let config = LoggerConfig::from_vars(&vars);
        let max_bytes = config.file.max_bytes();
        if max_bytes != DEFAULT_MAX_BYTES {
            prop_assert_eq!(max_bytes, parse_size(&config.file.max_size));
        }
        if config.environment == Environment::Production {
            prop_assert!(config.file.enabled);
            prop_assert!(config.file.json_format);
        }
        if config.environment == Environment::Development {
            prop_assert_eq!(config.level, LogLevel::Debug);
        }
    }
}

// ============================================================================
// Output
// ============================================================================

proptest! {
    /// JSON lines are single lines whose message survives untouched
    #[test]
    fn test_json_line_preserves_message(message in "\\PC{0,64}|[\\n\\r\\t\"\\\\]{1,8}") {
        let event = LogEvent::new(LogLevel::Info, message.clone()).with_tag("prop");
        let line = OutputFormat::Json.format(&event).unwrap();

        prop_assert!(!line.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        prop_assert_eq!(parsed["message"].as_str(), Some(message.as_str()));
    }

    /// Text lines never contain a raw line break
    #[test]
    fn test_text_line_is_single_line(message in "[a-z\\n\\r ]{0,40}", key in "[a-z]{1,8}", value in "[a-z\\n]{0,10}") {
        let event = LogEvent::new(LogLevel::Warn, message)
            .with_data(LogContext::new().with_field(key, value));
        let line = OutputFormat::Text.format(&event).unwrap();
        prop_assert!(!line.contains('\n'));
        prop_assert!(!line.contains('\r'));
    }

    /// Merging is last-writer-wins and keeps every key
    #[test]
    fn test_context_merge(
        base in proptest::collection::btree_map("[a-d]", 0i64..100, 0..4),
        patch in proptest::collection::btree_map("[a-d]", 100i64..200, 0..4),
    ) {
        let base_ctx: LogContext = base.clone().into_iter().collect();
        let patch_ctx: LogContext = patch.clone().into_iter().collect();
        let merged = base_ctx.merged(&patch_ctx);

        for (key, value) in &patch {
            prop_assert_eq!(merged.get(key), Some(&FieldValue::Int(*value)));
        }
        for (key, value) in &base {
            if !patch.contains_key(key) {
                prop_assert_eq!(merged.get(key), Some(&FieldValue::Int(*value)));
            }
        }
    }
}

// ============================================================================
// Rotation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Files never outgrow the limit unless a single line is larger than it,
    /// and no byte is lost across rotations
    #[test]
    fn test_rotation_bounds(
        max in 16u64..256,
        lengths in proptest::collection::vec(0usize..300, 1..40),
    ) {
        let dir = TempDir::new().unwrap();
        let transport = FileTransport::open(
            dir.path(),
            RotationPolicy::new().with_max_size(max).with_max_files(0),
        ).unwrap();

        let mut expected_total = 0u64;
        for (i, len) in lengths.iter().enumerate() {
            let line = "x".repeat(*len);
            let before = transport.rotation_count();
            let size_before = transport.current_size();
            transport.write(&line).unwrap();
            let written = *len as u64 + 1;
            expected_total += written;

            let rotated = transport.rotation_count() > before;
            let should_rotate = size_before >= max || (size_before > 0 && size_before + written > max);
            prop_assert_eq!(rotated, should_rotate, "write {}", i);
            if rotated {
                prop_assert_eq!(transport.current_size(), written);
            }
        }
        transport.close().unwrap();

        let mut total = 0u64;
        for entry in fs::read_dir(dir.path()).unwrap() {
            let len = entry.unwrap().metadata().unwrap().len();
            let largest_line = lengths.iter().max().copied().unwrap_or(0) as u64 + 1;
            prop_assert!(len <= max.max(largest_line));
            total += len;
        }
        prop_assert_eq!(total, expected_total);
    }
}
