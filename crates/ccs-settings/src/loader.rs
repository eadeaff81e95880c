//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ClientSettings::default()`]
//! 2. If `~/.ccs/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `CCS_*` environment variable overrides (highest priority)
//! 4. [`ClientSettings::validate`]
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::ClientSettings;

/// Resolve the path to the settings file (`~/.ccs/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".ccs").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ClientSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<ClientSettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

/// Load settings from `path`, reading overrides through `env`.
pub fn load_with_env(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings> {
    let defaults = serde_json::to_value(ClientSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: ClientSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, env);
    settings.validate();
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `CCS_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut ClientSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply `CCS_*` overrides read through `env`.
///
/// Invalid values are ignored with a warning (fall back to file/default).
pub fn apply_overrides(settings: &mut ClientSettings, env: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| env(name).filter(|v| !v.is_empty());

    if let Some(v) = read("CCS_CONCURRENCY") {
        match parse_usize_range(&v, 1, 10_000) {
            Some(n) => settings.concurrency = n,
            None => warn_invalid("CCS_CONCURRENCY", &v),
        }
    }
    if let Some(v) = read("CCS_ACK_TIMEOUT_MS") {
        match parse_u64_range(&v, 0, 3_600_000) {
            Some(0) => settings.ack_timeout_ms = None,
            Some(n) => settings.ack_timeout_ms = Some(n),
            None => warn_invalid("CCS_ACK_TIMEOUT_MS", &v),
        }
    }
    if let Some(v) = read("CCS_EVENT_CAPACITY") {
        match parse_usize_range(&v, 1, 1_048_576) {
            Some(n) => settings.event_capacity = n,
            None => warn_invalid("CCS_EVENT_CAPACITY", &v),
        }
    }
    if let Some(v) = read("CCS_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("CCS_PORT") {
        match parse_u16_range(&v, 1, 65535) {
            Some(n) => settings.server.port = n,
            None => warn_invalid("CCS_PORT", &v),
        }
    }
    if let Some(v) = read("CCS_SENDER_ID") {
        settings.credentials.sender_id = v;
    }
    if let Some(v) = read("CCS_SERVER_KEY") {
        settings.credentials.server_key = v;
    }
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "invalid env var, ignoring");
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use serde_json::json;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn missing_file_gives_defaults() {
        let s = load_with_env(Path::new("/nonexistent/settings.json"), no_env).unwrap();
        assert_eq!(s, ClientSettings::default());
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"concurrency": 50, "server": {"port": 5236}, "credentials": {"senderId": "42"}}"#,
        )
        .unwrap();

        let s = load_with_env(&path, no_env).unwrap();
        assert_eq!(s.concurrency, 50);
        assert_eq!(s.server.port, 5236);
        assert_eq!(s.server.host, "fcm-xmpp.googleapis.com");
        assert_eq!(s.credentials.sender_id, "42");
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_with_env(&path, no_env),
            Err(crate::SettingsError::Json(_))
        ));
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"concurrency": 50}"#).unwrap();

        let env = env_from(&[
            ("CCS_CONCURRENCY", "10"),
            ("CCS_ACK_TIMEOUT_MS", "2500"),
            ("CCS_HOST", "localhost"),
            ("CCS_SERVER_KEY", "k"),
        ]);
        let s = load_with_env(&path, env).unwrap();
        assert_eq!(s.concurrency, 10);
        assert_eq!(s.ack_timeout_ms, Some(2500));
        assert_eq!(s.server.host, "localhost");
        assert_eq!(s.credentials.server_key, "k");
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut s = ClientSettings::default();
        apply_overrides(
            &mut s,
            env_from(&[
                ("CCS_CONCURRENCY", "0"),
                ("CCS_PORT", "99999"),
                ("CCS_EVENT_CAPACITY", "lots"),
            ]),
        );
        assert_eq!(s.concurrency, 100);
        assert_eq!(s.server.port, 5235);
        assert_eq!(s.event_capacity, 1024);
    }

    #[test]
    fn zero_ack_timeout_env_disables() {
        let mut s = ClientSettings {
            ack_timeout_ms: Some(1000),
            ..ClientSettings::default()
        };
        apply_overrides(&mut s, env_from(&[("CCS_ACK_TIMEOUT_MS", "0")]));
        assert_eq!(s.ack_timeout_ms, None);
    }

    #[test]
    fn empty_env_values_are_skipped() {
        let mut s = ClientSettings::default();
        apply_overrides(&mut s, env_from(&[("CCS_HOST", "")]));
        assert_eq!(s.server.host, "fcm-xmpp.googleapis.com");
    }

    #[test]
    fn deep_merge_nested_objects() {
        let merged = deep_merge(
            json!({"a": {"b": 1, "c": 2}, "d": [1, 2]}),
            json!({"a": {"c": 3}, "d": [9], "e": null}),
        );
        assert_eq!(merged, json!({"a": {"b": 1, "c": 3}, "d": [9]}));
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("8080", 1, 65535), Some(8080));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u64_range("abc", 0, 10), None);
        assert_eq!(parse_usize_range("10001", 1, 10_000), None);
        assert_eq!(parse_usize_range("100", 1, 10_000), Some(100));
    }
}
