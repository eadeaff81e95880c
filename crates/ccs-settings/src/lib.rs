//! # ccs-settings
//!
//! Configuration for the CCS push client, loaded from three layers (in
//! priority order):
//!
//! 1. **Compiled defaults**: [`ClientSettings::default()`]
//! 2. **User file**: `~/.ccs/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `CCS_*` overrides (highest priority)
//!
//! The only setting the send queue itself reads is `concurrency` (ack
//! slots, default 100) plus the optional `ackTimeoutMs`. Server and
//! credential sections are carried for the transport.
//!
//! # Usage
//!
//! ```no_run
//! let settings = ccs_settings::load_settings().unwrap_or_default();
//! println!("ack slots: {}", settings.concurrency);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, load_with_env,
    settings_path,
};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = ClientSettings::default();
        let _path = settings_path();
        let merged = deep_merge(serde_json::json!({"x": 1}), serde_json::json!({"y": 2}));
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }

    #[test]
    fn settings_path_is_under_dot_ccs() {
        let path = settings_path();
        assert!(path.ends_with(".ccs/settings.json"));
    }
}
