//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::ffi::OsString;
use std::path::PathBuf;

/// Names the host runtime library; overrides [`DEFAULT_CLR_LIBRARY_NAME`].
pub const CLR_LIBRARY_VAR: &str = "JIC_CLR_LIBRARY";
/// Names the class providing the static `getSignature` oracle; overrides [`DEFAULT_ORACLE_CLASS`].
pub const ORACLE_CLASS_VAR: &str = "JIC_ORACLE_CLASS";

/// Base name of host B's native library, decorated per platform (`libJICNE.so`, `JICNE.dll`).
pub const DEFAULT_CLR_LIBRARY_NAME: &str = "JICNE";
pub const DEFAULT_ORACLE_CLASS: &str = "me.ddayo.jic.JIC";

/// Where to find host B's entry point and host A's signature oracle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    pub clr_library: PathBuf,
    pub oracle_class: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            clr_library: libloading::library_filename(DEFAULT_CLR_LIBRARY_NAME).into(),
            oracle_class: DEFAULT_ORACLE_CLASS.to_owned(),
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Builds a config from an arbitrary variable source. Unset or empty values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup(CLR_LIBRARY_VAR).filter(|v| !v.is_empty()) {
            config.clr_library = path.into();
        }
        if let Some(class_name) = lookup(ORACLE_CLASS_VAR).filter(|v| !v.is_empty()) {
            match class_name.into_string() {
                Ok(class_name) => config.oracle_class = class_name,
                Err(raw) => log::warn!(
                    "ignoring {ORACLE_CLASS_VAR}={}: not valid UTF-8",
                    raw.to_string_lossy()
                ),
            }
        }
        log::debug!("bridge config: {config:?}");
        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let vars: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = BridgeConfig::from_lookup(lookup_in(&[]));
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.oracle_class, "me.ddayo.jic.JIC");
        let file_name = config
            .clr_library
            .file_name()
            .and_then(|name| name.to_str())
            .expect("UTF-8 file name");
        assert!(file_name.contains("JICNE"), "{file_name}");
    }

    #[test]
    fn overrides() {
        let config = BridgeConfig::from_lookup(lookup_in(&[
            (CLR_LIBRARY_VAR, "/opt/jic/libJICNE.so"),
            (ORACLE_CLASS_VAR, "com.example.Oracle"),
        ]));
        assert_eq!(config.clr_library, PathBuf::from("/opt/jic/libJICNE.so"));
        assert_eq!(config.oracle_class, "com.example.Oracle");
    }

    #[test]
    fn empty_values_keep_defaults() {
        let config = BridgeConfig::from_lookup(lookup_in(&[
            (CLR_LIBRARY_VAR, ""),
            (ORACLE_CLASS_VAR, ""),
        ]));
        assert_eq!(config, BridgeConfig::default());
    }
}
