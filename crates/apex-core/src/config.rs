//! Build-wide configuration consumed by content resolution.
//!
//! Values come from the `[config]` table of a graph snapshot and can be
//! overridden from the environment:
//!
//! | variable | field |
//! |---|---|
//! | `APEXRES_DEVICE_ARCH` | `device_arch` |
//! | `APEXRES_UNBUNDLED_BUILD` | `unbundled_build` |
//! | `APEXRES_ALLOW_MISSING_DEPENDENCIES` | `allow_missing_dependencies` |
//! | `APEXRES_BUILD_ID` | `build_id` |
//! | `EMMA_INSTRUMENT` | `emma_instrument` |

use std::sync::LazyLock;

use apex_schema::{ApiLevel, TargetSpec};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const ENV_DEVICE_ARCH: &str = "APEXRES_DEVICE_ARCH";
pub const ENV_UNBUNDLED_BUILD: &str = "APEXRES_UNBUNDLED_BUILD";
pub const ENV_ALLOW_MISSING_DEPENDENCIES: &str = "APEXRES_ALLOW_MISSING_DEPENDENCIES";
pub const ENV_BUILD_ID: &str = "APEXRES_BUILD_ID";
pub const ENV_EMMA_INSTRUMENT: &str = "EMMA_INSTRUMENT";

static BUILD_ID_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Primary device architecture. Duplicate checking is off when unset.
    pub device_arch: Option<String>,
    /// Device targets used by containers that do not declare their own.
    pub targets: Vec<TargetSpec>,
    pub unbundled_build: bool,
    pub allow_missing_dependencies: bool,
    /// Sanitizers enabled for every device module.
    pub sanitize_device: Vec<String>,
    pub build_id: String,
    /// Raises the `min_sdk_version` of containers that declare a lower one.
    pub apex_global_min_sdk_version_override: Option<String>,
    pub native_coverage: bool,
    pub emma_instrument: bool,
    pub enforce_product_partition_interface: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            device_arch: None,
            targets: Vec::new(),
            unbundled_build: false,
            allow_missing_dependencies: false,
            sanitize_device: Vec::new(),
            build_id: "eng".to_string(),
            apex_global_min_sdk_version_override: None,
            native_coverage: false,
            emma_instrument: false,
            enforce_product_partition_interface: false,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}

impl GlobalConfig {
    /// Apply overrides from the process environment.
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    #[must_use]
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(arch) = lookup(ENV_DEVICE_ARCH) {
            self.device_arch = if arch.is_empty() { None } else { Some(arch) };
        }
        if let Some(v) = lookup(ENV_UNBUNDLED_BUILD) {
            self.unbundled_build = parse_bool(&v);
        }
        if let Some(v) = lookup(ENV_ALLOW_MISSING_DEPENDENCIES) {
            self.allow_missing_dependencies = parse_bool(&v);
        }
        if let Some(v) = lookup(ENV_BUILD_ID) {
            self.build_id = v;
        }
        if let Some(v) = lookup(ENV_EMMA_INSTRUMENT) {
            self.emma_instrument = parse_bool(&v);
        }
        self
    }

    /// Whether coverage instrumentation is on in any form.
    pub fn coverage_enabled(&self) -> bool {
        self.emma_instrument || self.native_coverage
    }

    pub fn has_device_sanitizer(&self, sanitizer: &str) -> bool {
        self.sanitize_device.iter().any(|s| s == sanitizer)
    }

    /// The global `min_sdk_version` override, if one is set.
    ///
    /// # Errors
    ///
    /// Returns the offending value if it is not a valid API level.
    pub fn min_sdk_override(&self) -> Result<ApiLevel, String> {
        ApiLevel::from_optional(self.apex_global_min_sdk_version_override.as_deref())
            .map_err(|e| e.to_string())
    }

    /// The build id, checked for use as a file name suffix.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message if the id contains characters other than
    /// ASCII letters, digits, underscores, dots and dashes.
    pub fn sanitized_build_id(&self) -> Result<&str, String> {
        let re = BUILD_ID_PATTERN.as_ref().map_err(ToString::to_string)?;
        if re.is_match(&self.build_id) {
            Ok(&self.build_id)
        } else {
            Err(format!(
                "Unable to use build id {} as filename suffix, \
                 valid characters are [a-z A-Z 0-9 _ . -].",
                self.build_id
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let config = GlobalConfig::default().apply_env_from(env(&[
            (ENV_DEVICE_ARCH, "arm64"),
            (ENV_UNBUNDLED_BUILD, "1"),
            (ENV_ALLOW_MISSING_DEPENDENCIES, "true"),
            (ENV_BUILD_ID, "AP1A.240405.002"),
            (ENV_EMMA_INSTRUMENT, "false"),
        ]));
        assert_eq!(config.device_arch.as_deref(), Some("arm64"));
        assert!(config.unbundled_build);
        assert!(config.allow_missing_dependencies);
        assert_eq!(config.build_id, "AP1A.240405.002");
        assert!(!config.emma_instrument);
    }

    #[test]
    fn test_empty_device_arch_clears() {
        let config = GlobalConfig {
            device_arch: Some("arm64".into()),
            ..GlobalConfig::default()
        }
        .apply_env_from(env(&[(ENV_DEVICE_ARCH, "")]));
        assert!(config.device_arch.is_none());
    }

    #[test]
    fn test_build_id_sanitization() {
        let mut config = GlobalConfig::default();
        config.build_id = "AP1A.240405-002_x".into();
        assert!(config.sanitized_build_id().is_ok());
        config.build_id = "bad/id".into();
        assert!(config.sanitized_build_id().is_err());
        config.build_id = String::new();
        assert!(config.sanitized_build_id().is_err());
        config.build_id = "AP1A.\u{00e9}t\u{00e9}".into();
        assert!(config.sanitized_build_id().is_err());
        config.build_id = "\u{0663}\u{0664}".into();
        assert!(config.sanitized_build_id().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let config: GlobalConfig = toml::from_str(
            r#"
device_arch = "arm64"
sanitize_device = ["hwaddress"]
targets = [{ arch = "arm64" }, { arch = "arm" }]
"#,
        )
        .unwrap();
        assert!(config.has_device_sanitizer("hwaddress"));
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.build_id, "eng");
    }
}
