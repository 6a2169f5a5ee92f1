//! Per-container information derived from a declaration.

use apex_schema::{
    ApiLevel, ContainerDecl, ContainerIdentity, FUTURE_API_LEVEL, OverrideTable, Partition,
};

use crate::config::GlobalConfig;
use crate::error::ResolveError;

/// What module variants built for a container need to know about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub identity: ContainerIdentity,
    /// Effective `min_sdk_version`, after the global override. `None` if unset.
    pub min_sdk_version: ApiLevel,
    pub updatable: bool,
    pub future_updatable: bool,
    pub use_platform_apis: bool,
    pub test: bool,
    pub vndk: bool,
    pub partition: Partition,
    /// Name checked against module `available_to` lists.
    pub available_name: String,
}

impl ContainerInfo {
    /// Derive the container info of `decl`.
    ///
    /// # Errors
    ///
    /// Returns a property error if `min_sdk_version` is not a valid API level.
    pub fn generate(
        decl: &ContainerDecl,
        overrides: &OverrideTable,
        config: &GlobalConfig,
    ) -> Result<Self, ResolveError> {
        let identity = ContainerIdentity::generate(decl, overrides);
        let declared = ApiLevel::from_optional(decl.min_sdk_version.as_deref())
            .map_err(|e| ResolveError::property(&decl.name, "min_sdk_version", e.to_string()))?;
        let global = config
            .min_sdk_override()
            .map_err(|e| ResolveError::property(&decl.name, "min_sdk_version", e))?;

        let available_name = decl
            .apex_available_name
            .clone()
            .unwrap_or_else(|| identity.variation_name().to_string());

        Ok(Self {
            min_sdk_version: declared.raised_to(&global),
            updatable: decl.updatable,
            future_updatable: decl.future_updatable,
            use_platform_apis: decl.platform_apis,
            test: decl.test,
            vndk: decl.vndk,
            partition: decl.partition,
            available_name,
            identity,
        })
    }

    pub fn variation_name(&self) -> &str {
        self.identity.variation_name()
    }

    /// Name of the shared variant for containers with the same SDK floor,
    /// e.g. `apex29`, or `apex10000` when no floor is declared.
    pub fn merged_name(&self) -> String {
        let level = if self.min_sdk_version.is_none() {
            FUTURE_API_LEVEL
        } else {
            self.min_sdk_version.final_or_future_int()
        };
        format!("apex{level}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(min_sdk: Option<&str>, config: &GlobalConfig) -> ContainerInfo {
        let mut decl = ContainerDecl::new("com.android.foo");
        decl.min_sdk_version = min_sdk.map(str::to_string);
        ContainerInfo::generate(&decl, &OverrideTable::default(), config).unwrap()
    }

    #[test]
    fn test_merged_name() {
        let config = GlobalConfig::default();
        assert_eq!(info(Some("29"), &config).merged_name(), "apex29");
        assert_eq!(info(None, &config).merged_name(), "apex10000");
        assert_eq!(info(Some("current"), &config).merged_name(), "apex10000");
    }

    #[test]
    fn test_global_override_only_raises_declared_floor() {
        let config = GlobalConfig {
            apex_global_min_sdk_version_override: Some("31".into()),
            ..GlobalConfig::default()
        };
        assert_eq!(info(Some("29"), &config).min_sdk_version, ApiLevel::Released(31));
        assert_eq!(info(Some("33"), &config).min_sdk_version, ApiLevel::Released(33));
        assert!(info(None, &config).min_sdk_version.is_none());
    }

    #[test]
    fn test_available_name_override() {
        let mut decl = ContainerDecl::new("com.android.foo.v2");
        decl.apex_available_name = Some("com.android.foo".into());
        let info =
            ContainerInfo::generate(&decl, &OverrideTable::default(), &GlobalConfig::default())
                .unwrap();
        assert_eq!(info.available_name, "com.android.foo");
        assert_eq!(info.variation_name(), "com.android.foo.v2");
    }

    #[test]
    fn test_invalid_min_sdk() {
        let mut decl = ContainerDecl::new("com.android.foo");
        decl.min_sdk_version = Some("29.1".into());
        let config = GlobalConfig::default();
        let err = ContainerInfo::generate(&decl, &OverrideTable::default(), &config).unwrap_err();
        assert!(err.to_string().contains("min_sdk_version"));
    }
}
