//! API levels used for `min_sdk_version` floors and SDK compatibility checks.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The integer used for any API level that has not been finalized yet.
pub const FUTURE_API_LEVEL: u32 = 10_000;

/// A platform API level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(into = "String", try_from = "String")]
pub enum ApiLevel {
    /// No level was declared.
    #[default]
    None,
    /// A finalized, numbered API level.
    Released(u32),
    /// An in-development codename (e.g. `Baklava`).
    Codename(String),
    /// The moving `current` level.
    Current,
}

/// Errors produced when decoding an API level string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiLevelError {
    /// The string is neither a number, `current`, nor a codename.
    #[error("invalid API level {0:?}")]
    Invalid(String),
}

impl ApiLevel {
    /// Decode an optional declared value; `None` and the empty string mean "not set".
    ///
    /// # Errors
    ///
    /// Returns [`ApiLevelError::Invalid`] for malformed values.
    pub fn from_optional(value: Option<&str>) -> Result<Self, ApiLevelError> {
        match value {
            None => Ok(Self::None),
            Some(v) => v.parse(),
        }
    }

    /// Whether no level was declared.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Whether this is the moving `current` level.
    pub fn is_current(&self) -> bool {
        matches!(self, Self::Current)
    }

    /// The numeric level, mapping everything unfinalized to [`FUTURE_API_LEVEL`].
    pub fn final_or_future_int(&self) -> u32 {
        match self {
            Self::Released(n) => *n,
            Self::None | Self::Codename(_) | Self::Current => FUTURE_API_LEVEL,
        }
    }

    /// Returns the higher of `self` and `other` by
    /// [`final_or_future_int`](Self::final_or_future_int), ignoring an unset `other`.
    #[must_use]
    pub fn raised_to(self, other: &ApiLevel) -> ApiLevel {
        if other.is_none() || self.is_none() {
            return self;
        }
        if other.final_or_future_int() > self.final_or_future_int() {
            other.clone()
        } else {
            self
        }
    }
}

impl std::fmt::Display for ApiLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Released(n) => write!(f, "{n}"),
            Self::Codename(c) => write!(f, "{c}"),
            Self::Current => write!(f, "current"),
        }
    }
}

impl std::str::FromStr for ApiLevel {
    type Err = ApiLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::None);
        }
        if s == "current" {
            return Ok(Self::Current);
        }
        if let Ok(n) = s.parse::<u32>() {
            return Ok(Self::Released(n));
        }
        if s.chars().next().is_some_and(char::is_alphabetic)
            && s.chars().all(char::is_alphanumeric)
        {
            return Ok(Self::Codename(s.to_string()));
        }
        Err(ApiLevelError::Invalid(s.to_string()))
    }
}

impl From<ApiLevel> for String {
    fn from(level: ApiLevel) -> Self {
        level.to_string()
    }
}

impl TryFrom<String> for ApiLevel {
    type Error = ApiLevelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Whether an SDK version string names a stable, finalized SDK.
///
/// Stable means a numbered level, optionally prefixed with an SDK kind
/// (`29`, `system_31`, `module_33`). The platform (empty), `current` in any
/// kind, `core_platform` and `none` are all unstable.
pub fn is_stable_sdk_version(sdk_version: &str) -> bool {
    let level = sdk_version.rsplit('_').next().unwrap_or(sdk_version);
    !level.is_empty() && level.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!("".parse::<ApiLevel>().unwrap(), ApiLevel::None);
        assert_eq!("current".parse::<ApiLevel>().unwrap(), ApiLevel::Current);
        assert_eq!("29".parse::<ApiLevel>().unwrap(), ApiLevel::Released(29));
        assert_eq!(
            "Baklava".parse::<ApiLevel>().unwrap(),
            ApiLevel::Codename("Baklava".to_string())
        );
        assert!("29.1".parse::<ApiLevel>().is_err());
    }

    #[test]
    fn test_final_or_future() {
        assert_eq!(ApiLevel::Released(30).final_or_future_int(), 30);
        assert_eq!(ApiLevel::Current.final_or_future_int(), FUTURE_API_LEVEL);
        assert_eq!(ApiLevel::None.final_or_future_int(), FUTURE_API_LEVEL);
    }

    #[test]
    fn test_raised_to_only_moves_up() {
        let base = ApiLevel::Released(29);
        assert_eq!(
            base.clone().raised_to(&ApiLevel::Released(31)),
            ApiLevel::Released(31)
        );
        assert_eq!(base.clone().raised_to(&ApiLevel::Released(28)), base);
        assert_eq!(ApiLevel::None.raised_to(&ApiLevel::Released(31)), ApiLevel::None);
    }

    #[test]
    fn test_stable_sdk_versions() {
        assert!(is_stable_sdk_version("29"));
        assert!(is_stable_sdk_version("system_31"));
        assert!(is_stable_sdk_version("module_33"));
        assert!(!is_stable_sdk_version(""));
        assert!(!is_stable_sdk_version("current"));
        assert!(!is_stable_sdk_version("system_current"));
        assert!(!is_stable_sdk_version("module_current"));
        assert!(!is_stable_sdk_version("system_"));
        assert!(!is_stable_sdk_version("core_platform"));
        assert!(!is_stable_sdk_version("none"));
    }
}
