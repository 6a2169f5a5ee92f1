//! Target architectures and their multilib classification.
//!
//! A container is built for one or more device targets. Each target's
//! architecture decides which multilib group (`lib32` or `lib64`) its native
//! dependencies come from and where native libraries land inside the
//! container.
//!
//! # Example
//!
//! ```
//! use apex_schema::{Arch, Multilib};
//!
//! let arch: Arch = "arm64".parse().unwrap();
//! assert_eq!(arch.multilib(), Multilib::Lib64);
//! assert_eq!(arch.multilib().lib_dir(), "lib64");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A device CPU architecture supported by the content resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    /// 32-bit ARM.
    Arm,
    /// 64-bit ARM.
    Arm64,
    /// 64-bit RISC-V.
    Riscv64,
    /// 32-bit Intel.
    X86,
    /// 64-bit Intel/AMD.
    #[serde(rename = "x86_64")]
    X86_64,
}

/// Errors produced when decoding an architecture name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchError {
    /// The architecture name is not one of the supported values.
    #[error("unsupported arch {0:?}")]
    Unknown(String),
}

impl Arch {
    /// Every supported architecture, in declaration order.
    pub const ALL: [Arch; 5] = [
        Self::Arm,
        Self::Arm64,
        Self::Riscv64,
        Self::X86,
        Self::X86_64,
    ];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
            Self::Riscv64 => "riscv64",
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
        }
    }

    /// The multilib group this architecture belongs to.
    pub fn multilib(&self) -> Multilib {
        match self {
            Self::Arm | Self::X86 => Multilib::Lib32,
            Self::Arm64 | Self::Riscv64 | Self::X86_64 => Multilib::Lib64,
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = ArchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arm" => Ok(Self::Arm),
            "arm64" => Ok(Self::Arm64),
            "riscv64" => Ok(Self::Riscv64),
            "x86" => Ok(Self::X86),
            "x86_64" => Ok(Self::X86_64),
            _ => Err(ArchError::Unknown(s.to_string())),
        }
    }
}

/// The 32/64-bit classification of an architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multilib {
    /// 32-bit ABI.
    Lib32,
    /// 64-bit ABI.
    Lib64,
}

impl Multilib {
    /// The container directory native libraries of this ABI install to.
    pub fn lib_dir(&self) -> &'static str {
        match self {
            Self::Lib32 => "lib",
            Self::Lib64 => "lib64",
        }
    }

    /// Name used in multilib group keys (`lib32` / `lib64`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lib32 => "lib32",
            Self::Lib64 => "lib64",
        }
    }
}

/// A concrete device target a module variant or dependency request is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    /// CPU architecture of the target.
    pub arch: Arch,
    /// Relative install path for native-bridge targets; `None` for native targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_bridge: Option<String>,
}

impl Target {
    /// A plain (non native-bridge) target.
    pub fn new(arch: Arch) -> Self {
        Self {
            arch,
            native_bridge: None,
        }
    }

    /// A native-bridge target installing under `relative_path`.
    pub fn native_bridge(arch: Arch, relative_path: &str) -> Self {
        Self {
            arch,
            native_bridge: Some(relative_path.to_string()),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.native_bridge {
            Some(nb) => write!(f, "{}_{nb}", self.arch),
            None => write!(f, "{}", self.arch),
        }
    }
}

/// An undecoded target as declared in configuration.
///
/// The architecture stays a string until variant fan-out decodes it, so an
/// unknown architecture surfaces as a configuration error at that point
/// rather than as a parse failure of the whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Architecture name, e.g. `arm64`.
    pub arch: String,
    /// Relative install path for native-bridge targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_bridge: Option<String>,
}

impl TargetSpec {
    /// Decode into a typed [`Target`].
    ///
    /// # Errors
    ///
    /// Returns [`ArchError::Unknown`] if the architecture is not supported.
    pub fn decode(&self) -> Result<Target, ArchError> {
        Ok(Target {
            arch: self.arch.parse()?,
            native_bridge: self.native_bridge.clone(),
        })
    }
}

impl From<&Target> for TargetSpec {
    fn from(t: &Target) -> Self {
        Self {
            arch: t.arch.as_str().to_string(),
            native_bridge: t.native_bridge.clone(),
        }
    }
}
