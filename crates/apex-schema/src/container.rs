//! Container declarations and their identity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::arch::{Arch, TargetSpec};

/// Partition a container installs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// The system partition.
    #[default]
    System,
    /// The system_ext partition.
    SystemExt,
    /// The vendor partition.
    Vendor,
    /// The odm partition.
    Odm,
    /// The product partition.
    Product,
}

/// Native dependency names with their exclusions.
///
/// The same shape is used at the top level of a declaration, in each
/// multilib group and in each architecture group. At the top level,
/// `filesystems` are requested for the common architecture and `prebuilts`
/// for the preferred 64-bit target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeDeps {
    /// Shared libraries.
    pub native_shared_libs: Vec<String>,
    /// Libraries used through JNI.
    pub jni_libs: Vec<String>,
    /// Rust dylibs.
    pub rust_dyn_libs: Vec<String>,
    /// Executables.
    pub binaries: Vec<String>,
    /// Test executables.
    pub tests: Vec<String>,
    /// Filesystem images.
    pub filesystems: Vec<String>,
    /// Prebuilt etc files.
    pub prebuilts: Vec<String>,
    /// Removed from `native_shared_libs`.
    pub exclude_native_shared_libs: Vec<String>,
    /// Removed from `jni_libs`.
    pub exclude_jni_libs: Vec<String>,
    /// Removed from `rust_dyn_libs`.
    pub exclude_rust_dyn_libs: Vec<String>,
    /// Removed from `binaries`.
    pub exclude_binaries: Vec<String>,
    /// Removed from `tests`.
    pub exclude_tests: Vec<String>,
    /// Removed from `filesystems`.
    pub exclude_filesystems: Vec<String>,
    /// Removed from `prebuilts`.
    pub exclude_prebuilts: Vec<String>,
}

impl NativeDeps {
    /// Append every include and exclude list of `other`.
    pub fn merge(&mut self, other: &NativeDeps) {
        self.native_shared_libs
            .extend_from_slice(&other.native_shared_libs);
        self.jni_libs.extend_from_slice(&other.jni_libs);
        self.rust_dyn_libs.extend_from_slice(&other.rust_dyn_libs);
        self.binaries.extend_from_slice(&other.binaries);
        self.tests.extend_from_slice(&other.tests);
        self.filesystems.extend_from_slice(&other.filesystems);
        self.prebuilts.extend_from_slice(&other.prebuilts);
        self.exclude_native_shared_libs
            .extend_from_slice(&other.exclude_native_shared_libs);
        self.exclude_jni_libs
            .extend_from_slice(&other.exclude_jni_libs);
        self.exclude_rust_dyn_libs
            .extend_from_slice(&other.exclude_rust_dyn_libs);
        self.exclude_binaries
            .extend_from_slice(&other.exclude_binaries);
        self.exclude_tests.extend_from_slice(&other.exclude_tests);
        self.exclude_filesystems
            .extend_from_slice(&other.exclude_filesystems);
        self.exclude_prebuilts
            .extend_from_slice(&other.exclude_prebuilts);
    }

    /// Whether no include list has entries.
    pub fn is_empty(&self) -> bool {
        self.native_shared_libs.is_empty()
            && self.jni_libs.is_empty()
            && self.rust_dyn_libs.is_empty()
            && self.binaries.is_empty()
            && self.tests.is_empty()
            && self.filesystems.is_empty()
            && self.prebuilts.is_empty()
    }
}

/// Per-multilib dependency groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultilibGroups {
    /// Requested for the primary target only.
    pub first: NativeDeps,
    /// Requested for every target.
    pub both: NativeDeps,
    /// Requested for 32-bit targets, or for 64-bit ones when no 32-bit target exists.
    pub prefer32: NativeDeps,
    /// Requested for 32-bit targets.
    pub lib32: NativeDeps,
    /// Requested for 64-bit targets.
    pub lib64: NativeDeps,
}

/// Per-architecture dependency groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchGroups {
    /// `arch.arm`.
    pub arm: NativeDeps,
    /// `arch.arm64`.
    pub arm64: NativeDeps,
    /// `arch.riscv64`.
    pub riscv64: NativeDeps,
    /// `arch.x86`.
    pub x86: NativeDeps,
    /// `arch.x86_64`.
    pub x86_64: NativeDeps,
}

impl ArchGroups {
    /// The group for `arch`.
    pub fn for_arch(&self, arch: Arch) -> &NativeDeps {
        match arch {
            Arch::Arm => &self.arm,
            Arch::Arm64 => &self.arm64,
            Arch::Riscv64 => &self.riscv64,
            Arch::X86 => &self.x86,
            Arch::X86_64 => &self.x86_64,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A container declaration as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDecl {
    /// Base module name, e.g. `com.android.foo`.
    pub name: String,
    /// Declared `min_sdk_version`.
    #[serde(default)]
    pub min_sdk_version: Option<String>,
    /// Whether the container updates independently of the platform.
    #[serde(default = "default_true")]
    pub updatable: bool,
    /// Will become updatable in a future release.
    #[serde(default)]
    pub future_updatable: bool,
    /// Compiles against platform (non-SDK) APIs.
    #[serde(default)]
    pub platform_apis: bool,
    /// A test container.
    #[serde(default)]
    pub test: bool,
    /// The VNDK container.
    #[serde(default)]
    pub vndk: bool,
    /// A coverage-instrumented variant.
    #[serde(default)]
    pub coverage_variant: bool,
    /// Whether the container gets installed.
    #[serde(default = "default_true")]
    pub installable: bool,
    /// Partition the container installs to.
    #[serde(default)]
    pub partition: Partition,
    /// Device targets, primary first.
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    /// Top-level native dependencies.
    #[serde(flatten)]
    pub native: NativeDeps,
    /// `multilib.*` groups.
    #[serde(default)]
    pub multilib: MultilibGroups,
    /// `arch.*` groups.
    #[serde(default)]
    pub arch: ArchGroups,
    /// Shell script binaries.
    #[serde(default)]
    pub sh_binaries: Vec<String>,
    /// Java libraries.
    #[serde(default)]
    pub java_libs: Vec<String>,
    /// Applications.
    #[serde(default)]
    pub apps: Vec<String>,
    /// Runtime resource overlays.
    #[serde(default)]
    pub rros: Vec<String>,
    /// BPF programs.
    #[serde(default)]
    pub bpfs: Vec<String>,
    /// Compat configs.
    #[serde(default)]
    pub compat_configs: Vec<String>,
    /// Bootclasspath fragments.
    #[serde(default)]
    pub bootclasspath_fragments: Vec<String>,
    /// System server classpath fragments.
    #[serde(default)]
    pub systemserverclasspath_fragments: Vec<String>,
    /// Signing key module.
    #[serde(default)]
    pub key: Option<String>,
    /// Certificate module.
    #[serde(default)]
    pub certificate: Option<String>,
    /// Transitive dependencies to keep out of the payload.
    #[serde(default)]
    pub unwanted_transitive_deps: Vec<String>,
    /// Install bootstrap libraries to the regular lib dir.
    #[serde(default)]
    pub ignore_system_library_special_case: bool,
    /// Name checked against `available_to` instead of the variation name.
    #[serde(default)]
    pub apex_available_name: Option<String>,
    /// Sanitizers enabled for the container.
    #[serde(default)]
    pub sanitizers: Vec<String>,
}

impl ContainerDecl {
    /// A declaration with default flags and no dependencies.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            min_sdk_version: None,
            updatable: true,
            future_updatable: false,
            platform_apis: false,
            test: false,
            vndk: false,
            coverage_variant: false,
            installable: true,
            partition: Partition::System,
            targets: Vec::new(),
            native: NativeDeps::default(),
            multilib: MultilibGroups::default(),
            arch: ArchGroups::default(),
            sh_binaries: Vec::new(),
            java_libs: Vec::new(),
            apps: Vec::new(),
            rros: Vec::new(),
            bpfs: Vec::new(),
            compat_configs: Vec::new(),
            bootclasspath_fragments: Vec::new(),
            systemserverclasspath_fragments: Vec::new(),
            key: None,
            certificate: None,
            unwanted_transitive_deps: Vec::new(),
            ignore_system_library_special_case: false,
            apex_available_name: None,
            sanitizers: Vec::new(),
        }
    }

    /// Whether the declaration enables `sanitizer`.
    pub fn has_sanitizer(&self, sanitizer: &str) -> bool {
        self.sanitizers.iter().any(|s| s == sanitizer)
    }
}

/// An `override_apex` entry: a renamed copy of a base container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerOverride {
    /// Name of the overriding container.
    pub name: String,
    /// Replacement signing key.
    #[serde(default)]
    pub key: Option<String>,
    /// Replacement certificate.
    #[serde(default)]
    pub certificate: Option<String>,
    /// Replacement app list.
    #[serde(default)]
    pub apps: Option<Vec<String>>,
}

/// Overrides keyed by the base container name they apply to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideTable(pub BTreeMap<String, ContainerOverride>);

impl OverrideTable {
    /// The override for `base_name`, if any.
    pub fn get(&self, base_name: &str) -> Option<&ContainerOverride> {
        self.0.get(base_name)
    }

    /// Register `entry` as overriding `base_name`.
    pub fn insert(&mut self, base_name: &str, entry: ContainerOverride) {
        self.0.insert(base_name.to_string(), entry);
    }

    /// Apply the overridable properties of a matching entry to `decl`.
    pub fn apply(&self, decl: &ContainerDecl) -> ContainerDecl {
        let mut out = decl.clone();
        if let Some(o) = self.get(&decl.name) {
            if o.key.is_some() {
                out.key.clone_from(&o.key);
            }
            if o.certificate.is_some() {
                out.certificate.clone_from(&o.certificate);
            }
            if let Some(apps) = &o.apps {
                out.apps.clone_from(apps);
            }
        }
        out
    }
}

/// The resolved name of a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerIdentity {
    /// Name of the declaring module.
    pub base_name: String,
    /// Name of the overriding container, if one exists.
    pub overridden_name: Option<String>,
}

impl ContainerIdentity {
    /// Resolve the identity of `decl` against `overrides`.
    pub fn generate(decl: &ContainerDecl, overrides: &OverrideTable) -> Self {
        Self {
            base_name: decl.name.clone(),
            overridden_name: overrides.get(&decl.name).map(|o| o.name.clone()),
        }
    }

    /// The name used for module variants: the overriding name if present.
    pub fn variation_name(&self) -> &str {
        self.overridden_name.as_deref().unwrap_or(&self.base_name)
    }
}

impl std::fmt::Display for ContainerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.variation_name())
    }
}
