//! Modules of the build graph as seen by the content resolver.
//!
//! A [`Module`] is one variant of a build unit: a name, an optional target,
//! its kind-specific metadata and the files it produced. Modules are
//! immutable inputs owned by the module graph arena and addressed through
//! [`ModuleId`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api_level::ApiLevel;
use crate::arch::{Multilib, Target};

/// Pseudo container name meaning "installed on the platform, outside any container".
pub const AVAILABLE_TO_PLATFORM: &str = "//apex_available:platform";

/// Pseudo container name matching every container but not the platform.
pub const AVAILABLE_TO_ANY_APEX: &str = "//apex_available:anyapex";

/// Libraries installed to the bootstrap location instead of the regular lib dir.
pub const BOOTSTRAP_LIBRARIES: &[&str] = &[
    "libc",
    "libm",
    "libdl",
    "libdl_android",
    "linker",
    "libclang_rt.hwasan",
    "libc_hwasan",
];

/// Index of a module inside a module graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub u32);

impl ModuleId {
    /// Position of the module in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability flags of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// The module participates in the build at all.
    pub enabled: bool,
    /// The module can be built for, and embedded in, a container.
    pub can_be_payload: bool,
    /// The library offers stub variants for consumers outside its container.
    pub has_stubs_variants: bool,
    /// The module is itself a stub variant.
    pub is_stubs: bool,
    /// The stub implementation must be installed on the platform.
    pub stubs_implementation_required: bool,
    /// The module never installs on the platform.
    pub not_in_platform: bool,
    /// The module asks for one variant per container instead of merged variants.
    pub unique_apex_variations: bool,
    /// The executable is fully statically linked.
    pub static_executable: bool,
    /// The module always needs a platform variant.
    pub always_requires_platform_variant: bool,
    /// A prebuilt import standing in for a source module of the same name.
    pub prebuilt: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            enabled: true,
            can_be_payload: true,
            has_stubs_variants: false,
            is_stubs: false,
            stubs_implementation_required: false,
            not_in_platform: false,
            unique_apex_variations: false,
            static_executable: false,
            always_requires_platform_variant: false,
            prebuilt: false,
        }
    }
}

/// The generated `classpaths.proto` config of a classpath fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClasspathProto {
    /// Whether generation is enabled (`generate_classpaths_proto`).
    #[serde(default = "default_true")]
    pub generated: bool,
    /// Path of the generated config.
    pub output: PathBuf,
    /// Container-relative install directory.
    pub install_dir: String,
}

fn default_true() -> bool {
    true
}

fn default_etc() -> String {
    "etc".to_string()
}

/// Kind-specific metadata of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleKind {
    /// A native shared library (C/C++ or Rust FFI/dylib).
    NativeLibrary {
        /// Name of the implementation module to install when only stubs are linked.
        #[serde(default)]
        implementation_name: Option<String>,
    },
    /// A native static library.
    StaticLibrary,
    /// A native executable.
    NativeExecutable,
    /// A shell script binary.
    ShBinary {
        /// Subdirectory below `bin`.
        #[serde(default)]
        sub_dir: String,
    },
    /// A dex-compiled Java library.
    JavaLibrary {
        /// Installed jar stem; defaults to the module name.
        #[serde(default)]
        stem: Option<String>,
        /// Dex implementation jar; `None` if not compiled into dex.
        #[serde(default)]
        dex_jar: Option<PathBuf>,
        /// SDK the library compiles against.
        #[serde(default)]
        sdk_version: String,
        /// Dexpreopt profile produced on the host.
        #[serde(default)]
        profile: Option<PathBuf>,
    },
    /// An Android application.
    App {
        /// Installed in `priv-app` rather than `app`.
        #[serde(default)]
        privileged: bool,
        /// APK directory name; defaults to the module name.
        #[serde(default)]
        apk_name: Option<String>,
        /// The output is an app set rather than a single APK.
        #[serde(default)]
        app_set: bool,
        /// A helper app for tests.
        #[serde(default)]
        test_helper: bool,
        /// Declares `updatable: true`.
        #[serde(default)]
        updatable: bool,
        /// SDK the app compiles against.
        #[serde(default)]
        sdk_version: String,
        /// Privileged-permission allowlist shipped with the app.
        #[serde(default)]
        priv_app_allowlist: Option<PathBuf>,
        /// Signing certificate name.
        #[serde(default)]
        certificate: Option<String>,
        /// Overridden manifest package name.
        #[serde(default)]
        overridden_package_name: Option<String>,
    },
    /// A runtime resource overlay.
    Rro {
        /// Overlay theme subdirectory.
        #[serde(default)]
        theme: String,
        /// Signing certificate name.
        #[serde(default)]
        certificate: Option<String>,
    },
    /// A BPF program; every output is installed.
    Bpf {
        /// Subdirectory below `etc/bpf`.
        #[serde(default)]
        sub_dir: String,
    },
    /// A filesystem image.
    Filesystem,
    /// A prebuilt etc file; every output is installed.
    PrebuiltEtc {
        /// Base directory, `etc` unless overridden.
        #[serde(default = "default_etc")]
        base_dir: String,
        /// Subdirectory below the base directory.
        #[serde(default)]
        sub_dir: String,
    },
    /// A platform compat config.
    CompatConfig {
        /// Subdirectory below `etc`.
        #[serde(default)]
        sub_dir: String,
    },
    /// A bootclasspath fragment.
    BootclasspathFragment {
        /// Generated classpaths config.
        #[serde(default)]
        classpath_proto: Option<ClasspathProto>,
        /// Container-relative install path of the boot image profile.
        #[serde(default)]
        profile_in_apex: Option<String>,
        /// Boot image profile on the host, if it could be generated.
        #[serde(default)]
        profile_on_host: Option<PathBuf>,
        /// Hidden-API encoded dex boot jar per content library.
        #[serde(default)]
        dex_boot_jars: BTreeMap<String, PathBuf>,
    },
    /// A system server classpath fragment.
    SystemServerClasspathFragment {
        /// Generated classpaths config.
        #[serde(default)]
        classpath_proto: Option<ClasspathProto>,
    },
    /// A container signing key pair.
    ApexKey {
        /// Public key file.
        public_key: PathBuf,
        /// Private key file.
        private_key: PathBuf,
    },
    /// An app/container certificate.
    Certificate {
        /// PEM certificate.
        pem: PathBuf,
        /// Private key.
        key: PathBuf,
    },
    /// A VINTF manifest fragment.
    VintfFragment,
    /// Headers or anything else with no install-side presence.
    Other,
}

impl ModuleKind {
    /// Short kind name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NativeLibrary { .. } => "native_library",
            Self::StaticLibrary => "static_library",
            Self::NativeExecutable => "native_executable",
            Self::ShBinary { .. } => "sh_binary",
            Self::JavaLibrary { .. } => "java_library",
            Self::App { .. } => "app",
            Self::Rro { .. } => "rro",
            Self::Bpf { .. } => "bpf",
            Self::Filesystem => "filesystem",
            Self::PrebuiltEtc { .. } => "prebuilt_etc",
            Self::CompatConfig { .. } => "compat_config",
            Self::BootclasspathFragment { .. } => "bootclasspath_fragment",
            Self::SystemServerClasspathFragment { .. } => "systemserverclasspath_fragment",
            Self::ApexKey { .. } => "apex_key",
            Self::Certificate { .. } => "certificate",
            Self::VintfFragment => "vintf_fragment",
            Self::Other => "other",
        }
    }
}

/// One variant of a build unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Stable module name.
    pub name: String,
    /// Device target of this variant; `None` for common-arch modules.
    #[serde(default)]
    pub target: Option<Target>,
    /// Kind-specific metadata.
    #[serde(flatten)]
    pub kind: ModuleKind,
    /// Capability flags.
    #[serde(flatten)]
    pub caps: Capabilities,
    /// Files produced by the module, primary output first.
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
    /// Containers (or patterns) the module may be embedded in.
    #[serde(default)]
    pub available_to: Vec<String>,
    /// Declared `min_sdk_version`.
    #[serde(default)]
    pub min_sdk_version: ApiLevel,
    /// Variant suffix appended to the name for install-side naming.
    #[serde(default)]
    pub sub_name: String,
    /// Extra directory appended below the role install directory.
    #[serde(default)]
    pub relative_install_path: String,
    /// Symlink names installed next to the primary output.
    #[serde(default)]
    pub symlinks: Vec<String>,
}

impl Module {
    /// A module with default capabilities and no outputs.
    pub fn new(name: &str, kind: ModuleKind) -> Self {
        Self {
            name: name.to_string(),
            target: None,
            kind,
            caps: Capabilities::default(),
            outputs: Vec::new(),
            available_to: Vec::new(),
            min_sdk_version: ApiLevel::None,
            sub_name: String::new(),
            relative_install_path: String::new(),
            symlinks: Vec::new(),
        }
    }

    /// The primary output file.
    pub fn primary_output(&self) -> Option<&Path> {
        self.outputs.first().map(PathBuf::as_path)
    }

    /// Multilib of the module's target, if it has one.
    pub fn multilib(&self) -> Option<Multilib> {
        self.target.as_ref().map(|t| t.arch.multilib())
    }

    /// Whether the module is a native linkable (library or executable).
    pub fn is_linkable(&self) -> bool {
        matches!(
            self.kind,
            ModuleKind::NativeLibrary { .. }
                | ModuleKind::StaticLibrary
                | ModuleKind::NativeExecutable
        )
    }

    /// Whether the module has something to install inside a container.
    pub fn installable_to_apex(&self) -> bool {
        !matches!(
            self.kind,
            ModuleKind::StaticLibrary | ModuleKind::VintfFragment | ModuleKind::Other
        )
    }

    /// Whether the module installs to the bootstrap location.
    pub fn install_to_bootstrap(&self) -> bool {
        BOOTSTRAP_LIBRARIES.contains(&self.name.as_str())
    }

    /// Whether the module may be embedded in (or installed as) `what`.
    pub fn available_for(&self, what: &str) -> bool {
        check_available_for(what, &self.available_to)
    }
}

/// Match a container (or platform) name against an `available_to` list.
///
/// An empty list means platform only. `//apex_available:anyapex` matches any
/// container but not the platform, and `prefix.*` matches names starting
/// with `prefix.`.
pub fn check_available_for(what: &str, available_to: &[String]) -> bool {
    if available_to.is_empty() {
        return what == AVAILABLE_TO_PLATFORM;
    }
    available_to.iter().any(|entry| {
        if entry == what {
            return true;
        }
        if entry == AVAILABLE_TO_ANY_APEX && what != AVAILABLE_TO_PLATFORM {
            return true;
        }
        entry
            .strip_suffix('*')
            .is_some_and(|prefix| entry.ends_with(".*") && what.starts_with(prefix))
    })
}

/// Problems with the entries of an `available_to` list.
pub fn invalid_available_to_entries(available_to: &[String]) -> Vec<String> {
    let mut problems = Vec::new();
    for entry in available_to {
        if entry == AVAILABLE_TO_PLATFORM || entry == AVAILABLE_TO_ANY_APEX {
            continue;
        }
        if entry.contains('*') {
            if !entry.ends_with(".*") {
                problems.push(format!(
                    "wildcard {entry:?} should end with .* like com.foo.*"
                ));
            }
            if entry.matches('.').count() < 2 {
                problems.push(format!(
                    "wildcard {entry:?} requires two or more components like com.foo.*"
                ));
            }
            if entry.matches('*').count() != 1 {
                problems.push(format!("wildcard {entry:?} may only contain one *"));
            }
        }
    }
    problems
}
