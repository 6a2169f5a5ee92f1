//! The closed catalog of dependency roles.
//!
//! A container declares its content through a fixed set of properties, and
//! each property produces direct edges carrying one [`DepRole`]. Edges between
//! ordinary modules carry a [`LinkKind`] instead; the walker only learns about
//! those while traversing.

use serde::{Deserialize, Serialize};

/// Static attributes of a dependency role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleAttrs {
    /// The dependency becomes part of the container payload.
    pub payload: bool,
    /// Only a source module may satisfy the dependency, not a prebuilt.
    pub source_only: bool,
    /// Install-side artifacts of the dependency are needed alongside the container.
    pub installable: bool,
}

const fn attrs(payload: bool, source_only: bool, installable: bool) -> RoleAttrs {
    RoleAttrs {
        payload,
        source_only,
        installable,
    }
}

/// Role of a direct edge from a container to a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepRole {
    /// Native shared library (`native_shared_libs`, `rust_dyn_libs`).
    SharedLib,
    /// Native library used through JNI (`jni_libs`).
    JniLib,
    /// Native executable (`binaries`).
    Executable,
    /// Native test (`tests`).
    Test,
    /// Shell script binary (`sh_binaries`).
    ShBinary,
    /// Java library (`java_libs`).
    JavaLib,
    /// Android application (`apps`).
    AndroidApp,
    /// Runtime resource overlay (`rros`).
    Rro,
    /// BPF program (`bpfs`).
    Bpf,
    /// Filesystem image (`filesystems`).
    Filesystem,
    /// Prebuilt etc file (`prebuilts`).
    Prebuilt,
    /// Platform compat config (`compat_configs`).
    CompatConfig,
    /// Bootclasspath fragment (`bootclasspath_fragments`).
    BootclasspathFragment,
    /// System server classpath fragment (`systemserverclasspath_fragments`).
    SystemServerClasspathFragment,
    /// Container signing key (`key`).
    Key,
    /// Container certificate (`certificate`).
    Certificate,
}

impl DepRole {
    /// Number of roles in the catalog.
    pub const COUNT: usize = 16;

    /// Every role, in declaration order.
    pub const ALL: [DepRole; Self::COUNT] = [
        Self::SharedLib,
        Self::JniLib,
        Self::Executable,
        Self::Test,
        Self::ShBinary,
        Self::JavaLib,
        Self::AndroidApp,
        Self::Rro,
        Self::Bpf,
        Self::Filesystem,
        Self::Prebuilt,
        Self::CompatConfig,
        Self::BootclasspathFragment,
        Self::SystemServerClasspathFragment,
        Self::Key,
        Self::Certificate,
    ];

    /// Static attributes of this role.
    pub const fn attrs(self) -> RoleAttrs {
        match self {
            Self::Key | Self::Certificate => attrs(false, false, false),
            Self::BootclasspathFragment | Self::CompatConfig => attrs(true, true, false),
            Self::SystemServerClasspathFragment => attrs(true, true, true),
            Self::SharedLib
            | Self::JniLib
            | Self::Executable
            | Self::Test
            | Self::ShBinary
            | Self::JavaLib
            | Self::AndroidApp
            | Self::Rro
            | Self::Bpf
            | Self::Filesystem
            | Self::Prebuilt => attrs(true, false, false),
        }
    }

    /// Whether this role contributes to the payload.
    pub const fn is_payload(self) -> bool {
        self.attrs().payload
    }

    /// Roles that only carry signing metadata and never embed files.
    pub const fn is_metadata(self) -> bool {
        matches!(self, Self::Key | Self::Certificate)
    }

    /// Short tag name, e.g. `sharedLib`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SharedLib => "sharedLib",
            Self::JniLib => "jniLib",
            Self::Executable => "executable",
            Self::Test => "test",
            Self::ShBinary => "shBinary",
            Self::JavaLib => "javaLib",
            Self::AndroidApp => "androidApp",
            Self::Rro => "rro",
            Self::Bpf => "bpf",
            Self::Filesystem => "filesystem",
            Self::Prebuilt => "prebuilt",
            Self::CompatConfig => "compatConfig",
            Self::BootclasspathFragment => "bootclasspathFragment",
            Self::SystemServerClasspathFragment => "systemserverclasspathFragment",
            Self::Key => "key",
            Self::Certificate => "certificate",
        }
    }

    /// The container property that declares edges of this role.
    pub const fn property(self) -> &'static str {
        match self {
            Self::SharedLib => "native_shared_libs",
            Self::JniLib => "jni_libs",
            Self::Executable => "binaries",
            Self::Test => "tests",
            Self::ShBinary => "sh_binaries",
            Self::JavaLib => "java_libs",
            Self::AndroidApp => "apps",
            Self::Rro => "rros",
            Self::Bpf => "bpfs",
            Self::Filesystem => "filesystems",
            Self::Prebuilt => "prebuilts",
            Self::CompatConfig => "compat_configs",
            Self::BootclasspathFragment => "bootclasspath_fragments",
            Self::SystemServerClasspathFragment => "systemserverclasspath_fragments",
            Self::Key => "key",
            Self::Certificate => "certificate",
        }
    }
}

impl std::fmt::Display for DepRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of an edge between two ordinary modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Dynamic link against a shared library.
    Shared,
    /// Runtime (dlopen) dependency on a shared library.
    Runtime,
    /// Static link; nothing is embedded for it.
    Static,
    /// Header-only dependency.
    Header,
    /// JNI library embedded inside an app.
    Jni,
    /// Permissions XML installed with a privileged app.
    XmlPermissions,
    /// Rust dylib dependency.
    RustDylib,
    /// Rust rlib dependency (statically linked).
    RustRlib,
    /// Content library of a bootclasspath fragment.
    BootclasspathContent,
    /// Content library of a system server classpath fragment.
    SystemServerClasspathContent,
    /// VINTF manifest fragment.
    Vintf,
    /// Install-only requirement; never part of the payload.
    Required,
    /// Edge explicitly excluded from container contents.
    ExcludeFromContents,
    /// Any other dependency kind.
    Other,
}

impl LinkKind {
    /// Whether traversals must ignore this edge completely.
    pub const fn is_excluded(self) -> bool {
        matches!(self, Self::ExcludeFromContents | Self::Required)
    }

    /// Whether this link dynamically loads a native library.
    pub const fn is_shared(self) -> bool {
        matches!(self, Self::Shared | Self::Runtime)
    }
}

/// The tag on any edge the walker visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeTag {
    /// A direct edge declared by the container.
    Container(DepRole),
    /// An edge between modules discovered during traversal.
    Module(LinkKind),
}

impl std::fmt::Display for EdgeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container(role) => write!(f, "apex.{role}"),
            Self::Module(kind) => write!(f, "{kind:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_roles_are_not_payload() {
        for role in DepRole::ALL {
            assert_eq!(role.is_metadata(), !role.is_payload(), "{role}");
        }
    }

    #[test]
    fn test_source_only_roles() {
        let source_only: Vec<_> = DepRole::ALL
            .into_iter()
            .filter(|r| r.attrs().source_only)
            .collect();
        assert_eq!(
            source_only,
            vec![
                DepRole::CompatConfig,
                DepRole::BootclasspathFragment,
                DepRole::SystemServerClasspathFragment,
            ]
        );
        assert!(DepRole::SystemServerClasspathFragment.attrs().installable);
    }

    #[test]
    fn test_excluded_links() {
        assert!(LinkKind::Required.is_excluded());
        assert!(LinkKind::ExcludeFromContents.is_excluded());
        assert!(!LinkKind::Shared.is_excluded());
    }
}
