//! Packaged artifacts: files placed inside a container.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::arch::Multilib;
use crate::module::ModuleId;

/// Class of a packaged artifact, as consumed by downstream packaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactClass {
    /// A single APK.
    App,
    /// An app set archive.
    AppSet,
    /// Any file installed under a data directory.
    Etc,
    /// A dex jar.
    JavaSharedLib,
    /// A native executable.
    NativeExecutable,
    /// A native shared library.
    NativeSharedLib,
    /// A native test.
    NativeTest,
    /// A shell script.
    ShBinary,
}

impl ArtifactClass {
    /// Short class name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::AppSet => "appSet",
            Self::Etc => "etc",
            Self::JavaSharedLib => "javaSharedLib",
            Self::NativeExecutable => "nativeExecutable",
            Self::NativeSharedLib => "nativeSharedLib",
            Self::NativeTest => "nativeTest",
            Self::ShBinary => "shBinary",
        }
    }
}

impl std::fmt::Display for ArtifactClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The module that produced an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactOwner {
    /// Arena id of the module variant.
    pub id: ModuleId,
    /// Module name.
    pub name: String,
}

/// One file placed inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagedArtifact {
    /// Build output the file is copied from.
    pub source: PathBuf,
    /// Container-relative install directory.
    pub install_dir: String,
    /// Installed file name; the source file name when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_stem: Option<String>,
    /// Artifact class.
    pub class: ArtifactClass,
    /// Symlink names created next to the file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symlinks: Vec<String>,
    /// Reached through a transitive edge rather than declared directly.
    pub transitive: bool,
    /// Declared through `jni_libs`.
    pub jni: bool,
    /// Producing module; `None` for placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<ArtifactOwner>,
    /// Install-side module name (name plus variant suffix).
    pub module_name: String,
    /// Multilib of native artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multilib: Option<Multilib>,
    /// Certificate for apps; `PRESIGNED` for app sets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    /// Overridden manifest package name for apps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overridden_package_name: Option<String>,
    /// Reason the source could not be built, when this is a placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl PackagedArtifact {
    /// A new artifact with no symlinks, flags or owner.
    pub fn new(source: impl Into<PathBuf>, install_dir: &str, class: ArtifactClass) -> Self {
        Self {
            source: source.into(),
            install_dir: install_dir.to_string(),
            custom_stem: None,
            class,
            symlinks: Vec::new(),
            transitive: false,
            jni: false,
            owner: None,
            module_name: String::new(),
            multilib: None,
            certificate: None,
            overridden_package_name: None,
            placeholder: None,
        }
    }

    /// Set the installed file name.
    #[must_use]
    pub fn with_stem(mut self, stem: impl Into<String>) -> Self {
        self.custom_stem = Some(stem.into());
        self
    }

    /// Set the owning module.
    #[must_use]
    pub fn owned_by(mut self, id: ModuleId, name: &str) -> Self {
        self.owner = Some(ArtifactOwner {
            id,
            name: name.to_string(),
        });
        if self.module_name.is_empty() {
            self.module_name = name.to_string();
        }
        self
    }

    /// Installed file name.
    pub fn stem(&self) -> String {
        match &self.custom_stem {
            Some(stem) => stem.clone(),
            None => self
                .source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Container-relative install path (`install_dir/stem`).
    pub fn path(&self) -> String {
        join_rel(&[&self.install_dir, &self.stem()])
    }

    /// Container-relative paths of the symlinks.
    pub fn symlink_paths(&self) -> Vec<String> {
        self.symlinks
            .iter()
            .map(|s| join_rel(&[&self.install_dir, s]))
            .collect()
    }

    /// Whether this artifact stands in for an output that could not be built.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder.is_some()
    }

    /// Source path as a [`Path`].
    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Join container-relative path components with `/`, skipping empty ones.
pub fn join_rel(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|p| p.split('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_defaults_to_file_name() {
        let a =
            PackagedArtifact::new("out/arm64/libfoo.so", "lib64", ArtifactClass::NativeSharedLib);
        assert_eq!(a.stem(), "libfoo.so");
        assert_eq!(a.path(), "lib64/libfoo.so");
    }

    #[test]
    fn test_custom_stem_and_symlinks() {
        let mut a = PackagedArtifact::new("out/foo_dup", "bin", ArtifactClass::NativeExecutable)
            .with_stem("foo");
        a.symlinks = vec!["foo_link".to_string()];
        assert_eq!(a.path(), "bin/foo");
        assert_eq!(a.symlink_paths(), vec!["bin/foo_link"]);
    }

    #[test]
    fn test_join_rel_skips_empty_components() {
        assert_eq!(join_rel(&["lib64", "", "bionic", ""]), "lib64/bionic");
        assert_eq!(join_rel(&["etc/", "/bpf", "sub"]), "etc/bpf/sub");
        assert_eq!(join_rel(&["", ""]), "");
    }
}
