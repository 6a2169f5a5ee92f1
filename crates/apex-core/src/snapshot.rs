//! On-disk form of a module graph plus the containers to resolve.
//!
//! A snapshot is a TOML or JSON document with four sections: `config`,
//! `modules`, `containers` and `overrides`. Module dependencies are declared
//! by name and bound to a variant when the graph is built: the variant with
//! the dependency's `target` (the depending module's target by default),
//! then the common variant.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use apex_schema::{ContainerDecl, LinkKind, Module, ModuleId, OverrideTable, Target};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::GlobalConfig;
use crate::graph::{GraphBuilder, ModuleGraph};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML snapshot: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("module {name:?} is declared twice for target {target}")]
    DuplicateModule { name: String, target: String },

    #[error("module {module:?} depends on unknown module {dependency:?}")]
    UnknownDependency { module: String, dependency: String },

    #[error("unsupported snapshot format: {0} (expected .toml or .json)")]
    UnknownFormat(PathBuf),
}

/// A dependency declared by a snapshot module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepDecl {
    pub name: String,
    pub link: LinkKind,
    #[serde(default)]
    pub crosses_boundary: bool,
    /// Variant to bind to; defaults to the depending module's target.
    #[serde(default)]
    pub target: Option<Target>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotModule {
    #[serde(flatten)]
    pub module: Module,
    #[serde(default)]
    pub deps: Vec<DepDecl>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    config: GlobalConfig,
    #[serde(default)]
    modules: Vec<SnapshotModule>,
    #[serde(default)]
    containers: Vec<ContainerDecl>,
    #[serde(default)]
    overrides: OverrideTable,
}

#[derive(Debug)]
pub struct Snapshot {
    pub config: GlobalConfig,
    pub graph: ModuleGraph,
    pub containers: Vec<ContainerDecl>,
    pub overrides: OverrideTable,
}

impl Snapshot {
    /// Load a snapshot, picking the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// module graph it describes is inconsistent.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(SnapshotError::UnknownFormat(path.to_path_buf())),
        }
    }

    /// # Errors
    ///
    /// See [`Snapshot::load`].
    pub fn from_toml_str(text: &str) -> Result<Self, SnapshotError> {
        Self::from_raw(toml::from_str(text)?)
    }

    /// # Errors
    ///
    /// See [`Snapshot::load`].
    pub fn from_json_str(text: &str) -> Result<Self, SnapshotError> {
        Self::from_raw(serde_json::from_str(text)?)
    }

    fn from_raw(raw: RawSnapshot) -> Result<Self, SnapshotError> {
        let mut builder = GraphBuilder::new();
        let mut seen = HashSet::new();
        let mut pending = Vec::with_capacity(raw.modules.len());

        for SnapshotModule { module, deps } in raw.modules {
            let key = (module.name.clone(), module.target.clone());
            if !seen.insert(key) {
                return Err(SnapshotError::DuplicateModule {
                    target: module
                        .target
                        .as_ref()
                        .map_or_else(|| "common".to_string(), ToString::to_string),
                    name: module.name,
                });
            }
            let target = module.target.clone();
            let id = builder.add_module(module);
            pending.push((id, target, deps));
        }

        // Bind edges once every module has an id.
        let index = VariantIndex::new(&builder, pending.iter().map(|(id, _, _)| id));
        for (from, target, deps) in pending {
            for dep in deps {
                let wanted = dep.target.as_ref().or(target.as_ref());
                let Some(to) = index.find_variant(&builder, &dep.name, wanted) else {
                    return Err(SnapshotError::UnknownDependency {
                        module: builder.module(from).name.clone(),
                        dependency: dep.name,
                    });
                };
                builder.add_edge_with(from, to, dep.link, dep.crosses_boundary);
            }
        }

        let graph = builder.build();
        debug!(
            modules = graph.len(),
            edges = graph.edges().len(),
            containers = raw.containers.len(),
            "loaded snapshot"
        );
        Ok(Self {
            config: raw.config,
            graph,
            containers: raw.containers,
            overrides: raw.overrides,
        })
    }

    /// The declaration of the container named `name`.
    pub fn container(&self, name: &str) -> Option<&ContainerDecl> {
        self.containers.iter().find(|c| c.name == name)
    }
}

/// Name index over modules that are still in a [`GraphBuilder`].
struct VariantIndex {
    by_name: HashMap<String, Vec<ModuleId>>,
}

impl VariantIndex {
    fn new<'a>(builder: &GraphBuilder, ids: impl Iterator<Item = &'a ModuleId>) -> Self {
        let mut by_name: HashMap<String, Vec<ModuleId>> = HashMap::new();
        for &id in ids {
            by_name.entry(builder.module(id).name.clone()).or_default().push(id);
        }
        Self { by_name }
    }

    fn find_variant(
        &self,
        builder: &GraphBuilder,
        name: &str,
        target: Option<&Target>,
    ) -> Option<ModuleId> {
        let candidates = self.by_name.get(name)?;
        let exact = target.and_then(|t| {
            candidates
                .iter()
                .copied()
                .find(|&id| builder.module(id).target.as_ref() == Some(t))
        });
        exact.or_else(|| {
            candidates
                .iter()
                .copied()
                .find(|&id| builder.module(id).target.is_none())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apex_schema::{Arch, ModuleKind};
    use std::io::Write;

    const SNAPSHOT: &str = r#"
[config]
device_arch = "arm64"
targets = [{ arch = "arm64" }]

[[modules]]
name = "libfoo"
kind = "native_library"
target = { arch = "arm64" }
outputs = ["out/arm64/libfoo.so"]
available_to = ["com.android.foo"]
min_sdk_version = "29"
deps = [{ name = "libbar", link = "shared" }, { name = "libcommon", link = "header" }]

[[modules]]
name = "libbar"
kind = "native_library"
target = { arch = "arm64" }
outputs = ["out/arm64/libbar.so"]
has_stubs_variants = true

[[modules]]
name = "libcommon"
kind = "other"

[[modules]]
name = "com.android.foo.key"
kind = "apex_key"
public_key = "keys/foo.avbpubkey"
private_key = "keys/foo.pem"

[[containers]]
name = "com.android.foo"
min_sdk_version = "29"
key = "com.android.foo.key"
native_shared_libs = ["libfoo"]

[overrides."com.android.foo"]
name = "com.google.android.foo"
"#;

    #[test]
    fn test_load_toml_snapshot() {
        let snap = Snapshot::from_toml_str(SNAPSHOT).unwrap();
        assert_eq!(snap.graph.len(), 4);
        assert_eq!(snap.config.device_arch.as_deref(), Some("arm64"));

        let foo = snap
            .graph
            .find_variant("libfoo", Some(&Target::new(Arch::Arm64)), false)
            .unwrap();
        let m = snap.graph.module(foo);
        assert!(matches!(m.kind, ModuleKind::NativeLibrary { .. }));
        assert!(m.caps.can_be_payload);

        let edges: Vec<_> = snap.graph.edges_from(foo).collect();
        assert_eq!(edges.len(), 2);
        assert_eq!(snap.graph.module(edges[0].to).name, "libbar");
        assert!(snap.graph.module(edges[0].to).caps.has_stubs_variants);
        assert_eq!(snap.graph.module(edges[1].to).name, "libcommon");

        let decl = snap.container("com.android.foo").unwrap();
        assert_eq!(decl.native.native_shared_libs, vec!["libfoo"]);
        assert_eq!(
            snap.overrides.get("com.android.foo").map(|o| o.name.as_str()),
            Some("com.google.android.foo")
        );
    }

    #[test]
    fn test_unknown_dependency() {
        let err = Snapshot::from_toml_str(
            r#"
[[modules]]
name = "libfoo"
kind = "native_library"
deps = [{ name = "libmissing", link = "shared" }]
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::UnknownDependency { ref dependency, .. } if dependency == "libmissing"
        ));
    }

    #[test]
    fn test_duplicate_module() {
        let err = Snapshot::from_toml_str(
            r#"
[[modules]]
name = "libfoo"
kind = "native_library"

[[modules]]
name = "libfoo"
kind = "static_library"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("declared twice for target common"));
    }

    #[test]
    fn test_load_json_from_disk() {
        let json = r#"{
            "modules": [{ "name": "foo.rc", "kind": "prebuilt_etc", "outputs": ["out/foo.rc"] }],
            "containers": [{ "name": "com.android.foo", "prebuilts": ["foo.rc"] }]
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(json.as_bytes())
            .unwrap();

        let snap = Snapshot::load(&path).unwrap();
        assert_eq!(snap.graph.len(), 1);
        assert_eq!(snap.containers[0].native.prebuilts, vec!["foo.rc"]);

        let bad = dir.path().join("graph.yaml");
        std::fs::write(&bad, "").unwrap();
        assert!(matches!(Snapshot::load(&bad), Err(SnapshotError::UnknownFormat(_))));
    }
}
