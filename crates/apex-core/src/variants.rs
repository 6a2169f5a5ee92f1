//! Variant fan-out: from a container declaration to concrete dependency
//! requests, and from requests to direct edges into the module graph.

use std::collections::HashSet;

use apex_schema::{
    ArchError, ContainerDecl, DepRole, ModuleId, Multilib, NativeDeps, Target, TargetSpec,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::GlobalConfig;
use crate::error::ResolveError;
use crate::graph::ModuleGraph;

const HWASAN_RUNTIME: &str = "libclang_rt.hwasan";

/// Native dependency names requested for one target, exclusions applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedNativeDeps {
    pub native_shared_libs: Vec<String>,
    pub jni_libs: Vec<String>,
    pub rust_dyn_libs: Vec<String>,
    pub binaries: Vec<String>,
    pub tests: Vec<String>,
    pub filesystems: Vec<String>,
    pub prebuilts: Vec<String>,
}

impl ResolvedNativeDeps {
    fn from_merged(deps: &NativeDeps) -> Self {
        Self {
            native_shared_libs: subtract(
                &deps.native_shared_libs,
                &deps.exclude_native_shared_libs,
            ),
            jni_libs: subtract(&deps.jni_libs, &deps.exclude_jni_libs),
            rust_dyn_libs: subtract(&deps.rust_dyn_libs, &deps.exclude_rust_dyn_libs),
            binaries: subtract(&deps.binaries, &deps.exclude_binaries),
            tests: subtract(&deps.tests, &deps.exclude_tests),
            filesystems: subtract(&deps.filesystems, &deps.exclude_filesystems),
            prebuilts: subtract(&deps.prebuilts, &deps.exclude_prebuilts),
        }
    }
}

/// Remove every name in `exclude` from `include`, keeping first occurrences.
fn subtract(include: &[String], exclude: &[String]) -> Vec<String> {
    let excluded: HashSet<&str> = exclude.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    include
        .iter()
        .filter(|name| !excluded.contains(name.as_str()) && seen.insert(name.as_str()))
        .cloned()
        .collect()
}

/// The fan-out result for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetFanout {
    pub target: Target,
    /// The target at index 0.
    pub primary: bool,
    pub deps: ResolvedNativeDeps,
}

/// Compute the per-target native dependency lists of `decl`.
///
/// # Errors
///
/// Returns [`ArchError::Unknown`] if any target names an unsupported
/// architecture.
pub fn fan_out(
    decl: &ContainerDecl,
    targets: &[TargetSpec],
) -> Result<Vec<TargetFanout>, ArchError> {
    let targets = targets
        .iter()
        .map(TargetSpec::decode)
        .collect::<Result<Vec<_>, _>>()?;
    let has_32bit_target = targets.iter().any(|t| t.arch.multilib() == Multilib::Lib32);

    // Top-level lists without a multilib group imply `both`, except binaries
    // which imply `first`.
    let top_both = NativeDeps {
        native_shared_libs: decl.native.native_shared_libs.clone(),
        jni_libs: decl.native.jni_libs.clone(),
        rust_dyn_libs: decl.native.rust_dyn_libs.clone(),
        tests: decl.native.tests.clone(),
        exclude_native_shared_libs: decl.native.exclude_native_shared_libs.clone(),
        exclude_jni_libs: decl.native.exclude_jni_libs.clone(),
        exclude_rust_dyn_libs: decl.native.exclude_rust_dyn_libs.clone(),
        exclude_tests: decl.native.exclude_tests.clone(),
        ..NativeDeps::default()
    };
    let top_first = NativeDeps {
        binaries: decl.native.binaries.clone(),
        exclude_binaries: decl.native.exclude_binaries.clone(),
        ..NativeDeps::default()
    };

    let mut out = Vec::with_capacity(targets.len());
    for (i, target) in targets.into_iter().enumerate() {
        let primary = i == 0;
        let mut deps = NativeDeps::default();

        deps.merge(&decl.multilib.both);
        deps.merge(&top_both);

        if primary {
            deps.merge(&decl.multilib.first);
            deps.merge(&top_first);
        }

        match target.arch.multilib() {
            Multilib::Lib32 => {
                deps.merge(&decl.multilib.lib32);
                deps.merge(&decl.multilib.prefer32);
            }
            Multilib::Lib64 => {
                deps.merge(&decl.multilib.lib64);
                if !has_32bit_target {
                    deps.merge(&decl.multilib.prefer32);
                }
            }
        }

        deps.merge(decl.arch.for_arch(target.arch));

        out.push(TargetFanout {
            target,
            primary,
            deps: ResolvedNativeDeps::from_merged(&deps),
        });
    }
    Ok(out)
}

/// A request for a named dependency in a given role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRequest {
    pub role: DepRole,
    /// Declaring property, used in diagnostics.
    pub property: &'static str,
    pub name: String,
    /// `None` requests the common-arch variant.
    pub target: Option<Target>,
}

impl DependencyRequest {
    fn new(role: DepRole, property: &'static str, name: &str, target: Option<&Target>) -> Self {
        Self {
            role,
            property,
            name: name.to_string(),
            target: target.cloned(),
        }
    }
}

/// Device targets of `decl`: its own list, or the build-wide one.
pub fn effective_targets<'a>(
    decl: &'a ContainerDecl,
    config: &'a GlobalConfig,
) -> &'a [TargetSpec] {
    if decl.targets.is_empty() {
        &config.targets
    } else {
        &decl.targets
    }
}

/// Every dependency request of `decl`, in a deterministic order: per-target
/// native requests first, then common-arch ones.
///
/// # Errors
///
/// Returns [`ResolveError::UnknownArch`] for an unsupported target.
pub fn dependency_requests(
    decl: &ContainerDecl,
    config: &GlobalConfig,
) -> Result<Vec<DependencyRequest>, ResolveError> {
    let fanout = fan_out(decl, effective_targets(decl, config)).map_err(|e| {
        let ArchError::Unknown(arch) = e;
        ResolveError::UnknownArch {
            container: decl.name.clone(),
            arch,
        }
    })?;

    let mut requests = Vec::new();
    for tf in &fanout {
        let t = Some(&tf.target);
        let d = &tf.deps;
        let push = |requests: &mut Vec<DependencyRequest>, role, property, names: &[String]| {
            for name in names {
                requests.push(DependencyRequest::new(role, property, name, t));
            }
        };
        push(&mut requests, DepRole::Executable, "binaries", &d.binaries);
        push(&mut requests, DepRole::Test, "tests", &d.tests);
        push(&mut requests, DepRole::JniLib, "jni_libs", &d.jni_libs);
        push(&mut requests, DepRole::SharedLib, "native_shared_libs", &d.native_shared_libs);
        push(&mut requests, DepRole::SharedLib, "rust_dyn_libs", &d.rust_dyn_libs);
        push(&mut requests, DepRole::Filesystem, "filesystems", &d.filesystems);
        push(&mut requests, DepRole::Prebuilt, "prebuilts", &d.prebuilts);
        if tf.primary {
            push(&mut requests, DepRole::ShBinary, "sh_binaries", &decl.sh_binaries);
        }
    }

    let hwasan = decl.has_sanitizer("hwaddress") || config.has_device_sanitizer("hwaddress");
    if hwasan && decl.name.starts_with("com.android.runtime") {
        if let Some(tf) = fanout
            .iter()
            .find(|tf| tf.target.arch.multilib() == Multilib::Lib64)
        {
            requests.push(DependencyRequest::new(
                DepRole::SharedLib,
                "native_shared_libs",
                HWASAN_RUNTIME,
                Some(&tf.target),
            ));
        }
    }

    let top_filesystems = subtract(&decl.native.filesystems, &decl.native.exclude_filesystems);
    let common: [(DepRole, &'static str, &[String]); 8] = [
        (DepRole::Rro, "rros", &decl.rros),
        (DepRole::BootclasspathFragment, "bootclasspath_fragments", &decl.bootclasspath_fragments),
        (
            DepRole::SystemServerClasspathFragment,
            "systemserverclasspath_fragments",
            &decl.systemserverclasspath_fragments,
        ),
        (DepRole::JavaLib, "java_libs", &decl.java_libs),
        (DepRole::Filesystem, "filesystems", &top_filesystems),
        (DepRole::CompatConfig, "compat_configs", &decl.compat_configs),
        (DepRole::AndroidApp, "apps", &decl.apps),
        (DepRole::Bpf, "bpfs", &decl.bpfs),
    ];
    for (role, property, names) in common {
        for name in names {
            requests.push(DependencyRequest::new(role, property, name, None));
        }
    }

    // Top-level prebuilts use the first 64-bit target if there is one.
    let prebuilt_target = fanout
        .iter()
        .find(|tf| tf.target.arch.multilib() == Multilib::Lib64)
        .or_else(|| fanout.first())
        .map(|tf| &tf.target);
    if let Some(target) = prebuilt_target {
        for name in subtract(&decl.native.prebuilts, &decl.native.exclude_prebuilts) {
            requests.push(DependencyRequest::new(
                DepRole::Prebuilt,
                "prebuilts",
                &name,
                Some(target),
            ));
        }
    }

    if let Some(key) = &decl.key {
        requests.push(DependencyRequest::new(DepRole::Key, "key", key, None));
    }
    if let Some(cert) = &decl.certificate {
        requests.push(DependencyRequest::new(DepRole::Certificate, "certificate", cert, None));
    }

    Ok(requests)
}

/// A direct edge from a container to a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectDep {
    pub role: DepRole,
    pub property: &'static str,
    pub module: ModuleId,
}

/// Requests resolved against the graph.
#[derive(Debug, Clone, Default)]
pub struct Materialized {
    pub direct: Vec<DirectDep>,
    /// Names recorded under `allow_missing_dependencies`.
    pub missing: Vec<String>,
    /// Unresolvable names when missing dependencies are not allowed.
    pub errors: Vec<ResolveError>,
}

/// Resolve `requests` into direct edges.
///
/// Each request tries the exact target variant first, then the common one.
/// Source-only roles never bind to prebuilts.
pub fn materialize(
    graph: &ModuleGraph,
    container: &str,
    requests: &[DependencyRequest],
    config: &GlobalConfig,
) -> Materialized {
    let mut out = Materialized::default();
    let mut seen = HashSet::new();

    for req in requests {
        let source_only = req.role.attrs().source_only;
        match graph.find_variant(&req.name, req.target.as_ref(), source_only) {
            Some(module) => {
                let dep = DirectDep {
                    role: req.role,
                    property: req.property,
                    module,
                };
                if seen.insert((dep.role, dep.module)) {
                    out.direct.push(dep);
                }
            }
            None if config.allow_missing_dependencies => {
                warn!(container, name = %req.name, property = req.property, "missing dependency");
                if !out.missing.contains(&req.name) {
                    out.missing.push(req.name.clone());
                }
            }
            None => out.errors.push(ResolveError::MissingDependency {
                container: container.to_string(),
                property: req.property.to_string(),
                name: req.name.clone(),
            }),
        }
    }

    debug!(
        container,
        direct = out.direct.len(),
        missing = out.missing.len(),
        "materialized direct dependencies"
    );
    out
}
